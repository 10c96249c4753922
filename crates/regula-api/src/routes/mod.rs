//! # API Route Modules
//!
//! - `auth`: registration, login, token refresh, logout, current user.
//! - `users`: admin user listing and role changes.
//! - `companies`: company CRUD and obligation generation.
//! - `obligations`: per-company obligation tracking and the overdue sweep.
//! - `requirements`: the legal requirement catalog.
//! - `utilities`: CNPJ lookup and risk classification.
//! - `dashboard`: compliance summary for the caller's companies.

pub mod auth;
pub mod companies;
pub mod dashboard;
pub mod obligations;
pub mod requirements;
pub mod users;
pub mod utilities;
