#![deny(missing_docs)]

//! # regula-core: Foundational Types for Regula
//!
//! This crate defines the domain primitives every other crate in the
//! workspace depends on. It has no internal crate dependencies, only
//! `serde` and `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`Cnpj`] is validated at
//!    construction and stored in canonical 14-digit form. You cannot pass an
//!    arbitrary string where a [`StateCode`] is expected.
//!
//! 2. **Pure functions for the checksum.** [`cnpj::validate`] and
//!    [`cnpj::format`] take raw input and never fail; the newtypes build on
//!    top of them.
//!
//! 3. **Ordered [`RiskTier`].** Tiers compare by severity, so escalation and
//!    "at least high" checks are plain comparisons.
//!
//! 4. **[`ValidationError`] hierarchy.** Structured errors with `thiserror`,
//!    no `.unwrap()` outside tests.

pub mod activity;
pub mod cnpj;
pub mod error;
pub mod jurisdiction;
pub mod risk;

pub use activity::ActivityCode;
pub use cnpj::Cnpj;
pub use error::ValidationError;
pub use jurisdiction::StateCode;
pub use risk::RiskTier;
