//! # regula-api: Axum API Services for Regula
//!
//! HTTP surface over the compliance domain: accounts and JWT auth,
//! company registration with CNPJ validation and risk classification,
//! obligation generation and tracking, and the requirement catalog.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                       | Auth            |
//! |------------------------|------------------------------|-----------------|
//! | `/v1/auth/*`           | [`routes::auth`]             | partly public   |
//! | `/v1/users/*`          | [`routes::users`]            | admin           |
//! | `/v1/companies/*`      | [`routes::companies`]        | owner or admin  |
//! | `/v1/obligations/*`    | [`routes::obligations`]      | owner or admin  |
//! | `/v1/requirements/*`   | [`routes::requirements`]     | read: any; write: admin |
//! | `/v1/cnpj/*`           | [`routes::utilities`]        | public          |
//! | `/v1/risk/*`           | [`routes::utilities`]        | any             |
//! | `/v1/dashboard`        | [`routes::dashboard`]        | any             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (protected routes) → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod bootstrap;
pub mod compliance;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod password;
pub mod routes;
pub mod state;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{metrics_handler, metrics_middleware, ApiMetrics};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics`, `/openapi.json`, CNPJ lookup, and
/// register/login/refresh are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let public = Router::new()
        .merge(routes::auth::public_router())
        .merge(routes::utilities::public_router())
        .merge(openapi::router());

    let protected = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::companies::router())
        .merge(routes::obligations::router())
        .merge(routes::requirements::router())
        .merge(routes::utilities::router())
        .merge(routes::dashboard::router())
        .route_layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let api = Router::new().merge(public).merge(protected).with_state(state);

    // Unauthenticated operational endpoints.
    let operations = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(operations)
        .merge(api)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
