//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Regula API",
        description = "Brazilian regulatory compliance: CNPJ validation, activity risk classification, and legal obligation tracking per company.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Auth
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        // Users
        crate::routes::users::list_users,
        crate::routes::users::update_role,
        // Companies
        crate::routes::companies::create_company,
        crate::routes::companies::list_companies,
        crate::routes::companies::get_company,
        crate::routes::companies::update_company,
        crate::routes::companies::delete_company,
        crate::routes::companies::generate_obligations,
        // Obligations
        crate::routes::obligations::list_obligations,
        crate::routes::obligations::create_obligation,
        crate::routes::obligations::get_obligation,
        crate::routes::obligations::update_obligation,
        crate::routes::obligations::delete_obligation,
        crate::routes::obligations::overdue_sweep,
        // Requirements
        crate::routes::requirements::list_requirements,
        crate::routes::requirements::get_requirement,
        crate::routes::requirements::create_requirement,
        crate::routes::requirements::update_requirement,
        crate::routes::requirements::deactivate_requirement,
        // Utilities
        crate::routes::utilities::lookup_cnpj,
        crate::routes::utilities::classify,
        // Dashboard
        crate::routes::dashboard::dashboard,
        // Operations
        crate::middleware::metrics::metrics_handler,
    ),
    components(schemas(
        // State record types
        crate::state::UserRecord,
        crate::state::CompanyRecord,
        crate::state::ObligationRecord,
        crate::auth::Role,
        crate::auth::TokenPair,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Auth DTOs
        crate::routes::auth::RegisterRequest,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::RefreshRequest,
        crate::routes::users::UpdateRoleRequest,
        // Company DTOs
        crate::routes::companies::CreateCompanyRequest,
        crate::routes::companies::UpdateCompanyRequest,
        crate::routes::companies::CreateCompanyResponse,
        crate::routes::companies::GenerationResponse,
        // Obligation DTOs
        crate::routes::obligations::CreateObligationRequest,
        crate::routes::obligations::UpdateObligationRequest,
        crate::routes::obligations::SweepResponse,
        // Requirement DTOs
        crate::routes::requirements::RequirementView,
        crate::routes::requirements::CreateRequirementRequest,
        crate::routes::requirements::UpdateRequirementRequest,
        // Utility DTOs
        crate::routes::utilities::CnpjLookup,
        crate::routes::utilities::ClassifyResponse,
        crate::routes::dashboard::DashboardSummary,
        crate::routes::dashboard::UpcomingDeadline,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and token lifecycle"),
        (name = "users", description = "User administration"),
        (name = "companies", description = "Company registry"),
        (name = "obligations", description = "Legal obligation tracking"),
        (name = "requirements", description = "Legal requirement catalog"),
        (name = "utilities", description = "CNPJ and risk utilities"),
        (name = "dashboard", description = "Compliance summary"),
        (name = "operations", description = "Health and metrics"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT security scheme referenced by handlers.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
