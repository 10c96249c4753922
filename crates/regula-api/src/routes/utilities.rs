//! # CNPJ & Risk Utilities
//!
//! `GET /v1/cnpj/:cnpj` is public; risk classification needs a token.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use regula_core::cnpj;
use regula_core::{ActivityCode, StateCode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;

/// CNPJ check result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CnpjLookup {
    /// The input as received.
    pub input: String,
    /// Input with punctuation removed.
    pub digits: String,
    pub valid: bool,
    /// `XX.XXX.XXX/XXXX-XX` when the digits are 14 long, otherwise the input.
    pub formatted: String,
}

/// Classification inputs.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassifyQuery {
    #[param(example = "0510-0/00")]
    pub activity_code: String,
    #[param(example = "AM")]
    pub state: String,
}

/// Classification result with the steps that produced it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClassifyResponse {
    pub prefix: String,
    #[schema(example = "high")]
    pub base_tier: String,
    #[schema(example = "critical")]
    pub tier: String,
    pub heightened_jurisdiction: bool,
}

/// Routes reachable without a token.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/cnpj/:cnpj", get(lookup_cnpj))
}

/// Routes requiring an access token.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/risk/classify", get(classify))
}

/// GET /v1/cnpj/:cnpj: Validate and format a CNPJ.
///
/// Formatted input must be percent-encoded (`/` → `%2F`).
#[utoipa::path(
    get,
    path = "/v1/cnpj/{cnpj}",
    params(("cnpj" = String, Path, description = "CNPJ, formatted or bare")),
    responses((status = 200, description = "Check result", body = CnpjLookup)),
    tag = "utilities"
)]
async fn lookup_cnpj(Path(input): Path<String>) -> Json<CnpjLookup> {
    Json(CnpjLookup {
        digits: cnpj::strip_non_digits(&input),
        valid: cnpj::validate(&input),
        formatted: cnpj::format(&input),
        input,
    })
}

/// GET /v1/risk/classify: Classify an activity code in a state.
#[utoipa::path(
    get,
    path = "/v1/risk/classify",
    params(ClassifyQuery),
    responses(
        (status = 200, description = "Risk classification", body = ClassifyResponse),
        (status = 422, description = "Invalid activity code or state", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "utilities"
)]
async fn classify(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    query: Result<Query<ClassifyQuery>, QueryRejection>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let query = extract_query(query)?;
    let activity = ActivityCode::new(query.activity_code)?;
    let uf = StateCode::new(query.state)?;
    let explained = state.classifier.explain(&activity, &uf);
    Ok(Json(ClassifyResponse {
        prefix: explained.prefix,
        base_tier: explained.base_tier.as_str().to_string(),
        tier: explained.tier.as_str().to_string(),
        heightened_jurisdiction: explained.heightened_jurisdiction,
    }))
}
