//! # Obligation API
//!
//! Per-company obligation tracking: listing with filters, manual creation,
//! status updates and deletion, plus the admin overdue sweep.

use std::cmp::Ordering;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use regula_compliance::{NewObligation, ObligationStatus, Priority};
use regula_core::RiskTier;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{check_text, extract_query, extract_validated_json, nullable, Validate};
use crate::routes::companies::accessible_company;
use crate::state::{AppState, ObligationRecord};

const MAX_NOTES_LEN: usize = 4000;

/// Filters for listing a company's obligations.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ObligationFilter {
    /// Only obligations in this status.
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<ObligationStatus>,
    /// Only obligations at this risk tier.
    #[param(value_type = Option<String>, example = "high")]
    pub risk: Option<RiskTier>,
}

/// Manually recorded obligation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateObligationRequest {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub agency: String,
    #[schema(value_type = String, example = "medium")]
    pub risk_level: RiskTier,
    /// Defaults to the priority implied by `risk_level`.
    #[schema(value_type = Option<String>, example = "high")]
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Validate for CreateObligationRequest {
    fn validate(&self) -> Result<(), String> {
        regula_compliance::catalog::validate_code(&self.code)?;
        check_text("title", &self.title, 255)?;
        check_text("category", &self.category, 64)?;
        check_text("agency", &self.agency, 128)?;
        validate_notes(self.notes.as_deref())
    }
}

/// Update of an obligation's tracking fields. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateObligationRequest {
    #[schema(value_type = Option<String>, example = "completed")]
    pub status: Option<ObligationStatus>,
    #[schema(value_type = Option<String>, example = "urgent")]
    pub priority: Option<Priority>,
    /// `null` clears the deadline.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub deadline: Option<Option<DateTime<Utc>>>,
    /// `null` clears the notes.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

impl Validate for UpdateObligationRequest {
    fn validate(&self) -> Result<(), String> {
        validate_notes(self.notes.as_ref().and_then(|n| n.as_deref()))
    }
}

fn validate_notes(notes: Option<&str>) -> Result<(), String> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => {
            Err(format!("notes must not exceed {MAX_NOTES_LEN} characters"))
        }
        _ => Ok(()),
    }
}

/// Result of an overdue sweep.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepResponse {
    pub updated: usize,
}

/// Build the obligations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/companies/:id/obligations",
            get(list_obligations).post(create_obligation),
        )
        .route("/v1/obligations/overdue-sweep", post(overdue_sweep))
        .route(
            "/v1/obligations/:id",
            get(get_obligation)
                .put(update_obligation)
                .delete(delete_obligation),
        )
}

/// Deadline ascending with undated obligations last, then code.
pub(crate) fn by_deadline_then_code(a: &ObligationRecord, b: &ObligationRecord) -> Ordering {
    let deadline = match (a.deadline, b.deadline) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    deadline.then_with(|| a.code.cmp(&b.code))
}

/// Fetch an obligation whose company the caller may act on.
fn accessible_obligation(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
) -> Result<ObligationRecord, AppError> {
    let obligation = state
        .obligations
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("obligation {id} not found")))?;
    accessible_company(state, caller, obligation.company_id)?;
    Ok(obligation)
}

/// GET /v1/companies/:id/obligations: List a company's obligations.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/obligations",
    params(("id" = Uuid, Path, description = "Company ID"), ObligationFilter),
    responses(
        (status = 200, description = "Obligations ordered by deadline", body = Vec<ObligationRecord>),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn list_obligations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    query: Result<Query<ObligationFilter>, QueryRejection>,
) -> Result<Json<Vec<ObligationRecord>>, AppError> {
    let filter = extract_query(query)?;
    accessible_company(&state, &caller, id)?;

    let mut obligations = state.obligations.filter(|o| {
        o.company_id == id
            && filter.status.map_or(true, |s| o.status == s)
            && filter.risk.map_or(true, |r| o.risk_level == r)
    });
    obligations.sort_by(by_deadline_then_code);
    Ok(Json(obligations))
}

/// POST /v1/companies/:id/obligations: Record an obligation manually.
#[utoipa::path(
    post,
    path = "/v1/companies/{id}/obligations",
    params(("id" = Uuid, Path, description = "Company ID")),
    request_body = CreateObligationRequest,
    responses(
        (status = 201, description = "Obligation created", body = ObligationRecord),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
        (status = 409, description = "Code already on file for this company", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn create_obligation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(company_id): Path<Uuid>,
    body: Result<Json<CreateObligationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ObligationRecord>), AppError> {
    let req = extract_validated_json(body)?;
    accessible_company(&state, &caller, company_id)?;

    let now = Utc::now();
    let mut record = ObligationRecord::from_new(
        NewObligation {
            company_id,
            code: req.code,
            title: req.title.trim().to_string(),
            description: req.description,
            category: req.category.trim().to_string(),
            agency: req.agency.trim().to_string(),
            risk_level: req.risk_level,
            priority: req
                .priority
                .unwrap_or_else(|| Priority::for_risk(req.risk_level)),
            deadline: req.deadline,
        },
        now,
    );
    record.notes = req.notes;

    state
        .obligations
        .insert_unless(record.id, record.clone(), |a, b| {
            a.company_id == b.company_id && a.code == b.code
        })
        .map_err(|existing| {
            AppError::Conflict(format!(
                "obligation {} already exists for company {company_id}",
                existing.code
            ))
        })?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::obligations::insert(pool, &record).await {
            state.obligations.remove(&record.id);
            return Err(AppError::database("persist obligation", e));
        }
    }

    tracing::info!(obligation_id = %record.id, company_id = %company_id, code = %record.code, "obligation recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/obligations/:id: Get an obligation.
#[utoipa::path(
    get,
    path = "/v1/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation ID")),
    responses(
        (status = 200, description = "Obligation found", body = ObligationRecord),
        (status = 403, description = "Company owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn get_obligation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ObligationRecord>, AppError> {
    accessible_obligation(&state, &caller, id).map(Json)
}

/// PUT /v1/obligations/:id: Update status, priority, deadline or notes.
#[utoipa::path(
    put,
    path = "/v1/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation ID")),
    request_body = UpdateObligationRequest,
    responses(
        (status = 200, description = "Obligation updated", body = ObligationRecord),
        (status = 403, description = "Company owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn update_obligation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateObligationRequest>, JsonRejection>,
) -> Result<Json<ObligationRecord>, AppError> {
    let req = extract_validated_json(body)?;
    accessible_obligation(&state, &caller, id)?;
    let now = Utc::now();

    let updated = state
        .obligations
        .update(&id, |o| {
            if let Some(status) = req.status {
                o.set_status(status, now);
            }
            if let Some(priority) = req.priority {
                o.priority = priority;
            }
            if let Some(deadline) = req.deadline {
                o.deadline = deadline;
            }
            if let Some(notes) = req.notes {
                o.notes = notes;
            }
            o.updated_at = now;
        })
        .ok_or_else(|| AppError::NotFound(format!("obligation {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        crate::db::obligations::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("persist obligation update", e))?;
    }

    tracing::info!(obligation_id = %id, status = %updated.status, "obligation updated");
    Ok(Json(updated))
}

/// DELETE /v1/obligations/:id: Delete an obligation.
#[utoipa::path(
    delete,
    path = "/v1/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation ID")),
    responses(
        (status = 204, description = "Obligation deleted"),
        (status = 403, description = "Company owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn delete_obligation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    accessible_obligation(&state, &caller, id)?;

    if let Some(pool) = &state.db_pool {
        crate::db::obligations::delete(pool, id)
            .await
            .map_err(|e| AppError::database("delete obligation", e))?;
    }
    state.obligations.remove(&id);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/obligations/overdue-sweep: Mark past-due open obligations overdue.
#[utoipa::path(
    post,
    path = "/v1/obligations/overdue-sweep",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "obligations"
)]
async fn overdue_sweep(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SweepResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let updated = crate::compliance::sweep_overdue(&state, Utc::now()).await?;
    Ok(Json(SweepResponse { updated }))
}
