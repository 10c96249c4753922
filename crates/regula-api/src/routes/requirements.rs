//! # Requirement Catalog API
//!
//! Everyone authenticated can read the active catalog; admins can see
//! inactive entries and maintain the catalog. Deleting a requirement only
//! deactivates it so obligations already generated from it keep their
//! provenance.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use regula_compliance::{LegalRequirement, RequirementDefinition};
use regula_core::{RiskTier, StateCode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, nullable, Validate};
use crate::state::AppState;

/// A catalog entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequirementView {
    pub id: Uuid,
    #[schema(example = "LICENCA-AMBIENTAL-IBAMA")]
    pub code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub agency: String,
    /// Four-digit activity prefixes; empty means every activity.
    pub activity_prefixes: Vec<String>,
    /// UF codes; empty means every state.
    pub states: Vec<String>,
    #[schema(example = "high")]
    pub risk_level: String,
    pub active: bool,
    pub deadline_days: Option<u32>,
}

impl From<LegalRequirement> for RequirementView {
    fn from(r: LegalRequirement) -> Self {
        Self {
            id: r.id,
            code: r.code,
            title: r.title,
            description: r.description,
            category: r.category,
            agency: r.agency,
            activity_prefixes: r.activity_prefixes,
            states: r.states.iter().map(|s| s.as_str().to_string()).collect(),
            risk_level: r.risk_level.as_str().to_string(),
            active: r.active,
            deadline_days: r.deadline_days,
        }
    }
}

fn default_active() -> bool {
    true
}

/// Request to add a catalog entry.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequirementRequest {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub agency: String,
    #[serde(default)]
    pub activity_prefixes: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[schema(value_type = String, example = "medium")]
    pub risk_level: RiskTier,
    #[serde(default = "default_active")]
    pub active: bool,
    pub deadline_days: Option<u32>,
}

impl Validate for CreateRequirementRequest {
    fn validate(&self) -> Result<(), String> {
        if self.description.chars().count() > 4000 {
            return Err("description must not exceed 4000 characters".into());
        }
        Ok(())
    }
}

/// Partial update of a catalog entry. The code cannot change.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateRequirementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub agency: Option<String>,
    pub activity_prefixes: Option<Vec<String>>,
    pub states: Option<Vec<String>>,
    #[schema(value_type = Option<String>, example = "high")]
    pub risk_level: Option<RiskTier>,
    pub active: Option<bool>,
    /// `null` removes the deadline offset.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<u32>)]
    pub deadline_days: Option<Option<u32>>,
}

impl Validate for UpdateRequirementRequest {
    fn validate(&self) -> Result<(), String> {
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > 4000)
        {
            return Err("description must not exceed 4000 characters".into());
        }
        Ok(())
    }
}

/// Catalog listing options.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Include deactivated entries (admin only).
    #[serde(default)]
    pub include_inactive: bool,
}

/// Build the requirements router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/requirements",
            get(list_requirements).post(create_requirement),
        )
        .route(
            "/v1/requirements/:id",
            get(get_requirement)
                .put(update_requirement)
                .delete(deactivate_requirement),
        )
}

fn parse_states(states: &[String]) -> Result<Vec<StateCode>, AppError> {
    states
        .iter()
        .map(|s| StateCode::new(s.as_str()).map_err(AppError::from))
        .collect()
}

/// Run the catalog's field rules over a requirement.
fn check_requirement(r: &LegalRequirement) -> Result<(), AppError> {
    RequirementDefinition {
        code: r.code.clone(),
        title: r.title.clone(),
        description: r.description.clone(),
        category: r.category.clone(),
        agency: r.agency.clone(),
        activity_prefixes: r.activity_prefixes.clone(),
        states: r.states.clone(),
        risk_level: r.risk_level,
        active: r.active,
        deadline_days: r.deadline_days,
    }
    .validate()
    .map_err(AppError::from)
}

/// GET /v1/requirements: The requirement catalog, ordered by code.
#[utoipa::path(
    get,
    path = "/v1/requirements",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Catalog entries", body = Vec<RequirementView>),
        (status = 403, description = "Inactive entries require the admin role", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "requirements"
)]
async fn list_requirements(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<Json<Vec<RequirementView>>, AppError> {
    let query = extract_query(query)?;
    if query.include_inactive {
        require_role(&caller, Role::Admin)?;
    }
    let mut requirements = state
        .requirements
        .filter(|r| r.active || query.include_inactive);
    requirements.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(Json(requirements.into_iter().map(Into::into).collect()))
}

/// GET /v1/requirements/:id: One catalog entry.
#[utoipa::path(
    get,
    path = "/v1/requirements/{id}",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Catalog entry", body = RequirementView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "requirements"
)]
async fn get_requirement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementView>, AppError> {
    let requirement = state
        .requirements
        .get(&id)
        .filter(|r| r.active || caller.has_role(Role::Admin))
        .ok_or_else(|| AppError::NotFound(format!("requirement {id} not found")))?;
    Ok(Json(requirement.into()))
}

/// POST /v1/requirements: Add a catalog entry.
#[utoipa::path(
    post,
    path = "/v1/requirements",
    request_body = CreateRequirementRequest,
    responses(
        (status = 201, description = "Requirement created", body = RequirementView),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 409, description = "Code already in the catalog", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid code, prefix or state", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "requirements"
)]
async fn create_requirement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateRequirementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RequirementView>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let definition = RequirementDefinition {
        code: req.code.trim().to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        category: req.category.trim().to_string(),
        agency: req.agency.trim().to_string(),
        activity_prefixes: req.activity_prefixes,
        states: parse_states(&req.states)?,
        risk_level: req.risk_level,
        active: req.active,
        deadline_days: req.deadline_days,
    };
    definition.validate()?;
    let record = definition.into_requirement();

    state
        .requirements
        .insert_unless(record.id, record.clone(), |a, b| a.code == b.code)
        .map_err(|existing| {
            AppError::Conflict(format!("requirement {} already exists", existing.code))
        })?;

    if let Some(pool) = &state.db_pool {
        match crate::db::requirements::insert_if_absent(pool, &record).await {
            Ok(true) => {}
            Ok(false) => {
                state.requirements.remove(&record.id);
                return Err(AppError::Conflict(format!(
                    "requirement {} already exists",
                    record.code
                )));
            }
            Err(e) => {
                state.requirements.remove(&record.id);
                return Err(AppError::database("persist requirement", e));
            }
        }
    }

    tracing::info!(code = %record.code, created_by = %caller.user_id, "requirement added");
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// PUT /v1/requirements/:id: Update a catalog entry.
#[utoipa::path(
    put,
    path = "/v1/requirements/{id}",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    request_body = UpdateRequirementRequest,
    responses(
        (status = 200, description = "Requirement updated", body = RequirementView),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid prefix or state", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "requirements"
)]
async fn update_requirement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateRequirementRequest>, JsonRejection>,
) -> Result<Json<RequirementView>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let states = req.states.as_deref().map(parse_states).transpose()?;

    let updated = state
        .requirements
        .try_update(&id, |r| {
            let mut next = r.clone();
            if let Some(title) = req.title {
                next.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                next.description = description;
            }
            if let Some(category) = req.category {
                next.category = category.trim().to_string();
            }
            if let Some(agency) = req.agency {
                next.agency = agency.trim().to_string();
            }
            if let Some(prefixes) = req.activity_prefixes {
                next.activity_prefixes = prefixes;
            }
            if let Some(states) = states {
                next.states = states;
            }
            if let Some(risk) = req.risk_level {
                next.risk_level = risk;
            }
            if let Some(active) = req.active {
                next.active = active;
            }
            if let Some(days) = req.deadline_days {
                next.deadline_days = days;
            }
            check_requirement(&next)?;
            *r = next.clone();
            Ok::<_, AppError>(next)
        })
        .ok_or_else(|| AppError::NotFound(format!("requirement {id} not found")))??;

    if let Some(pool) = &state.db_pool {
        crate::db::requirements::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("persist requirement update", e))?;
    }

    tracing::info!(code = %updated.code, updated_by = %caller.user_id, "requirement updated");
    Ok(Json(updated.into()))
}

/// DELETE /v1/requirements/:id: Deactivate a catalog entry.
#[utoipa::path(
    delete,
    path = "/v1/requirements/{id}",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement deactivated", body = RequirementView),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "requirements"
)]
async fn deactivate_requirement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementView>, AppError> {
    require_role(&caller, Role::Admin)?;

    let updated = state
        .requirements
        .update(&id, |r| r.active = false)
        .ok_or_else(|| AppError::NotFound(format!("requirement {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        crate::db::requirements::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("persist requirement deactivation", e))?;
    }

    tracing::info!(code = %updated.code, "requirement deactivated");
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement() -> LegalRequirement {
        RequirementDefinition {
            code: "AVCB".into(),
            title: "Auto de Vistoria do Corpo de Bombeiros".into(),
            description: String::new(),
            category: "safety".into(),
            agency: "Corpo de Bombeiros".into(),
            activity_prefixes: vec!["5611".into()],
            states: vec![StateCode::new("SP").unwrap()],
            risk_level: RiskTier::Medium,
            active: true,
            deadline_days: Some(90),
        }
        .into_requirement()
    }

    #[test]
    fn view_flattens_domain_types() {
        let view = RequirementView::from(requirement());
        assert_eq!(view.states, ["SP"]);
        assert_eq!(view.risk_level, "medium");
    }

    #[test]
    fn check_requirement_rejects_bad_prefix() {
        let mut r = requirement();
        assert!(check_requirement(&r).is_ok());
        r.activity_prefixes = vec!["56".into()];
        assert!(matches!(check_requirement(&r), Err(AppError::Validation(_))));
    }
}
