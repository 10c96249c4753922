//! # User Administration API
//!
//! Admin-only listing of accounts and role changes. A role change takes
//! effect on the user's next request; tokens are not reissued.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, UserRecord};

/// Request to change a user's role.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

impl Validate for UpdateRoleRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users", get(list_users))
        .route("/v1/users/:id/role", put(update_role))
}

/// GET /v1/users: List every account.
#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserRecord>),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut users = state.users.list();
    users.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(users))
}

/// PUT /v1/users/:id/role: Change a user's role.
#[utoipa::path(
    put,
    path = "/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserRecord),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
async fn update_role(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let now = Utc::now();

    let user = state
        .users
        .update(&id, |u| {
            u.role = req.role;
            u.updated_at = now;
        })
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        crate::db::users::update_role(pool, id, user.role, now)
            .await
            .map_err(|e| AppError::database("persist role change", e))?;
    }

    tracing::info!(user_id = %id, role = user.role.as_str(), changed_by = %caller.user_id, "role changed");
    Ok(Json(user))
}
