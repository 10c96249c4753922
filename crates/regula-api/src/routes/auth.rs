//! # Authentication API
//!
//! Registration, login and refresh are public; logout and `me` sit behind
//! the auth middleware.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CallerIdentity, Role, TokenPair, TokenType};
use crate::error::AppError;
use crate::extractors::{check_text, extract_validated_json, Validate};
use crate::password::{
    hash_password_blocking, normalize_email, validate_password_strength, verify_password_blocking,
};
use crate::state::{AppState, UserRecord};

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Request to create an account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        normalize_email(&self.email)?;
        validate_password_strength(&self.password)?;
        check_text("name", &self.name, 200)
    }
}

/// Email and password credentials.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password are required".to_string());
        }
        Ok(())
    }
}

/// Request to exchange a refresh token for a new pair.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), String> {
        if self.refresh_token.trim().is_empty() {
            return Err("refresh_token must not be empty".to_string());
        }
        Ok(())
    }
}

/// Routes reachable without a token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/refresh", post(refresh))
}

/// Routes requiring an access token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/logout", post(logout))
        .route("/v1/auth/me", get(me))
}

/// Create a user, failing with `Conflict` if the email is taken.
///
/// Shared by registration and the startup admin bootstrap.
pub async fn create_user(
    state: &AppState,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> Result<UserRecord, AppError> {
    let email = normalize_email(email).map_err(AppError::Validation)?;
    let password_hash = hash_password_blocking(password).await?;
    let now = Utc::now();
    let record = UserRecord {
        id: Uuid::new_v4(),
        email,
        name: name.trim().to_string(),
        password_hash,
        role,
        token_version: 0,
        created_at: now,
        updated_at: now,
    };

    state
        .users
        .insert_unless(record.id, record.clone(), |a, b| a.email == b.email)
        .map_err(|existing| {
            AppError::Conflict(format!("email {} is already registered", existing.email))
        })?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert(pool, &record).await {
            state.users.remove(&record.id);
            return Err(AppError::database("persist user", e));
        }
    }

    tracing::info!(user_id = %record.id, role = role.as_str(), "user created");
    Ok(record)
}

/// POST /v1/auth/register: Create an account with the `user` role.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserRecord),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid email or weak password", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let user = create_user(&state, &req.email, &req.password, &req.name, Role::User).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /v1/auth/login: Exchange credentials for a token pair.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AppError> {
    let req = extract_validated_json(body)?;
    let email = req.email.trim().to_lowercase();

    let user = state.users.find(|u| u.email == email);
    let verified = match &user {
        Some(u) => verify_password_blocking(&req.password, &u.password_hash).await?,
        None => false,
    };

    match user {
        Some(user) if verified => {
            tracing::info!(user_id = %user.id, "login succeeded");
            Ok(Json(state.jwt.issue(&user, Utc::now())?))
        }
        _ => {
            tracing::warn!("login failed");
            Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()))
        }
    }
}

/// POST /v1/auth/refresh: Issue a new pair from a refresh token.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AppError> {
    let req = extract_validated_json(body)?;
    let user = state
        .jwt
        .authenticate(&state, req.refresh_token.trim(), TokenType::Refresh)?;
    Ok(Json(state.jwt.issue(&user, Utc::now())?))
}

/// POST /v1/auth/logout: Revoke every token issued to the caller.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Tokens revoked"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
async fn logout(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<StatusCode, AppError> {
    let now = Utc::now();
    let user = state
        .users
        .update(&caller.user_id, |u| {
            u.token_version = u.token_version.wrapping_add(1);
            u.updated_at = now;
        })
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;

    if let Some(pool) = &state.db_pool {
        crate::db::users::update_token_version(pool, user.id, user.token_version, now)
            .await
            .map_err(|e| AppError::database("persist logout", e))?;
    }

    tracing::info!(user_id = %user.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/auth/me: The authenticated user.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
async fn me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserRecord>, AppError> {
    state
        .users
        .get(&caller.user_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", caller.user_id)))
}
