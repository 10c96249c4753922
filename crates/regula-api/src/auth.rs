//! # Authentication & Authorization
//!
//! HS256 JWT access/refresh token pairs with role-based access control.
//!
//! ## Tokens
//!
//! Both tokens carry the same claim set and differ only in `typ` and
//! lifetime:
//!
//! ```text
//! { sub: <user id>, role, typ: access|refresh, ver: <token version>, iat, exp, jti }
//! ```
//!
//! Access tokens authenticate API calls; refresh tokens are accepted only
//! by `/v1/auth/refresh`. Logging out bumps the user's token version, which
//! invalidates every token issued before it.
//!
//! ## CallerIdentity
//!
//! The auth middleware verifies the access token, checks it against the
//! current user record, and injects a [`CallerIdentity`] into the request
//! extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::{AppState, UserRecord};

const LEEWAY_SECS: u64 = 5;

// ── Role ────────────────────────────────────────────────────────────────────

/// Account roles, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order (`User < Admin`),
/// so role checks are a single `>=` comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages the companies they own.
    User,
    /// Sees every company, administers the requirement catalog and users.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other:?}")),
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: Role,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Whether the caller may act on a resource owned by `owner_id`.
    ///
    /// Admins may act on anything; users only on what they own.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.role == Role::Admin || self.user_id == owner_id
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Tokens ──────────────────────────────────────────────────────────────────

/// Which half of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub typ: TokenType,
    pub ver: u32,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Why a token was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("wrong token type for this endpoint")]
    WrongType { expected: TokenType },
    #[error("token has been revoked")]
    Revoked,
    #[error("account no longer exists")]
    UnknownUser,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Token signing and verification keys.
///
/// Custom `Debug` redacts the key material.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("keys", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl JwtKeys {
    /// Build keys from a shared HMAC secret.
    pub fn from_secret(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Build keys from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_secret(
            &config.jwt_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            AppError::Internal("token signing failed".into())
        })
    }

    /// Issue a fresh access/refresh pair for `user`.
    pub fn issue(&self, user: &UserRecord, now: DateTime<Utc>) -> Result<TokenPair, AppError> {
        let iat = now.timestamp();
        let claims = |typ: TokenType, ttl: i64| Claims {
            sub: user.id,
            role: user.role,
            typ,
            ver: user.token_version,
            iat,
            exp: iat + ttl,
            jti: Uuid::new_v4(),
        };
        Ok(TokenPair {
            access_token: self.sign(&claims(TokenType::Access, self.access_ttl_secs))?,
            refresh_token: self.sign(&claims(TokenType::Refresh, self.refresh_ttl_secs))?,
            token_type: "Bearer".into(),
            expires_in: self.access_ttl_secs,
        })
    }

    /// Verify signature, expiry and token type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        if data.claims.typ != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(data.claims)
    }

    /// Verify a token and check it against the current user record.
    ///
    /// Returns the user so callers see the current role rather than the
    /// one frozen into the token.
    pub fn authenticate(
        &self,
        state: &AppState,
        token: &str,
        expected: TokenType,
    ) -> Result<UserRecord, TokenError> {
        let claims = self.verify(token, expected)?;
        let user = state.users.get(&claims.sub).ok_or(TokenError::UnknownUser)?;
        if user.token_version != claims.ver {
            return Err(TokenError::Revoked);
        }
        Ok(user)
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer access token from the Authorization header.
///
/// On success injects [`CallerIdentity`] into request extensions for
/// downstream handlers. Failures are logged without token material.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) if value.starts_with("Bearer ") => value[7..].trim().to_string(),
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            return unauthorized_response("authorization header must use Bearer scheme");
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
    };

    match state.jwt.authenticate(&state, &token, TokenType::Access) {
        Ok(user) => {
            request.extensions_mut().insert(CallerIdentity {
                user_id: user.id,
                role: user.role,
            });
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(reason = %err, "authentication failed");
            unauthorized_response(&err.to_string())
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use regula_compliance::RiskClassifier;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn state_with_user(role: Role) -> (AppState, UserRecord) {
        let state = AppState::new(
            AppConfig::for_testing(SECRET),
            RiskClassifier::default(),
            vec![],
            None,
        );
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
            password_hash: String::new(),
            role,
            token_version: 0,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        (state, user)
    }

    async fn whoami(caller: CallerIdentity) -> String {
        format!("{}:{}", caller.user_id, caller.role.as_str())
    }

    fn test_app(state: AppState) -> Router {
        Router::new()
            .route("/test", get(whoami))
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::User);
        let user = CallerIdentity {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        assert!(require_role(&user, Role::User).is_ok());
        assert!(matches!(
            require_role(&user, Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn ownership_check() {
        let owner = Uuid::new_v4();
        let user = CallerIdentity {
            user_id: owner,
            role: Role::User,
        };
        assert!(user.can_access(owner));
        assert!(!user.can_access(Uuid::new_v4()));
        let admin = CallerIdentity {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.can_access(owner));
    }

    #[test]
    fn issued_tokens_verify_with_their_type() {
        let (state, user) = state_with_user(Role::User);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        let access = state.jwt.verify(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.typ, TokenType::Access);
        let refresh = state.jwt.verify(&pair.refresh_token, TokenType::Refresh).unwrap();
        assert!(refresh.exp > access.exp);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let (state, user) = state_with_user(Role::User);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        assert_eq!(
            state.jwt.verify(&pair.refresh_token, TokenType::Access),
            Err(TokenError::WrongType {
                expected: TokenType::Access
            })
        );
        assert!(state.jwt.verify(&pair.access_token, TokenType::Refresh).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let (state, user) = state_with_user(Role::User);
        let pair = state
            .jwt
            .issue(&user, Utc::now() - chrono::Duration::hours(2))
            .unwrap();
        assert_eq!(
            state.jwt.verify(&pair.access_token, TokenType::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn foreign_signature_rejected() {
        let (state, user) = state_with_user(Role::User);
        let other = JwtKeys::from_secret(b"another-secret-another-secret-123", 900, 3600);
        let pair = other.issue(&user, Utc::now()).unwrap();
        assert_eq!(
            state.jwt.verify(&pair.access_token, TokenType::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn bumped_version_revokes() {
        let (state, user) = state_with_user(Role::User);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        state.users.update(&user.id, |u| u.token_version += 1);
        assert_eq!(
            state
                .jwt
                .authenticate(&state, &pair.access_token, TokenType::Access)
                .unwrap_err(),
            TokenError::Revoked
        );
    }

    #[test]
    fn jwt_keys_debug_redacts() {
        let keys = JwtKeys::from_secret(SECRET.as_bytes(), 900, 3600);
        assert!(!format!("{keys:?}").contains(SECRET));
    }

    #[tokio::test]
    async fn valid_access_token_accepted() {
        let (state, user) = state_with_user(Role::Admin);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        let header = format!("Bearer {}", pair.access_token);
        let (status, body) = call(test_app(state), Some(&header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{}:admin", user.id));
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let (state, _) = state_with_user(Role::User);
        let (status, body) = call(test_app(state), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing authorization header"));
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (state, _) = state_with_user(Role::User);
        let (status, body) = call(test_app(state), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn refresh_token_rejected_by_middleware() {
        let (state, user) = state_with_user(Role::User);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        let header = format!("Bearer {}", pair.refresh_token);
        let (status, _) = call(test_app(state), Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleted_user_rejected() {
        let (state, user) = state_with_user(Role::User);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        state.users.remove(&user.id);
        let header = format!("Bearer {}", pair.access_token);
        let (status, body) = call(test_app(state), Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("no longer exists"));
    }

    #[tokio::test]
    async fn current_role_wins_over_token_role() {
        let (state, user) = state_with_user(Role::Admin);
        let pair = state.jwt.issue(&user, Utc::now()).unwrap();
        state.users.update(&user.id, |u| u.role = Role::User);
        let header = format!("Bearer {}", pair.access_token);
        let (_, body) = call(test_app(state), Some(&header)).await;
        assert!(body.ends_with(":user"));
    }
}
