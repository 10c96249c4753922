//! # Integration Tests for regula-api
//!
//! Drives the assembled router end to end: health probes, registration and
//! login, token refresh and logout, company registration with risk
//! classification, obligation generation and tracking, ownership checks,
//! the admin overdue sweep, the catalog, and the dashboard.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use regula_api::auth::Role;
use regula_api::config::AppConfig;
use regula_api::state::AppState;
use regula_compliance::{LegalRequirement, RequirementDefinition, RiskClassifier};
use regula_core::{RiskTier, StateCode};

const SECRET: &str = "integration-test-secret-0123456789abcdef";
const PASSWORD: &str = "Str0ngPassword";

fn requirement(code: &str, states: &[&str], deadline_days: Option<u32>) -> LegalRequirement {
    RequirementDefinition {
        code: code.into(),
        title: format!("{code} title"),
        description: String::new(),
        category: "general".into(),
        agency: "Agency".into(),
        activity_prefixes: vec![],
        states: states.iter().map(|s| StateCode::new(*s).unwrap()).collect(),
        risk_level: RiskTier::High,
        active: true,
        deadline_days,
    }
    .into_requirement()
}

/// Helper: state with one universal and one SP-only requirement.
fn test_state() -> AppState {
    AppState::new(
        AppConfig::for_testing(SECRET),
        RiskClassifier::default(),
        vec![
            requirement("UNIVERSAL", &[], Some(30)),
            requirement("SP-ONLY", &["SP"], None),
        ],
        None,
    )
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Helper: send a request and return status plus JSON body.
async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = regula_api::app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn register(state: &AppState, email: &str) -> Value {
    let (status, body) = send(
        state,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"email": email, "password": PASSWORD, "name": "Test User"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(state: &AppState, email: &str) -> Value {
    let (status, body) = send(
        state,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"email": email, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

/// Helper: register and log in a user, returning the access token.
async fn user_token(state: &AppState, email: &str) -> String {
    register(state, email).await;
    login(state, email).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Helper: create an admin directly and log in.
async fn admin_token(state: &AppState) -> String {
    regula_api::routes::auth::create_user(state, "admin@example.com", PASSWORD, "Admin", Role::Admin)
        .await
        .unwrap();
    login(state, "admin@example.com").await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn company_body(cnpj: &str, uf: &str, activity: &str) -> Value {
    json!({
        "cnpj": cnpj,
        "legal_name": "Acme Mineração Ltda",
        "state": uf,
        "city": "Manaus",
        "primary_activity": activity,
    })
}

// -- Health, metrics, OpenAPI -------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let state = test_state();
    for (uri, expected) in [("/health/liveness", "ok"), ("/health/readiness", "ready")] {
        let response = regula_api::app(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], expected.as_bytes());
    }
}

#[tokio::test]
async fn test_openapi_is_public() {
    let state = test_state();
    let (status, body) = send(&state, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/companies"].is_object());
}

#[tokio::test]
async fn test_metrics_is_public() {
    let state = test_state();
    let (status, body) = send(&state, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["requests"].is_u64());
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn test_register_and_login() {
    let state = test_state();
    let user = register(&state, "Ana@Example.com").await;
    assert_eq!(user["email"], "ana@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password_hash").is_none());

    let pair = login(&state, "ana@example.com").await;
    assert_eq!(pair["token_type"], "Bearer");
    assert_eq!(pair["expires_in"], 900);

    let token = pair["access_token"].as_str().unwrap();
    let (status, me) = send(&state, "GET", "/v1/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@example.com");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let state = test_state();
    register(&state, "ana@example.com").await;
    let (status, body) = send(
        &state,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"email": "ANA@example.com", "password": PASSWORD, "name": "Ana"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let state = test_state();
    let (status, _) = send(
        &state,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"email": "ana@example.com", "password": "short", "name": "Ana"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let state = test_state();
    register(&state, "ana@example.com").await;
    let (wrong, wrong_body) = send(
        &state,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"email": "ana@example.com", "password": "Wr0ngPassword"})),
    )
    .await;
    let (unknown, unknown_body) = send(
        &state,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["error"]["message"], unknown_body["error"]["message"]);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let state = test_state();
    let (status, _) = send(&state, "GET", "/v1/companies", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let state = test_state();
    register(&state, "ana@example.com").await;
    let pair = login(&state, "ana@example.com").await;
    let access = pair["access_token"].as_str().unwrap();
    let refresh = pair["refresh_token"].as_str().unwrap();

    // An access token is not a refresh token.
    let (status, _) = send(
        &state,
        "POST",
        "/v1/auth/refresh",
        None,
        Some(json!({"refresh_token": access})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, refreshed) = send(
        &state,
        "POST",
        "/v1/auth/refresh",
        None,
        Some(json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = refreshed["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(&state, "POST", "/v1/auth/logout", Some(&new_access), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Every token issued before logout is now rejected.
    let (status, _) = send(&state, "GET", "/v1/auth/me", Some(&new_access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &state,
        "POST",
        "/v1/auth/refresh",
        None,
        Some(json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Companies ----------------------------------------------------------------

#[tokio::test]
async fn test_mining_in_amazonas_is_critical() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, body) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11.222.333/0001-81", "AM", "0510-0/00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["cnpj"], "11222333000181");
    assert_eq!(body["risk_level"], "critical");
    assert_eq!(body["primary_activity"], "0510-0/00");

    // Only the universal requirement applies outside SP.
    assert_eq!(body["obligations"], json!({"generated": 1, "total": 1}));
    let id = body["id"].as_str().unwrap();
    let (_, list) = send(
        &state,
        "GET",
        &format!("/v1/companies/{id}/obligations"),
        Some(&token),
        None,
    )
    .await;
    let codes: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, ["UNIVERSAL"]);
}

#[tokio::test]
async fn test_generation_respects_state_filter_and_is_idempotent() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "RJ", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(company["obligations"]["generated"], 1);
    assert_eq!(company["obligations"]["total"], 1);

    let id = company["id"].as_str().unwrap();
    let (status, again) = send(
        &state,
        "POST",
        &format!("/v1/companies/{id}/obligations/generate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, json!({"generated": 0, "total": 1}));

    let (status, list) = send(
        &state,
        "GET",
        &format!("/v1/companies/{id}/obligations"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["code"], "UNIVERSAL");
    assert_eq!(list[0]["status"], "pending");
    assert_eq!(list[0]["priority"], "high");
}

#[tokio::test]
async fn test_generation_can_be_deferred() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let mut body = company_body("11222333000181", "SP", "4711-3/02");
    body["generate_obligations"] = json!(false);
    let (status, company) = send(&state, "POST", "/v1/companies", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(company["obligations"].is_null());

    let id = company["id"].as_str().unwrap();
    let (_, outcome) = send(
        &state,
        "POST",
        &format!("/v1/companies/{id}/obligations/generate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(outcome, json!({"generated": 2, "total": 2}));
}

#[tokio::test]
async fn test_duplicate_cnpj_conflicts() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "SP", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11.222.333/0001-81", "RJ", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_cnpj_conflicts() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000182", "SP", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(state.companies.is_empty());
}

#[tokio::test]
async fn test_invalid_state_is_validation_error() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "XX", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_foreign_company_forbidden_missing_not_found() {
    let state = test_state();
    let owner = user_token(&state, "owner@example.com").await;
    let other = user_token(&state, "other@example.com").await;
    let (_, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&owner),
        Some(company_body("11222333000181", "SP", "4711-3/02")),
    )
    .await;
    let id = company["id"].as_str().unwrap();

    let (status, _) = send(&state, "GET", &format!("/v1/companies/{id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &state,
        "GET",
        &format!("/v1/companies/{id}/obligations"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &state,
        "GET",
        &format!("/v1/companies/{missing}"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Each user lists only their own companies.
    let (_, listed) = send(&state, "GET", "/v1/companies", Some(&other), None).await;
    assert_eq!(listed, json!([]));

    // Admins see everything.
    let admin = admin_token(&state).await;
    let (status, _) = send(&state, "GET", &format!("/v1/companies/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_recomputes_risk_and_delete_cascades() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (_, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "SP", "0510-0/00")),
    )
    .await;
    assert_eq!(company["risk_level"], "high");
    let id = company["id"].as_str().unwrap();

    let (status, updated) = send(
        &state,
        "PUT",
        &format!("/v1/companies/{id}"),
        Some(&token),
        Some(json!({"state": "PA"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["risk_level"], "critical");

    assert!(!state.obligations.is_empty());
    let (status, _) = send(&state, "DELETE", &format!("/v1/companies/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.companies.is_empty());
    assert!(state.obligations.is_empty());
}

// -- Obligations --------------------------------------------------------------

#[tokio::test]
async fn test_obligation_lifecycle() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (_, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "RJ", "4711-3/02")),
    )
    .await;
    let company_id = company["id"].as_str().unwrap();

    let (status, manual) = send(
        &state,
        "POST",
        &format!("/v1/companies/{company_id}/obligations"),
        Some(&token),
        Some(json!({
            "code": "MANUAL-1",
            "title": "Manual obligation",
            "category": "tax",
            "agency": "Receita Federal",
            "risk_level": "critical",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{manual}");
    assert_eq!(manual["priority"], "urgent");

    // Same code twice on one company conflicts.
    let (status, _) = send(
        &state,
        "POST",
        &format!("/v1/companies/{company_id}/obligations"),
        Some(&token),
        Some(json!({
            "code": "UNIVERSAL",
            "title": "Duplicate",
            "category": "tax",
            "agency": "Receita Federal",
            "risk_level": "low",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = manual["id"].as_str().unwrap();
    let (status, done) = send(
        &state,
        "PUT",
        &format!("/v1/obligations/{id}"),
        Some(&token),
        Some(json!({"status": "completed", "notes": "filed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    assert!(done["completed_at"].is_string());

    let (_, reopened) = send(
        &state,
        "PUT",
        &format!("/v1/obligations/{id}"),
        Some(&token),
        Some(json!({"status": "in_progress"})),
    )
    .await;
    assert!(reopened["completed_at"].is_null());
    assert_eq!(reopened["notes"], "filed");

    let (_, filtered) = send(
        &state,
        "GET",
        &format!("/v1/companies/{company_id}/obligations?status=in_progress"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let (status, _) = send(&state, "DELETE", &format!("/v1/obligations/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&state, "GET", &format!("/v1/obligations/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overdue_sweep_is_admin_only() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (_, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "RJ", "4711-3/02")),
    )
    .await;
    let company_id = company["id"].as_str().unwrap();
    let (_, late) = send(
        &state,
        "POST",
        &format!("/v1/companies/{company_id}/obligations"),
        Some(&token),
        Some(json!({
            "code": "LATE",
            "title": "Late obligation",
            "category": "tax",
            "agency": "Receita Federal",
            "risk_level": "medium",
            "deadline": "2020-01-01T00:00:00Z",
        })),
    )
    .await;

    let (status, _) = send(&state, "POST", "/v1/obligations/overdue-sweep", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = admin_token(&state).await;
    let (status, body) = send(&state, "POST", "/v1/obligations/overdue-sweep", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"updated": 1}));

    let id = late["id"].as_str().unwrap();
    let (_, swept) = send(&state, "GET", &format!("/v1/obligations/{id}"), Some(&token), None).await;
    assert_eq!(swept["status"], "overdue");
}

// -- Requirements, utilities, dashboard -----------------------------------------

#[tokio::test]
async fn test_requirement_admin_flow() {
    let state = test_state();
    let user = user_token(&state, "ana@example.com").await;
    let admin = admin_token(&state).await;
    let new_requirement = json!({
        "code": "NEW-REQ",
        "title": "New requirement",
        "category": "environmental",
        "agency": "IBAMA",
        "activity_prefixes": ["0510"],
        "risk_level": "high",
    });

    let (status, _) = send(&state, "POST", "/v1/requirements", Some(&user), Some(new_requirement.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&state, "POST", "/v1/requirements", Some(&admin), Some(new_requirement.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let (status, _) = send(&state, "POST", "/v1/requirements", Some(&admin), Some(new_requirement)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = created["id"].as_str().unwrap();
    let (status, deactivated) = send(&state, "DELETE", &format!("/v1/requirements/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deactivated["active"], false);

    let (_, visible) = send(&state, "GET", "/v1/requirements", Some(&user), None).await;
    assert_eq!(visible.as_array().unwrap().len(), 2);
    let (status, _) = send(&state, "GET", "/v1/requirements?include_inactive=true", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, all) = send(&state, "GET", "/v1/requirements?include_inactive=true", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_out_of_range_deadline_rejected() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/requirements",
        Some(&admin),
        Some(json!({
            "code": "FAR-FUTURE",
            "title": "Far future",
            "category": "c",
            "agency": "a",
            "risk_level": "low",
            "deadline_days": 4_000_000_000u64,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Company creation still succeeds against the unchanged catalog.
    let token = user_token(&state, "ana@example.com").await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "SP", "4711-3/02")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_null_clears_optional_fields() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (_, company) = send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "RJ", "4711-3/02")),
    )
    .await;
    let company_id = company["id"].as_str().unwrap();
    let (_, list) = send(
        &state,
        "GET",
        &format!("/v1/companies/{company_id}/obligations"),
        Some(&token),
        None,
    )
    .await;
    let id = list[0]["id"].as_str().unwrap().to_string();
    assert!(list[0]["deadline"].is_string());

    let (_, noted) = send(
        &state,
        "PUT",
        &format!("/v1/obligations/{id}"),
        Some(&token),
        Some(json!({"notes": "awaiting agency"})),
    )
    .await;
    assert_eq!(noted["notes"], "awaiting agency");
    assert!(noted["deadline"].is_string());

    let (status, cleared) = send(
        &state,
        "PUT",
        &format!("/v1/obligations/{id}"),
        Some(&token),
        Some(json!({"notes": null, "deadline": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["notes"].is_null());
    assert!(cleared["deadline"].is_null());

    let admin = admin_token(&state).await;
    let (_, catalog) = send(&state, "GET", "/v1/requirements", Some(&admin), None).await;
    let universal = catalog
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["code"] == "UNIVERSAL")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, updated) = send(
        &state,
        "PUT",
        &format!("/v1/requirements/{universal}"),
        Some(&admin),
        Some(json!({"deadline_days": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["deadline_days"].is_null());
}

#[tokio::test]
async fn test_bad_prefix_rejected() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let (status, _) = send(
        &state,
        "POST",
        "/v1/requirements",
        Some(&admin),
        Some(json!({
            "code": "BAD",
            "title": "Bad",
            "category": "c",
            "agency": "a",
            "activity_prefixes": ["05"],
            "risk_level": "low",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cnpj_lookup_is_public() {
    let state = test_state();
    let (status, body) = send(&state, "GET", "/v1/cnpj/11222333000181", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "input": "11222333000181",
            "digits": "11222333000181",
            "valid": true,
            "formatted": "11.222.333/0001-81",
        })
    );

    let (_, bad) = send(&state, "GET", "/v1/cnpj/11111111111111", None, None).await;
    assert_eq!(bad["valid"], false);
}

#[tokio::test]
async fn test_risk_classify() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let (status, body) = send(
        &state,
        "GET",
        "/v1/risk/classify?activity_code=0510-0/00&state=am",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "prefix": "0510",
            "base_tier": "high",
            "tier": "critical",
            "heightened_jurisdiction": true,
        })
    );

    let (status, _) = send(&state, "GET", "/v1/risk/classify?activity_code=0510-0/00&state=am", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_counts_callers_companies() {
    let state = test_state();
    let token = user_token(&state, "ana@example.com").await;
    let other = user_token(&state, "other@example.com").await;
    send(
        &state,
        "POST",
        "/v1/companies",
        Some(&token),
        Some(company_body("11222333000181", "AM", "0510-0/00")),
    )
    .await;
    send(
        &state,
        "POST",
        "/v1/companies",
        Some(&other),
        Some(company_body("33592363000112", "SP", "4711-3/02")),
    )
    .await;

    let (status, summary) = send(&state, "GET", "/v1/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["company_count"], 1);
    assert_eq!(summary["companies_by_risk"]["critical"], 1);
    assert_eq!(summary["obligations_by_status"]["pending"], 1);
    assert_eq!(summary["overdue_count"], 0);
    assert_eq!(summary["upcoming_deadlines"].as_array().unwrap().len(), 1);

    let admin = admin_token(&state).await;
    let (_, everything) = send(&state, "GET", "/v1/dashboard", Some(&admin), None).await;
    assert_eq!(everything["company_count"], 2);
}

#[tokio::test]
async fn test_user_role_change_takes_effect() {
    let state = test_state();
    let user = register(&state, "ana@example.com").await;
    let token = login(&state, "ana@example.com").await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let admin = admin_token(&state).await;

    let (status, _) = send(&state, "GET", "/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = user["id"].as_str().unwrap();
    let (status, promoted) = send(
        &state,
        "PUT",
        &format!("/v1/users/{id}/role"),
        Some(&admin),
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "admin");

    // The existing token now carries admin rights.
    let (status, users) = send(&state, "GET", "/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}
