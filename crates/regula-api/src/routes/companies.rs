//! # Company API
//!
//! Company registration and maintenance. Each company is owned by the user
//! who registered it; admins may act on any company. The CNPJ is unique
//! across all companies and the risk tier is recomputed on every write.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use regula_compliance::GenerationOutcome;
use regula_core::{ActivityCode, Cnpj, StateCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{check_text, extract_validated_json, Validate};
use crate::state::{AppState, CompanyRecord};

const MAX_SECONDARY_ACTIVITIES: usize = 99;

fn default_generate() -> bool {
    true
}

/// Request to register a company.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    /// Formatted or bare 14-digit CNPJ.
    #[schema(example = "11.222.333/0001-81")]
    pub cnpj: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    #[schema(example = "SP")]
    pub state: String,
    pub city: String,
    #[schema(example = "4711-3/02")]
    pub primary_activity: String,
    #[serde(default)]
    pub secondary_activities: Vec<String>,
    /// Run the obligation matcher right after creation.
    #[serde(default = "default_generate")]
    pub generate_obligations: bool,
}

impl Validate for CreateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("legal_name", &self.legal_name, 255)?;
        if let Some(trade_name) = &self.trade_name {
            check_text("trade_name", trade_name, 255)?;
        }
        check_text("city", &self.city, 120)?;
        if self.secondary_activities.len() > MAX_SECONDARY_ACTIVITIES {
            return Err(format!(
                "secondary_activities must not exceed {MAX_SECONDARY_ACTIVITIES} entries"
            ));
        }
        Ok(())
    }
}

/// Partial update of a company. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCompanyRequest {
    pub cnpj: Option<String>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub primary_activity: Option<String>,
    pub secondary_activities: Option<Vec<String>>,
}

impl Validate for UpdateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.legal_name {
            check_text("legal_name", name, 255)?;
        }
        if let Some(name) = &self.trade_name {
            check_text("trade_name", name, 255)?;
        }
        if let Some(city) = &self.city {
            check_text("city", city, 120)?;
        }
        if self
            .secondary_activities
            .as_ref()
            .is_some_and(|a| a.len() > MAX_SECONDARY_ACTIVITIES)
        {
            return Err(format!(
                "secondary_activities must not exceed {MAX_SECONDARY_ACTIVITIES} entries"
            ));
        }
        Ok(())
    }
}

/// Created company plus the outcome of the optional generation run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCompanyResponse {
    #[serde(flatten)]
    pub company: CompanyRecord,
    /// Present when obligations were generated.
    pub obligations: Option<GenerationResponse>,
}

/// Result of an obligation generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub generated: usize,
    pub total: usize,
}

impl From<GenerationOutcome> for GenerationResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            generated: outcome.generated,
            total: outcome.total,
        }
    }
}

/// Build the companies router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/companies", post(create_company).get(list_companies))
        .route(
            "/v1/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route(
            "/v1/companies/:id/obligations/generate",
            post(generate_obligations),
        )
}

/// Fetch a company the caller may act on.
///
/// Absent → 404; owned by someone else → 403.
pub(crate) fn accessible_company(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
) -> Result<CompanyRecord, AppError> {
    let company = state
        .companies
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("company {id} not found")))?;
    if !caller.can_access(company.owner_id) {
        return Err(AppError::Forbidden(format!(
            "company {id} belongs to another user"
        )));
    }
    Ok(company)
}

fn parse_activities(codes: &[String]) -> Result<Vec<ActivityCode>, AppError> {
    codes
        .iter()
        .map(|c| ActivityCode::new(c.as_str()).map_err(AppError::from))
        .collect()
}

/// POST /v1/companies: Register a company owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CreateCompanyResponse),
        (status = 409, description = "Invalid or already registered CNPJ", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid state or activity code", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn create_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCompanyResponse>), AppError> {
    let req = extract_validated_json(body)?;

    let cnpj = Cnpj::new(req.cnpj.as_str())?;
    let uf = StateCode::new(req.state.as_str())?;
    let primary_activity = ActivityCode::new(req.primary_activity.as_str())?;
    let secondary_activities = parse_activities(&req.secondary_activities)?;
    let risk_level = state.classifier.classify(&primary_activity, &uf);

    let now = Utc::now();
    let record = CompanyRecord {
        id: Uuid::new_v4(),
        cnpj,
        legal_name: req.legal_name.trim().to_string(),
        trade_name: req.trade_name.map(|t| t.trim().to_string()),
        state: uf,
        city: req.city.trim().to_string(),
        primary_activity,
        secondary_activities,
        risk_level,
        owner_id: caller.user_id,
        created_at: now,
        updated_at: now,
    };

    state
        .companies
        .insert_unless(record.id, record.clone(), |a, b| a.cnpj == b.cnpj)
        .map_err(|existing| {
            AppError::Conflict(format!("CNPJ {} is already registered", existing.cnpj))
        })?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::companies::insert(pool, &record).await {
            state.companies.remove(&record.id);
            return Err(AppError::database("persist company", e));
        }
    }

    tracing::info!(
        company_id = %record.id,
        owner_id = %caller.user_id,
        risk = %record.risk_level,
        "company registered"
    );

    let obligations = if req.generate_obligations {
        match crate::compliance::generate_obligations(&state, record.id).await {
            Ok(outcome) => Some(outcome.into()),
            Err(e) => {
                state.companies.remove(&record.id);
                if let Some(pool) = &state.db_pool {
                    if let Err(db_err) = crate::db::companies::delete(pool, record.id).await {
                        tracing::error!(company_id = %record.id, error = %db_err, "company rollback failed");
                    }
                }
                return Err(e);
            }
        }
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateCompanyResponse {
            company: record,
            obligations,
        }),
    ))
}

/// GET /v1/companies: The caller's companies (admins see all).
#[utoipa::path(
    get,
    path = "/v1/companies",
    responses((status = 200, description = "Companies", body = Vec<CompanyRecord>)),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn list_companies(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<Vec<CompanyRecord>> {
    let mut companies = if caller.role == Role::Admin {
        state.companies.list()
    } else {
        state.companies.filter(|c| c.owner_id == caller.user_id)
    };
    companies.sort_by(|a, b| a.legal_name.cmp(&b.legal_name).then(a.id.cmp(&b.id)));
    Json(companies)
}

/// GET /v1/companies/:id: Get a company.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company found", body = CompanyRecord),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn get_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyRecord>, AppError> {
    accessible_company(&state, &caller, id).map(Json)
}

/// PUT /v1/companies/:id: Update a company and recompute its risk tier.
#[utoipa::path(
    put,
    path = "/v1/companies/{id}",
    params(("id" = Uuid, Path, description = "Company ID")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = CompanyRecord),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid or already registered CNPJ", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn update_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> Result<Json<CompanyRecord>, AppError> {
    let req = extract_validated_json(body)?;
    accessible_company(&state, &caller, id)?;

    let cnpj = req.cnpj.as_deref().map(Cnpj::new).transpose()?;
    let uf = req.state.as_deref().map(StateCode::new).transpose()?;
    let primary = req
        .primary_activity
        .as_deref()
        .map(ActivityCode::new)
        .transpose()?;
    let secondary = req
        .secondary_activities
        .as_deref()
        .map(parse_activities)
        .transpose()?;
    let now = Utc::now();
    let classifier = state.classifier.clone();

    // The CNPJ uniqueness check and the write share one lock.
    let updated = state.companies.with_write(|companies| {
        if let Some(cnpj) = &cnpj {
            if companies.values().any(|c| c.id != id && &c.cnpj == cnpj) {
                return Err(AppError::Conflict(format!("CNPJ {cnpj} is already registered")));
            }
        }
        let company = companies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("company {id} not found")))?;
        if let Some(cnpj) = cnpj {
            company.cnpj = cnpj;
        }
        if let Some(name) = req.legal_name {
            company.legal_name = name.trim().to_string();
        }
        if let Some(name) = req.trade_name {
            company.trade_name = Some(name.trim().to_string());
        }
        if let Some(uf) = uf {
            company.state = uf;
        }
        if let Some(city) = req.city {
            company.city = city.trim().to_string();
        }
        if let Some(primary) = primary {
            company.primary_activity = primary;
        }
        if let Some(secondary) = secondary {
            company.secondary_activities = secondary;
        }
        company.risk_level = classifier.classify(&company.primary_activity, &company.state);
        company.updated_at = now;
        Ok(company.clone())
    })?;

    if let Some(pool) = &state.db_pool {
        crate::db::companies::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("persist company update", e))?;
    }

    tracing::info!(company_id = %id, risk = %updated.risk_level, "company updated");
    Ok(Json(updated))
}

/// DELETE /v1/companies/:id: Delete a company and its obligations.
#[utoipa::path(
    delete,
    path = "/v1/companies/{id}",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 204, description = "Company deleted"),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn delete_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    accessible_company(&state, &caller, id)?;

    if let Some(pool) = &state.db_pool {
        crate::db::companies::delete(pool, id)
            .await
            .map_err(|e| AppError::database("delete company", e))?;
    }

    state.companies.remove(&id);
    let removed = state.obligations.remove_where(|o| o.company_id == id);

    tracing::info!(company_id = %id, obligations = removed, "company deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/companies/:id/obligations/generate: Run the obligation matcher.
#[utoipa::path(
    post,
    path = "/v1/companies/{id}/obligations/generate",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Generation finished", body = GenerationResponse),
        (status = 403, description = "Owned by another user", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "companies"
)]
async fn generate_obligations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationResponse>, AppError> {
    accessible_company(&state, &caller, id)?;
    let outcome = crate::compliance::generate_obligations(&state, id).await?;
    Ok(Json(outcome.into()))
}
