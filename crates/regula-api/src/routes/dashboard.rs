//! # Compliance Dashboard
//!
//! Aggregate view over the caller's companies (admins: all companies).

use std::collections::{BTreeMap, HashMap, HashSet};

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use regula_compliance::ObligationStatus;
use regula_core::RiskTier;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CallerIdentity, Role};
use crate::routes::obligations::by_deadline_then_code;
use crate::state::{AppState, CompanyRecord, ObligationRecord};

const UPCOMING_WINDOW_DAYS: i64 = 30;
const UPCOMING_LIMIT: usize = 10;

/// An open obligation due soon.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpcomingDeadline {
    pub obligation_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub code: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    #[schema(example = "pending")]
    pub status: String,
}

/// Dashboard summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub company_count: usize,
    /// Company count per risk tier; every tier is present.
    pub companies_by_risk: BTreeMap<String, usize>,
    /// Obligation count per status; every status is present.
    pub obligations_by_status: BTreeMap<String, usize>,
    pub overdue_count: usize,
    /// Open obligations due within the next 30 days, soonest first.
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/dashboard", get(dashboard))
}

/// Compute the summary for a set of companies and their obligations.
pub fn summarize(
    companies: &[CompanyRecord],
    obligations: &[ObligationRecord],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let mut companies_by_risk: BTreeMap<String, usize> = RiskTier::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for company in companies {
        *companies_by_risk
            .entry(company.risk_level.as_str().to_string())
            .or_default() += 1;
    }

    let mut obligations_by_status: BTreeMap<String, usize> = ObligationStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for obligation in obligations {
        *obligations_by_status
            .entry(obligation.status.as_str().to_string())
            .or_default() += 1;
    }

    let names: HashMap<Uuid, &str> = companies
        .iter()
        .map(|c| (c.id, c.legal_name.as_str()))
        .collect();
    let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
    let mut upcoming: Vec<&ObligationRecord> = obligations
        .iter()
        .filter(|o| o.status.is_open())
        .filter(|o| o.deadline.is_some_and(|d| d >= now && d <= horizon))
        .collect();
    upcoming.sort_by(|a, b| by_deadline_then_code(a, b));

    let upcoming_deadlines = upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .filter_map(|o| {
            Some(UpcomingDeadline {
                obligation_id: o.id,
                company_id: o.company_id,
                company_name: names.get(&o.company_id)?.to_string(),
                code: o.code.clone(),
                title: o.title.clone(),
                deadline: o.deadline?,
                status: o.status.as_str().to_string(),
            })
        })
        .collect();

    DashboardSummary {
        company_count: companies.len(),
        companies_by_risk,
        overdue_count: obligations_by_status
            .get(ObligationStatus::Overdue.as_str())
            .copied()
            .unwrap_or(0),
        obligations_by_status,
        upcoming_deadlines,
    }
}

/// GET /v1/dashboard: Compliance summary.
#[utoipa::path(
    get,
    path = "/v1/dashboard",
    responses((status = 200, description = "Summary", body = DashboardSummary)),
    security(("bearer" = [])),
    tag = "dashboard"
)]
async fn dashboard(State(state): State<AppState>, caller: CallerIdentity) -> Json<DashboardSummary> {
    let companies = if caller.role == Role::Admin {
        state.companies.list()
    } else {
        state.companies.filter(|c| c.owner_id == caller.user_id)
    };
    let ids: HashSet<Uuid> = companies.iter().map(|c| c.id).collect();
    let obligations = state.obligations.filter(|o| ids.contains(&o.company_id));
    Json(summarize(&companies, &obligations, Utc::now()))
}
