//! Requirement catalog persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `legal_requirements`
//! table.

use regula_compliance::LegalRequirement;
use regula_core::{RiskTier, StateCode};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a requirement unless its code is already present.
///
/// Used both for admin-created entries and for seeding the configured
/// catalog at startup; rows already in the database keep their edits.
/// Returns whether a row was written.
pub async fn insert_if_absent(
    pool: &PgPool,
    record: &LegalRequirement,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO legal_requirements (id, code, title, description, category, agency,
         activity_prefixes, states, risk_level, active, deadline_days)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (code) DO NOTHING",
    )
    .bind(record.id)
    .bind(&record.code)
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.category)
    .bind(&record.agency)
    .bind(&record.activity_prefixes)
    .bind(states_to_db(&record.states))
    .bind(record.risk_level.as_str())
    .bind(record.active)
    .bind(days_to_db(record.deadline_days))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite every mutable column of a requirement.
pub async fn update(pool: &PgPool, record: &LegalRequirement) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE legal_requirements SET title = $1, description = $2, category = $3,
         agency = $4, activity_prefixes = $5, states = $6, risk_level = $7, active = $8,
         deadline_days = $9
         WHERE id = $10",
    )
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.category)
    .bind(&record.agency)
    .bind(&record.activity_prefixes)
    .bind(states_to_db(&record.states))
    .bind(record.risk_level.as_str())
    .bind(record.active)
    .bind(days_to_db(record.deadline_days))
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load the whole catalog, inactive entries included.
pub async fn load_all(pool: &PgPool) -> Result<Vec<LegalRequirement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequirementRow>(
        "SELECT id, code, title, description, category, agency, activity_prefixes, states,
         risk_level, active, deadline_days
         FROM legal_requirements ORDER BY code",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RequirementRow::into_record).collect())
}

fn states_to_db(states: &[StateCode]) -> Vec<String> {
    states.iter().map(|s| s.as_str().to_string()).collect()
}

fn days_to_db(days: Option<u32>) -> Option<i32> {
    days.map(|d| i32::try_from(d).unwrap_or(i32::MAX))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RequirementRow {
    id: Uuid,
    code: String,
    title: String,
    description: String,
    category: String,
    agency: String,
    activity_prefixes: Vec<String>,
    states: Vec<String>,
    risk_level: String,
    active: bool,
    deadline_days: Option<i32>,
}

impl RequirementRow {
    fn into_record(self) -> LegalRequirement {
        let states = self
            .states
            .iter()
            .filter_map(|s| match StateCode::new(s) {
                Ok(state) => Some(state),
                Err(_) => {
                    tracing::warn!(code = %self.code, state = %s, "dropping unknown state in database");
                    None
                }
            })
            .collect();
        let risk_level = self.risk_level.parse().unwrap_or_else(|_| {
            tracing::warn!(
                risk = %self.risk_level,
                "unknown risk tier in database, defaulting to medium"
            );
            RiskTier::Medium
        });
        LegalRequirement {
            id: self.id,
            code: self.code,
            title: self.title,
            description: self.description,
            category: self.category,
            agency: self.agency,
            activity_prefixes: self.activity_prefixes,
            states,
            risk_level,
            active: self.active,
            deadline_days: self.deadline_days.and_then(|d| u32::try_from(d).ok()),
        }
    }
}
