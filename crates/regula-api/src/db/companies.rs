//! Company persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `companies` table.
//! Deleting a company cascades to its obligations in the schema.

use chrono::{DateTime, Utc};
use regula_core::{ActivityCode, Cnpj, RiskTier, StateCode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::CompanyRecord;

const COLUMNS: &str = "id, cnpj, legal_name, trade_name, state, city, primary_activity,
     secondary_activities, risk_level, owner_id, created_at, updated_at";

/// Insert a new company.
pub async fn insert(pool: &PgPool, record: &CompanyRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO companies (id, cnpj, legal_name, trade_name, state, city,
         primary_activity, secondary_activities, risk_level, owner_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(record.id)
    .bind(record.cnpj.as_str())
    .bind(&record.legal_name)
    .bind(&record.trade_name)
    .bind(record.state.as_str())
    .bind(&record.city)
    .bind(record.primary_activity.as_str())
    .bind(secondary_to_db(&record.secondary_activities))
    .bind(record.risk_level.as_str())
    .bind(record.owner_id)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite every mutable column of a company.
pub async fn update(pool: &PgPool, record: &CompanyRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE companies SET cnpj = $1, legal_name = $2, trade_name = $3, state = $4,
         city = $5, primary_activity = $6, secondary_activities = $7, risk_level = $8,
         updated_at = $9
         WHERE id = $10",
    )
    .bind(record.cnpj.as_str())
    .bind(&record.legal_name)
    .bind(&record.trade_name)
    .bind(record.state.as_str())
    .bind(&record.city)
    .bind(record.primary_activity.as_str())
    .bind(secondary_to_db(&record.secondary_activities))
    .bind(record.risk_level.as_str())
    .bind(record.updated_at)
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a company and, by cascade, its obligations.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all companies from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<CompanyRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COLUMNS} FROM companies ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(record) => records.push(record),
            None => {
                tracing::error!("skipping company row with invalid identifiers during load_all");
            }
        }
    }
    Ok(records)
}

fn secondary_to_db(codes: &[ActivityCode]) -> Vec<String> {
    codes.iter().map(|c| c.as_str().to_string()).collect()
}

fn parse_risk(s: &str) -> RiskTier {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(risk = s, "unknown risk tier in database, defaulting to medium");
        RiskTier::Medium
    })
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    cnpj: String,
    legal_name: String,
    trade_name: Option<String>,
    state: String,
    city: String,
    primary_activity: String,
    secondary_activities: Vec<String>,
    risk_level: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_record(self) -> Option<CompanyRecord> {
        let parsed = (|| {
            let cnpj = Cnpj::new(self.cnpj.trim())?;
            let state = StateCode::new(&self.state)?;
            let primary_activity = ActivityCode::new(&self.primary_activity)?;
            let secondary_activities = self
                .secondary_activities
                .iter()
                .map(|code| ActivityCode::new(code))
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, regula_core::ValidationError>((
                cnpj,
                state,
                primary_activity,
                secondary_activities,
            ))
        })();

        let (cnpj, state, primary_activity, secondary_activities) = match parsed {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!(id = %self.id, error = %err, "skipping invalid company row");
                return None;
            }
        };

        Some(CompanyRecord {
            id: self.id,
            cnpj,
            legal_name: self.legal_name,
            trade_name: self.trade_name,
            state,
            city: self.city,
            primary_activity,
            secondary_activities,
            risk_level: parse_risk(&self.risk_level),
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
