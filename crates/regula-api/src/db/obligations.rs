//! Obligation persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `legal_obligations`
//! table.

use chrono::{DateTime, Utc};
use regula_compliance::{ObligationStatus, Priority};
use regula_core::RiskTier;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::ObligationRecord;

/// Insert a batch of obligations in one transaction.
///
/// Rows whose `(company_id, code)` already exists are skipped. Returns the
/// number of rows actually written.
pub async fn insert_batch(pool: &PgPool, records: &[ObligationRecord]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut written = 0;
    for record in records {
        let result = sqlx::query(
            "INSERT INTO legal_obligations (id, company_id, code, title, description, category,
             agency, status, risk_level, priority, deadline, notes, completed_at,
             created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             ON CONFLICT (company_id, code) DO NOTHING",
        )
        .bind(record.id)
        .bind(record.company_id)
        .bind(&record.code)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.agency)
        .bind(record.status.as_str())
        .bind(record.risk_level.as_str())
        .bind(record.priority.as_str())
        .bind(record.deadline)
        .bind(&record.notes)
        .bind(record.completed_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }
    tx.commit().await?;
    Ok(written)
}

/// Insert a single obligation.
pub async fn insert(pool: &PgPool, record: &ObligationRecord) -> Result<(), sqlx::Error> {
    insert_batch(pool, std::slice::from_ref(record)).await.map(|_| ())
}

/// Overwrite the mutable columns of an obligation.
pub async fn update(pool: &PgPool, record: &ObligationRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE legal_obligations SET status = $1, priority = $2, deadline = $3, notes = $4,
         completed_at = $5, updated_at = $6
         WHERE id = $7",
    )
    .bind(record.status.as_str())
    .bind(record.priority.as_str())
    .bind(record.deadline)
    .bind(&record.notes)
    .bind(record.completed_at)
    .bind(record.updated_at)
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an obligation.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM legal_obligations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark open obligations past their deadline as overdue.
///
/// Mirrors the in-memory sweep; returns the number of rows changed.
pub async fn mark_overdue(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE legal_obligations SET status = 'overdue', updated_at = $1
         WHERE status IN ('pending', 'in_progress') AND deadline IS NOT NULL AND deadline < $1",
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Load all obligations from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ObligationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ObligationRow>(
        "SELECT id, company_id, code, title, description, category, agency, status,
         risk_level, priority, deadline, notes, completed_at, created_at, updated_at
         FROM legal_obligations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ObligationRow::into_record).collect())
}

fn parse_status(s: &str) -> ObligationStatus {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(status = s, "unknown obligation status in database, defaulting to pending");
        ObligationStatus::Pending
    })
}

fn parse_priority(s: &str) -> Priority {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(priority = s, "unknown priority in database, defaulting to medium");
        Priority::Medium
    })
}

fn parse_risk(s: &str) -> RiskTier {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(risk = s, "unknown risk tier in database, defaulting to medium");
        RiskTier::Medium
    })
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ObligationRow {
    id: Uuid,
    company_id: Uuid,
    code: String,
    title: String,
    description: String,
    category: String,
    agency: String,
    status: String,
    risk_level: String,
    priority: String,
    deadline: Option<DateTime<Utc>>,
    notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ObligationRow {
    fn into_record(self) -> ObligationRecord {
        ObligationRecord {
            id: self.id,
            company_id: self.company_id,
            code: self.code,
            title: self.title,
            description: self.description,
            category: self.category,
            agency: self.agency,
            status: parse_status(&self.status),
            risk_level: parse_risk(&self.risk_level),
            priority: parse_priority(&self.priority),
            deadline: self.deadline,
            notes: self.notes,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
