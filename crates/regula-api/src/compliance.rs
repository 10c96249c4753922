//! # Obligation Generation & Sweeps
//!
//! Connects the obligation matcher in `regula-compliance` to the API's
//! in-memory stores and writes the results through to Postgres. Used by
//! company creation, the explicit generate endpoint, and the overdue sweep.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regula_compliance::{
    generate_for_company_at, CompanyProfile, ComplianceRepository, GenerationOutcome,
    LegalRequirement, NewObligation, ObligationStatus, RepositoryError,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, ObligationRecord};

/// [`ComplianceRepository`] over the in-memory stores.
///
/// Records inserted during a run are kept so the caller can persist exactly
/// those rows afterwards.
pub struct StoreRepository<'a> {
    state: &'a AppState,
    now: DateTime<Utc>,
    inserted: Mutex<Vec<ObligationRecord>>,
}

impl<'a> StoreRepository<'a> {
    pub fn new(state: &'a AppState, now: DateTime<Utc>) -> Self {
        Self {
            state,
            now,
            inserted: Mutex::new(Vec::new()),
        }
    }

    /// Obligations inserted through this repository.
    pub fn into_inserted(self) -> Vec<ObligationRecord> {
        self.inserted.into_inner()
    }
}

impl ComplianceRepository for StoreRepository<'_> {
    fn company_profile(&self, company_id: Uuid) -> Option<CompanyProfile> {
        self.state.companies.get(&company_id).map(|c| c.profile())
    }

    fn active_requirements(&self) -> Vec<LegalRequirement> {
        self.state.requirements.filter(|r| r.active)
    }

    fn obligation_codes(&self, company_id: Uuid) -> HashSet<String> {
        self.state
            .obligations
            .filter(|o| o.company_id == company_id)
            .into_iter()
            .map(|o| o.code)
            .collect()
    }

    fn insert_obligations(
        &self,
        company_id: Uuid,
        batch: Vec<NewObligation>,
    ) -> Result<usize, RepositoryError> {
        let now = self.now;
        let inserted = self.state.obligations.with_write(|map| {
            let mut taken: HashSet<String> = map
                .values()
                .filter(|o| o.company_id == company_id)
                .map(|o| o.code.clone())
                .collect();
            let mut inserted = Vec::with_capacity(batch.len());
            for new in batch {
                if !taken.insert(new.code.clone()) {
                    continue;
                }
                let record = ObligationRecord::from_new(new, now);
                map.insert(record.id, record.clone());
                inserted.push(record);
            }
            inserted
        });

        let count = inserted.len();
        self.inserted.lock().extend(inserted);
        Ok(count)
    }
}

/// Run the matcher for one company and persist what it created.
///
/// Ownership must be checked by the caller.
pub async fn generate_obligations(
    state: &AppState,
    company_id: Uuid,
) -> Result<GenerationOutcome, AppError> {
    let now = Utc::now();
    let repo = StoreRepository::new(state, now);
    let outcome = generate_for_company_at(&repo, company_id, now)?;
    let inserted = repo.into_inserted();

    if let (Some(pool), false) = (&state.db_pool, inserted.is_empty()) {
        if let Err(e) = crate::db::obligations::insert_batch(pool, &inserted).await {
            let ids: HashSet<Uuid> = inserted.iter().map(|o| o.id).collect();
            let removed = state.obligations.remove_where(|o| ids.contains(&o.id));
            tracing::warn!(%company_id, removed, "generated obligations rolled back");
            return Err(AppError::database("persist generated obligations", e));
        }
    }

    Ok(outcome)
}

/// Move every open obligation past its deadline to `overdue`.
///
/// Returns the number of obligations changed.
pub async fn sweep_overdue(state: &AppState, now: DateTime<Utc>) -> Result<usize, AppError> {
    let updated = state.obligations.update_where(
        |o| o.is_past_due(now),
        |o| {
            o.set_status(ObligationStatus::Overdue, now);
            o.updated_at = now;
        },
    );

    if let Some(pool) = &state.db_pool {
        crate::db::obligations::mark_overdue(pool, now)
            .await
            .map_err(|e| AppError::database("overdue sweep", e))?;
    }

    tracing::info!(updated = updated.len(), "overdue sweep finished");
    Ok(updated.len())
}
