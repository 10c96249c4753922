//! # Obligation Matcher
//!
//! Matches a company against the active requirement catalog and records a
//! `pending` obligation for every applicable requirement the company does
//! not already have.
//!
//! ## Applicability
//!
//! A requirement applies when both hold:
//!
//! - its activity prefix list is empty, or one of its prefixes equals the
//!   four-digit prefix of the company's primary or any secondary activity;
//! - its state list is empty, or it contains the company's state.
//!
//! ## Idempotency
//!
//! Codes already on file are skipped, and the repository's batch insert
//! must itself skip codes that appear between the read and the write. A
//! second run without catalog changes therefore reports `generated: 0`.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use regula_core::{ActivityCode, StateCode};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::LegalRequirement;
use crate::error::{MatchError, RepositoryError};
use crate::obligation::{NewObligation, Priority};

/// The company attributes applicability depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyProfile {
    pub id: Uuid,
    pub state: StateCode,
    pub primary_activity: ActivityCode,
    pub secondary_activities: Vec<ActivityCode>,
}

impl CompanyProfile {
    /// Primary and secondary activities together.
    pub fn activities(&self) -> impl Iterator<Item = &ActivityCode> {
        std::iter::once(&self.primary_activity).chain(&self.secondary_activities)
    }
}

/// Storage the matcher reads from and writes to.
///
/// Implementations are synchronous; the API's in-memory stores satisfy it
/// directly and persist to the database afterwards.
pub trait ComplianceRepository: Send + Sync {
    /// Look up a company.
    fn company_profile(&self, company_id: Uuid) -> Option<CompanyProfile>;

    /// All requirements with `active == true`.
    fn active_requirements(&self) -> Vec<LegalRequirement>;

    /// Codes of every obligation already recorded for the company.
    fn obligation_codes(&self, company_id: Uuid) -> HashSet<String>;

    /// Insert a batch atomically, skipping codes the company already has.
    ///
    /// Returns the number of obligations actually inserted.
    fn insert_obligations(
        &self,
        company_id: Uuid,
        batch: Vec<NewObligation>,
    ) -> Result<usize, RepositoryError>;
}

/// Result of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// Obligations created by this run.
    pub generated: usize,
    /// Obligations on file for the company afterwards.
    pub total: usize,
}

/// Whether `requirement` applies to `company`.
pub fn is_applicable(requirement: &LegalRequirement, company: &CompanyProfile) -> bool {
    let activity_match = requirement.activity_prefixes.is_empty()
        || company.activities().any(|code| {
            requirement
                .activity_prefixes
                .iter()
                .any(|prefix| code.matches_prefix(prefix))
        });
    let state_match =
        requirement.states.is_empty() || requirement.states.contains(&company.state);
    activity_match && state_match
}

/// Filter `requirements` down to those applicable to `company`.
pub fn applicable_requirements<'a>(
    requirements: &'a [LegalRequirement],
    company: &CompanyProfile,
) -> Vec<&'a LegalRequirement> {
    requirements
        .iter()
        .filter(|r| r.active && is_applicable(r, company))
        .collect()
}

/// Build the obligation a requirement produces for a company.
pub fn synthesize(
    requirement: &LegalRequirement,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> NewObligation {
    NewObligation {
        company_id,
        code: requirement.code.clone(),
        title: requirement.title.clone(),
        description: requirement.description.clone(),
        category: requirement.category.clone(),
        agency: requirement.agency.clone(),
        risk_level: requirement.risk_level,
        priority: Priority::for_risk(requirement.risk_level),
        // Out-of-range offsets from rows stored before validation yield no deadline.
        deadline: requirement
            .deadline_days
            .and_then(|days| now.checked_add_signed(Duration::days(i64::from(days)))),
    }
}

/// Generate missing obligations for a company.
///
/// Ownership must be checked by the caller.
pub fn generate_for_company<R: ComplianceRepository + ?Sized>(
    repo: &R,
    company_id: Uuid,
) -> Result<GenerationOutcome, MatchError> {
    generate_for_company_at(repo, company_id, Utc::now())
}

/// [`generate_for_company`] with an explicit clock.
pub fn generate_for_company_at<R: ComplianceRepository + ?Sized>(
    repo: &R,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<GenerationOutcome, MatchError> {
    let company = repo
        .company_profile(company_id)
        .ok_or(MatchError::CompanyNotFound(company_id))?;

    let requirements = repo.active_requirements();
    let existing = repo.obligation_codes(company_id);

    let batch: Vec<NewObligation> = applicable_requirements(&requirements, &company)
        .into_iter()
        .filter(|r| !existing.contains(&r.code))
        .map(|r| synthesize(r, company_id, now))
        .collect();

    let generated = if batch.is_empty() {
        0
    } else {
        repo.insert_obligations(company_id, batch)?
    };

    tracing::info!(
        company_id = %company_id,
        requirements = requirements.len(),
        existing = existing.len(),
        generated,
        "generated obligations"
    );

    Ok(GenerationOutcome {
        generated,
        total: existing.len() + generated,
    })
}
