//! # Obligations
//!
//! A legal obligation is a per-company instance of a catalog requirement
//! (or a manually recorded one). This module defines its status and
//! priority vocabularies and the [`NewObligation`] value the matcher hands
//! to storage.

use chrono::{DateTime, Utc};
use regula_core::RiskTier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Obligation lifecycle status.
///
/// The usual path is `pending → in_progress → completed`. The overdue
/// sweep moves open obligations past their deadline to `overdue`, and any
/// obligation may be set to `not_applicable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
    NotApplicable,
}

impl ObligationStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ObligationStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Overdue,
        Self::NotApplicable,
    ];

    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::NotApplicable => "not_applicable",
        }
    }

    /// Whether work on the obligation is still outstanding.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObligationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown obligation status: {s:?}"))
    }
}

/// Work priority of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// All priorities in ascending order.
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Default priority for an obligation of the given risk.
    ///
    /// `critical` → `urgent`, `high` → `high`, anything else → `medium`.
    pub fn for_risk(risk: RiskTier) -> Self {
        match risk {
            RiskTier::Critical => Self::Urgent,
            RiskTier::High => Self::High,
            RiskTier::Medium | RiskTier::Low => Self::Medium,
        }
    }

    /// Return the string representation of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown priority: {s:?}"))
    }
}

/// An obligation synthesized from a requirement, ready to be stored.
///
/// Storage assigns the id and timestamps; status always starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewObligation {
    pub company_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub agency: String,
    pub risk_level: RiskTier,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_risk() {
        assert_eq!(Priority::for_risk(RiskTier::Critical), Priority::Urgent);
        assert_eq!(Priority::for_risk(RiskTier::High), Priority::High);
        assert_eq!(Priority::for_risk(RiskTier::Medium), Priority::Medium);
        assert_eq!(Priority::for_risk(RiskTier::Low), Priority::Medium);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in ObligationStatus::ALL {
            assert_eq!(status.as_str().parse::<ObligationStatus>().unwrap(), status);
        }
        assert!("done".parse::<ObligationStatus>().is_err());
    }

    #[test]
    fn open_statuses() {
        assert!(ObligationStatus::Pending.is_open());
        assert!(ObligationStatus::InProgress.is_open());
        assert!(!ObligationStatus::Completed.is_open());
        assert!(!ObligationStatus::Overdue.is_open());
        assert!(!ObligationStatus::NotApplicable.is_open());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ObligationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
