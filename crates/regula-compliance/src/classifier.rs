//! # Risk Classifier
//!
//! Derives a company's [`RiskTier`] from its primary activity code and the
//! state it is registered in.
//!
//! ## Algorithm
//!
//! 1. Take the four-digit class prefix of the activity code.
//! 2. High-risk prefix → `high`; medium-risk prefix → `medium`; else `low`.
//! 3. If the state is a heightened jurisdiction, escalate one level
//!    (`low` never escalates, `critical` saturates).
//!
//! The lookup tables are an injected [`RiskTables`] value. The classifier
//! holds them behind an `Arc` and never mutates them, so one instance is
//! shared by every request.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use regula_core::activity::PREFIX_LEN;
use regula_core::{ActivityCode, RiskTier, StateCode};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::parser::load_yaml_typed;

/// Class prefixes for extractive, heavy-chemical, slaughter, and fuel
/// activities that need federal environmental licensing.
const DEFAULT_HIGH_RISK_PREFIXES: &[&str] = &[
    "0510", "0600", "0710", "0724", "0729", "1011", "1012", "1013", "1610", "1921", "2011",
    "2012", "2019", "2051", "2092", "2110", "2121", "2441", "3511", "3821", "3822", "4681",
    "4731",
];

/// Class prefixes for activities with routine sanitary, construction, or
/// transport licensing.
const DEFAULT_MEDIUM_RISK_PREFIXES: &[&str] = &[
    "0111", "0151", "0210", "1051", "1091", "2221", "2330", "2511", "2930", "3811", "4120",
    "4211", "4771", "4930", "5510", "5611", "8610", "8630",
];

/// Legal Amazon states.
const DEFAULT_HEIGHTENED_STATES: &[&str] = &["AC", "AM", "AP", "MA", "MT", "PA", "RO", "RR", "TO"];

/// Lookup tables driving [`RiskClassifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTables {
    /// Four-digit prefixes classified `high` before escalation.
    pub high_risk_prefixes: BTreeSet<String>,
    /// Four-digit prefixes classified `medium` before escalation.
    pub medium_risk_prefixes: BTreeSet<String>,
    /// States whose non-low tiers escalate one level.
    pub heightened_states: BTreeSet<StateCode>,
}

impl Default for RiskTables {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            high_risk_prefixes: owned(DEFAULT_HIGH_RISK_PREFIXES),
            medium_risk_prefixes: owned(DEFAULT_MEDIUM_RISK_PREFIXES),
            heightened_states: DEFAULT_HEIGHTENED_STATES
                .iter()
                .filter_map(|s| StateCode::new(*s).ok())
                .collect(),
        }
    }
}

impl RiskTables {
    /// Load tables from a YAML file and validate them.
    pub fn from_yaml_file(path: &Path) -> Result<Self, CatalogError> {
        let tables: Self = load_yaml_typed(path)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Check that every prefix is four digits and no prefix is in both sets.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for prefix in self.high_risk_prefixes.iter().chain(&self.medium_risk_prefixes) {
            if prefix.len() != PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_digit()) {
                return Err(CatalogError::InvalidTable(format!(
                    "prefix {prefix:?} must be exactly {PREFIX_LEN} digits"
                )));
            }
        }
        if let Some(both) = self
            .high_risk_prefixes
            .intersection(&self.medium_risk_prefixes)
            .next()
        {
            return Err(CatalogError::InvalidTable(format!(
                "prefix {both:?} is listed as both high and medium risk"
            )));
        }
        Ok(())
    }
}

/// Full breakdown of a classification, for diagnostics and the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// The four-digit class prefix looked up.
    pub prefix: String,
    /// Tier from the prefix tables alone.
    pub base_tier: RiskTier,
    /// Whether the state is a heightened jurisdiction.
    pub heightened_jurisdiction: bool,
    /// Final tier after escalation.
    pub tier: RiskTier,
}

/// Deterministic activity/state risk classifier.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    tables: Arc<RiskTables>,
}

impl RiskClassifier {
    /// Build a classifier over the given tables.
    pub fn new(tables: RiskTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// The tables in use.
    pub fn tables(&self) -> &RiskTables {
        &self.tables
    }

    /// Classify a primary activity code registered in `state`.
    pub fn classify(&self, activity: &ActivityCode, state: &StateCode) -> RiskTier {
        self.explain(activity, state).tier
    }

    /// Classify and report how the tier was reached.
    pub fn explain(&self, activity: &ActivityCode, state: &StateCode) -> Classification {
        let prefix = activity.prefix();
        let base_tier = if self.tables.high_risk_prefixes.contains(prefix) {
            RiskTier::High
        } else if self.tables.medium_risk_prefixes.contains(prefix) {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };
        let heightened = self.tables.heightened_states.contains(state);
        let tier = if heightened {
            base_tier.escalate()
        } else {
            base_tier
        };
        Classification {
            prefix: prefix.to_string(),
            base_tier,
            heightened_jurisdiction: heightened,
            tier,
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(RiskTables::default())
    }
}
