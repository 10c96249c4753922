//! # Legal Requirement Catalog
//!
//! The catalog is the process-wide list of legal requirements a company may
//! be subject to. Each requirement narrows its audience by activity-code
//! prefix and by state; an empty list on either axis means "all".
//!
//! A built-in catalog ships with the crate (`catalog/default.yaml`) and can
//! be replaced at startup by an operator-supplied file of the same shape:
//!
//! ```yaml
//! requirements:
//!   - code: CETESB-LICENCA
//!     title: Licença de Operação CETESB
//!     category: environmental
//!     agency: CETESB
//!     activity_prefixes: ["2011"]
//!     states: ["SP"]
//!     risk_level: high
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regula_core::activity::PREFIX_LEN;
use regula_core::{RiskTier, StateCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::parser::load_yaml_typed;

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.yaml");

/// Longest accepted requirement code.
pub const MAX_CODE_LEN: usize = 64;

/// Longest first-deadline offset a requirement may carry (about 100 years).
pub const MAX_DEADLINE_DAYS: u32 = 36_500;

fn default_active() -> bool {
    true
}

/// A requirement as written in a catalog file, before it is assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDefinition {
    /// Stable unique code, e.g. `LICENCA-AMBIENTAL-IBAMA`.
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub agency: String,
    /// Four-digit activity prefixes this applies to; empty means all.
    #[serde(default)]
    pub activity_prefixes: Vec<String>,
    /// States this applies to; empty means all.
    #[serde(default)]
    pub states: Vec<StateCode>,
    pub risk_level: RiskTier,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Days from generation to the first deadline.
    #[serde(default)]
    pub deadline_days: Option<u32>,
}

impl RequirementDefinition {
    /// Check field-level rules: code shape, non-empty title, prefix shape.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidRequirement {
            code: self.code.clone(),
            reason,
        };

        validate_code(&self.code).map_err(invalid)?;
        if self.title.trim().is_empty() {
            return Err(invalid("title must not be empty".into()));
        }
        if self.category.trim().is_empty() {
            return Err(invalid("category must not be empty".into()));
        }
        if self.agency.trim().is_empty() {
            return Err(invalid("agency must not be empty".into()));
        }
        for prefix in &self.activity_prefixes {
            validate_prefix(prefix).map_err(invalid)?;
        }
        validate_deadline_days(self.deadline_days).map_err(invalid)?;
        Ok(())
    }

    /// Assign a fresh id.
    pub fn into_requirement(self) -> LegalRequirement {
        LegalRequirement {
            id: Uuid::new_v4(),
            code: self.code,
            title: self.title,
            description: self.description,
            category: self.category,
            agency: self.agency,
            activity_prefixes: self.activity_prefixes,
            states: self.states,
            risk_level: self.risk_level,
            active: self.active,
            deadline_days: self.deadline_days,
        }
    }
}

/// Requirement codes are upper-case ASCII letters, digits, `-` and `_`.
pub fn validate_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("code must not be empty".into());
    }
    if code.len() > MAX_CODE_LEN {
        return Err(format!("code must not exceed {MAX_CODE_LEN} characters"));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("code may only contain A-Z, 0-9, '-' and '_'".into());
    }
    Ok(())
}

/// Deadline offsets must fall within [`MAX_DEADLINE_DAYS`].
pub fn validate_deadline_days(days: Option<u32>) -> Result<(), String> {
    match days {
        Some(days) if days > MAX_DEADLINE_DAYS => Err(format!(
            "deadline_days must not exceed {MAX_DEADLINE_DAYS}"
        )),
        _ => Ok(()),
    }
}

/// Activity prefixes are exactly four ASCII digits.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.len() == PREFIX_LEN && prefix.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(format!(
            "activity prefix {prefix:?} must be exactly {PREFIX_LEN} digits"
        ))
    }
}

/// A catalog entry with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalRequirement {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub agency: String,
    pub activity_prefixes: Vec<String>,
    pub states: Vec<StateCode>,
    pub risk_level: RiskTier,
    pub active: bool,
    pub deadline_days: Option<u32>,
}

/// An ordered, validated set of requirement definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCatalog {
    pub requirements: Vec<RequirementDefinition>,
}

impl RequirementCatalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_yaml::from_str(BUILTIN_CATALOG).map_err(|e| CatalogError::YamlParse {
                path: PathBuf::from("catalog/default.yaml"),
                source: e,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a catalog file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, CatalogError> {
        let catalog: Self = load_yaml_typed(path)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate every entry and reject duplicate codes.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for def in &self.requirements {
            def.validate()?;
            if !seen.insert(def.code.as_str()) {
                return Err(CatalogError::DuplicateCode {
                    code: def.code.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Materialize every entry with a fresh id.
    pub fn into_requirements(self) -> Vec<LegalRequirement> {
        self.requirements
            .into_iter()
            .map(RequirementDefinition::into_requirement)
            .collect()
    }
}
