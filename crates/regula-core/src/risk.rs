//! # Risk Tiers
//!
//! Four ordered severity levels. The derived `Ord` follows declaration
//! order, so `Low < Medium < High < Critical` and "at least high" is a
//! single comparison.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Regulatory risk tier of a company or a legal requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// No heightened obligations.
    Low,
    /// Routine licensing and inspection.
    Medium,
    /// Sector-specific licensing or environmental controls.
    High,
    /// High-risk activity in a heightened jurisdiction.
    Critical,
}

impl RiskTier {
    /// All tiers in ascending order.
    pub const ALL: [RiskTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Raise by one level for a heightened jurisdiction.
    ///
    /// `Low` never escalates and `Critical` saturates.
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Low,
            Self::Medium => Self::High,
            Self::High => Self::Critical,
            Self::Critical => Self::Critical,
        }
    }

    /// Return the string representation of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ValidationError::UnknownRiskTier(s.to_string())),
        }
    }
}
