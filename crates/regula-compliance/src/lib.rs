//! # regula-compliance: Compliance Engine
//!
//! Turns a company's registration data into a risk tier and a set of legal
//! obligations:
//!
//! - [`RiskClassifier`]: activity-prefix and state lookup over injected
//!   [`RiskTables`], with one-level escalation in heightened jurisdictions.
//! - [`RequirementCatalog`]: the built-in or operator-supplied list of
//!   legal requirements.
//! - [`generate_for_company`]: the matcher, which filters active
//!   requirements by applicability and records missing obligations through
//!   a [`ComplianceRepository`].
//!
//! ## Architecture
//!
//! ```text
//! regula-core (primitives) --> regula-compliance (rules) --> regula-api (storage, HTTP)
//!   Cnpj, ActivityCode           RiskClassifier                 impl ComplianceRepository
//!   StateCode, RiskTier          RequirementCatalog, matcher
//! ```

pub mod catalog;
pub mod classifier;
pub mod error;
pub mod matcher;
pub mod obligation;
pub mod parser;

pub use catalog::{LegalRequirement, RequirementCatalog, RequirementDefinition};
pub use classifier::{Classification, RiskClassifier, RiskTables};
pub use error::{CatalogError, MatchError, RepositoryError};
pub use matcher::{
    applicable_requirements, generate_for_company, generate_for_company_at, is_applicable,
    CompanyProfile, ComplianceRepository, GenerationOutcome,
};
pub use obligation::{NewObligation, ObligationStatus, Priority};
