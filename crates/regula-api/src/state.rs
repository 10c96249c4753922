//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! The in-memory stores are authoritative for reads. Every mutation is
//! written through to Postgres when a pool is configured, and the stores
//! are hydrated from the database once at startup.
//!
//! - **Users**: accounts, password hashes, roles, token versions
//! - **Companies**: registrations owned by a user, with computed risk tier
//! - **Obligations**: per-company legal obligations
//! - **Requirements**: the process-wide legal requirement catalog

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regula_compliance::{
    CompanyProfile, LegalRequirement, NewObligation, ObligationStatus, Priority, RiskClassifier,
};
use regula_core::{ActivityCode, Cnpj, RiskTier, StateCode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{JwtKeys, Role};
use crate::config::AppConfig;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert unless an existing record conflicts with `value`.
    ///
    /// The check and the insert run under one write lock, so two racing
    /// inserts of conflicting records cannot both succeed. On conflict the
    /// existing record is returned.
    pub fn insert_unless(
        &self,
        id: Uuid,
        value: T,
        conflicts: impl Fn(&T, &T) -> bool,
    ) -> Result<(), T> {
        let mut guard = self.data.write();
        if let Some(existing) = guard.values().find(|existing| conflicts(existing, &value)) {
            return Err(existing.clone());
        }
        guard.insert(id, value);
        Ok(())
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// All records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// First record matching a predicate.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Apply `f` to every record matching `pred`, returning the updated records.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, f: impl Fn(&mut T)) -> Vec<T> {
        let mut guard = self.data.write();
        guard
            .values_mut()
            .filter(|v| pred(v))
            .map(|v| {
                f(v);
                v.clone()
            })
            .collect()
    }

    /// Run `f` with exclusive access to the whole map.
    ///
    /// For compound operations (uniqueness checks across records, batch
    /// inserts) that must not interleave with other writers.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut HashMap<Uuid, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching a predicate. Returns how many were removed.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, v| !pred(v));
        before - guard.len()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Record Types -------------------------------------------------------------

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: Uuid,
    /// Lower-cased, unique.
    pub email: String,
    pub name: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    /// Bumped on logout; tokens carrying an older version are rejected.
    #[serde(skip)]
    pub token_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registered company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyRecord {
    pub id: Uuid,
    /// 14-digit CNPJ, unique across all companies.
    #[schema(value_type = String, example = "11222333000181")]
    pub cnpj: Cnpj,
    pub legal_name: String,
    pub trade_name: Option<String>,
    /// Two-letter UF code.
    #[schema(value_type = String, example = "AM")]
    pub state: StateCode,
    pub city: String,
    #[schema(value_type = String, example = "0510-0/00")]
    pub primary_activity: ActivityCode,
    #[schema(value_type = Vec<String>)]
    pub secondary_activities: Vec<ActivityCode>,
    /// Computed from the primary activity and state on every write.
    #[schema(value_type = String, example = "critical")]
    pub risk_level: RiskTier,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyRecord {
    /// The attributes the obligation matcher needs.
    pub fn profile(&self) -> CompanyProfile {
        CompanyProfile {
            id: self.id,
            state: self.state.clone(),
            primary_activity: self.primary_activity.clone(),
            secondary_activities: self.secondary_activities.clone(),
        }
    }
}

/// Legal obligation of one company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObligationRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Unique per company.
    pub code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub agency: String,
    #[schema(value_type = String, example = "pending")]
    pub status: ObligationStatus,
    #[schema(value_type = String, example = "high")]
    pub risk_level: RiskTier,
    #[schema(value_type = String, example = "high")]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ObligationRecord {
    /// Materialize a matcher-synthesized obligation as `pending`.
    pub fn from_new(new: NewObligation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            code: new.code,
            title: new.title,
            description: new.description,
            category: new.category,
            agency: new.agency,
            status: ObligationStatus::Pending,
            risk_level: new.risk_level,
            priority: new.priority,
            deadline: new.deadline,
            notes: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Change status, keeping `completed_at` consistent with it.
    pub fn set_status(&mut self, status: ObligationStatus, now: DateTime<Utc>) {
        if status == ObligationStatus::Completed {
            if self.status != ObligationStatus::Completed {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.status = status;
    }

    /// Open and past its deadline.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.deadline.is_some_and(|d| d < now)
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<UserRecord>,
    pub companies: Store<CompanyRecord>,
    pub obligations: Store<ObligationRecord>,
    pub requirements: Store<LegalRequirement>,

    /// Activity/state risk classifier over the configured tables.
    pub classifier: RiskClassifier,

    /// Token signing and verification keys.
    pub jwt: JwtKeys,

    /// PostgreSQL connection pool for persistent storage.
    /// When `None`, the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Build state from configuration, the risk classifier, and the initial
    /// requirement catalog.
    pub fn new(
        config: AppConfig,
        classifier: RiskClassifier,
        requirements: Vec<LegalRequirement>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config);
        let store = Store::new();
        for requirement in requirements {
            store.insert(requirement.id, requirement);
        }
        Self {
            users: Store::new(),
            companies: Store::new(),
            obligations: Store::new(),
            requirements: store,
            classifier,
            jwt,
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Requirements
    /// replace the configured catalog only for codes already in the database.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = crate::db::users::load_all(pool).await?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let companies = crate::db::companies::load_all(pool).await?;
        let company_count = companies.len();
        for record in companies {
            self.companies.insert(record.id, record);
        }

        let obligations = crate::db::obligations::load_all(pool).await?;
        let obligation_count = obligations.len();
        for record in obligations {
            self.obligations.insert(record.id, record);
        }

        let requirements = crate::db::requirements::load_all(pool).await?;
        let requirement_count = requirements.len();
        for record in requirements {
            // A persisted row wins over the configured entry with the same code.
            self.requirements.remove_where(|r| r.code == record.code);
            self.requirements.insert(record.id, record);
        }

        tracing::info!(
            users = user_count,
            companies = company_count,
            obligations = obligation_count,
            requirements = requirement_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}
