//! # Startup Bootstrap
//!
//! Builds [`AppState`] from configuration.
//!
//! ## Sequence
//!
//! 1. **Risk tables**: built-in, or `RISK_TABLES_PATH` when set.
//! 2. **Requirement catalog**: built-in, or `REQUIREMENT_CATALOG_PATH`.
//! 3. **Database**: connect and migrate when `DATABASE_URL` is set.
//! 4. **Hydrate**: load persisted users, companies, obligations and
//!    requirements into the in-memory stores.
//! 5. **Seed catalog**: insert configured requirements whose code is not
//!    yet in the database.
//! 6. **Admin account**: create the bootstrap admin if configured and absent.

use regula_compliance::{CatalogError, RequirementCatalog, RiskClassifier, RiskTables};

use crate::auth::Role;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::password::validate_password_strength;
use crate::state::AppState;

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Risk tables or requirement catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Connecting, migrating or hydrating failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The bootstrap admin could not be created.
    #[error("bootstrap admin: {0}")]
    Admin(String),
}

/// Load the risk classifier from configuration.
pub fn load_classifier(config: &AppConfig) -> Result<RiskClassifier, BootstrapError> {
    let tables = match &config.risk_tables_path {
        Some(path) => {
            let tables = RiskTables::from_yaml_file(path)?;
            tracing::info!(path = %path.display(), "loaded risk tables");
            tables
        }
        None => RiskTables::default(),
    };
    Ok(RiskClassifier::new(tables))
}

/// Load the requirement catalog from configuration.
pub fn load_catalog(config: &AppConfig) -> Result<RequirementCatalog, BootstrapError> {
    let catalog = match &config.requirement_catalog_path {
        Some(path) => RequirementCatalog::from_yaml_file(path)?,
        None => RequirementCatalog::builtin()?,
    };
    tracing::info!(requirements = catalog.len(), "loaded requirement catalog");
    Ok(catalog)
}

/// Build application state without a database.
pub fn in_memory(config: AppConfig) -> Result<AppState, BootstrapError> {
    let classifier = load_classifier(&config)?;
    let catalog = load_catalog(&config)?;
    Ok(AppState::new(
        config,
        classifier,
        catalog.into_requirements(),
        None,
    ))
}

/// Run the full startup sequence.
pub async fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    if config.jwt_secret_ephemeral {
        tracing::warn!(
            "JWT_SECRET not set, using an ephemeral signing key. \
             Tokens will not survive restarts."
        );
    }

    let classifier = load_classifier(&config)?;
    let catalog = load_catalog(&config)?;
    let db_pool = crate::db::init_pool(config.database_url.as_deref()).await?;

    let state = AppState::new(config, classifier, catalog.into_requirements(), db_pool);
    state.hydrate_from_db().await?;
    seed_requirements(&state).await?;
    ensure_admin(&state).await?;

    tracing::info!(
        requirements = state.requirements.len(),
        persistent = state.db_pool.is_some(),
        "bootstrap complete"
    );
    Ok(state)
}

/// Write configured requirements missing from the database.
async fn seed_requirements(state: &AppState) -> Result<(), BootstrapError> {
    let pool = match &state.db_pool {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let mut seeded = 0;
    for requirement in state.requirements.list() {
        if crate::db::requirements::insert_if_absent(pool, &requirement).await? {
            seeded += 1;
        }
    }
    tracing::info!(seeded, "requirement catalog seeded");
    Ok(())
}

/// Create the configured admin account unless the email already exists.
async fn ensure_admin(state: &AppState) -> Result<(), BootstrapError> {
    let admin = match &state.config.bootstrap_admin {
        Some(admin) => admin.clone(),
        None => return Ok(()),
    };

    let email = admin.email.trim().to_lowercase();
    if state.users.find(|u| u.email == email).is_some() {
        tracing::debug!("bootstrap admin already exists");
        return Ok(());
    }

    validate_password_strength(&admin.password).map_err(BootstrapError::Admin)?;
    match crate::routes::auth::create_user(state, &email, &admin.password, "Administrator", Role::Admin)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "bootstrap admin created");
            Ok(())
        }
        Err(AppError::Conflict(_)) => Ok(()),
        Err(e) => Err(BootstrapError::Admin(e.to_string())),
    }
}
