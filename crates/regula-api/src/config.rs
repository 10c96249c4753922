//! Server configuration.
//!
//! Loaded once at startup from environment variables. Missing optional
//! values fall back to development defaults; malformed values are errors,
//! never panics.

use std::path::PathBuf;

use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const MIN_SECRET_LEN: usize = 32;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Credentials for an administrator account created at startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the JWT secret and the database URL, which may
/// embed a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HMAC key for signing access and refresh tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// Whether `jwt_secret` was generated at startup.
    pub jwt_secret_ephemeral: bool,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Postgres connection string. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// Overrides the built-in risk tables.
    pub risk_tables_path: Option<PathBuf>,
    /// Overrides the built-in requirement catalog.
    pub requirement_catalog_path: Option<PathBuf>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_secret_ephemeral", &self.jwt_secret_ephemeral)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("risk_tables_path", &self.risk_tables_path)
            .field("requirement_catalog_path", &self.requirement_catalog_path)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `JWT_SECRET` (at least 32 bytes; absent → ephemeral random secret)
    /// - `ACCESS_TOKEN_TTL_SECS` (default: 900)
    /// - `REFRESH_TOKEN_TTL_SECS` (default: 604800)
    /// - `DATABASE_URL` (absent → in-memory only)
    /// - `RISK_TABLES_PATH`, `REQUIREMENT_CATALOG_PATH` (optional YAML overrides)
    /// - `BOOTSTRAP_ADMIN_EMAIL` + `BOOTSTRAP_ADMIN_PASSWORD` (optional, both or neither)
    /// - `LOG_FORMAT` (`json` or `pretty`, default `pretty`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;
        let access_token_ttl_secs =
            parse_positive("ACCESS_TOKEN_TTL_SECS", get("ACCESS_TOKEN_TTL_SECS"), DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_token_ttl_secs = parse_positive(
            "REFRESH_TOKEN_TTL_SECS",
            get("REFRESH_TOKEN_TTL_SECS"),
            DEFAULT_REFRESH_TTL_SECS,
        )?;

        let (jwt_secret, jwt_secret_ephemeral) = match get("JWT_SECRET") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::WeakSecret {
                    min: MIN_SECRET_LEN,
                    actual: secret.len(),
                });
            }
            Some(secret) => (Zeroizing::new(secret.into_bytes()), false),
            None => (generate_secret(), true),
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password: Zeroizing::new(password),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteBootstrapAdmin),
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT".into(),
                    value: other.into(),
                })
            }
        };

        Ok(Self {
            port,
            jwt_secret,
            jwt_secret_ephemeral,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            database_url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            risk_tables_path: get("RISK_TABLES_PATH").map(PathBuf::from),
            requirement_catalog_path: get("REQUIREMENT_CATALOG_PATH").map(PathBuf::from),
            bootstrap_admin,
            log_format,
        })
    }

    /// In-memory configuration with a fixed secret, for tests.
    pub fn for_testing(secret: &str) -> Self {
        Self {
            port: DEFAULT_PORT,
            jwt_secret: Zeroizing::new(secret.as_bytes().to_vec()),
            jwt_secret_ephemeral: false,
            access_token_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            database_url: None,
            risk_tables_path: None,
            requirement_catalog_path: None,
            bootstrap_admin: None,
            log_format: LogFormat::Pretty,
        }
    }
}

fn generate_secret() -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; 64]);
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn parse_or<T: std::str::FromStr>(var: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value,
        }),
    }
}

fn parse_positive(var: &str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let value = parse_or(var, raw, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
    #[error("JWT_SECRET must be at least {min} bytes (got {actual})")]
    WeakSecret { min: usize, actual: usize },
    #[error("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together")]
    IncompleteBootstrapAdmin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.jwt_secret_ephemeral);
        assert_eq!(cfg.jwt_secret.len(), 64);
        assert_eq!(cfg.access_token_ttl_secs, 900);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("DATABASE_URL", "postgres://regula:pw@localhost/regula"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert!(!cfg.jwt_secret_ephemeral);
        assert_eq!(cfg.access_token_ttl_secs, 60);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_short_secret() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::WeakSecret { actual: 5, .. }));
    }

    #[test]
    fn rejects_bad_port_and_ttl() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("REFRESH_TOKEN_TTL_SECS", "0")])).is_err());
    }

    #[test]
    fn bootstrap_admin_needs_both_vars() {
        let err = AppConfig::from_lookup(lookup(&[("BOOTSTRAP_ADMIN_EMAIL", "a@b.com")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteBootstrapAdmin));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "super-secret-value-that-is-long-enough"),
            ("DATABASE_URL", "postgres://user:hunter2@db/regula"),
        ]))
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
