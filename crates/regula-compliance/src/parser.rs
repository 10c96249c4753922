//! Shared YAML loading for risk tables and requirement catalogs.
//!
//! Both override files are operator-supplied, so every error carries the
//! path that failed.

use std::path::Path;

use crate::error::CatalogError;

/// Load a YAML file into a strongly-typed value.
pub fn load_yaml_typed<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CatalogError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CatalogError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    serde_yaml::from_str(&content).map_err(|e| CatalogError::YamlParse {
        path: path.to_path_buf(),
        source: e,
    })
}
