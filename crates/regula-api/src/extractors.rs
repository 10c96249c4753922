//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers that map
//! JSON rejections and rule violations onto [`AppError`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Request types that check business rules beyond what serde enforces.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Reject empty or over-long free-text fields.
pub fn check_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.chars().count() > max {
        return Err(format!("{field} must not exceed {max} characters"));
    }
    Ok(())
}

/// Deserialize a field where absent means "leave unchanged" and `null`
/// means "clear". Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_text_rules() {
        assert!(check_text("name", "Acme", 10).is_ok());
        assert_eq!(
            check_text("name", "  ", 10).unwrap_err(),
            "name must not be empty"
        );
        assert!(check_text("name", "abcdefghijk", 10)
            .unwrap_err()
            .contains("10"));
    }

    #[derive(Debug)]
    struct AlwaysBad;

    impl Validate for AlwaysBad {
        fn validate(&self) -> Result<(), String> {
            Err("bad".into())
        }
    }

    #[test]
    fn validation_failure_maps_to_422() {
        let err = extract_validated_json(Ok(Json(AlwaysBad))).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "bad"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);
        let cleared: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));
        let set: Patch = serde_json::from_str(r#"{"note": "x"}"#).unwrap();
        assert_eq!(set.note, Some(Some("x".into())));
    }
}
