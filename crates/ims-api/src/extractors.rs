//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Trait for request types that check business rules beyond what serde
/// deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
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

/// Parse an optional JSON body. An empty body yields `T::default()`.
///
/// Used by action endpoints whose body is entirely optional, so that a bare
/// `POST` without a `content-type` header is accepted.
pub fn extract_optional_json<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default + Validate,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Notes {
        notes: Option<String>,
    }

    impl Validate for Notes {
        fn validate(&self) -> Result<(), String> {
            match &self.notes {
                Some(n) if n == "bad" => Err("notes must not be bad".into()),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn empty_body_is_default() {
        let v: Notes = extract_optional_json(&Bytes::from_static(b"  ")).unwrap();
        assert!(v.notes.is_none());
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = extract_optional_json::<Notes>(&Bytes::from_static(b"{")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn validation_runs_on_present_body() {
        let err = extract_optional_json::<Notes>(&Bytes::from_static(br#"{"notes":"bad"}"#))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
