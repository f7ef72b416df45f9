//! # Validation Errors
//!
//! Structured errors for domain primitive construction, built with
//! `thiserror`. Each variant carries the rejected input so operators can
//! diagnose bad requests without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Actor identifier is empty, too long, or contains a reserved character.
    #[error("invalid actor id: \"{0}\" (expected 1-128 characters, no ':' or whitespace)")]
    InvalidActorId(String),

    /// SKU does not match the `PRD-` + 32 hex digits format.
    #[error("invalid SKU: \"{0}\" (expected PRD- followed by 32 uppercase hex characters)")]
    InvalidSku(String),

    /// Category identifier is zero or negative.
    #[error("invalid category id: {0} (expected a positive integer)")]
    InvalidCategoryId(i64),

    /// Unit price is not a positive decimal with at most 4 fractional digits.
    #[error("invalid unit price: \"{0}\" (expected a positive decimal such as \"12.50\")")]
    InvalidUnitPrice(String),

    /// A free-text field is empty or exceeds its length bound.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_error_display_includes_input() {
        let err = ValidationError::InvalidActorId("a:b".to_string());
        assert!(err.to_string().contains("a:b"));
    }

    #[test]
    fn unit_price_error_display_includes_input() {
        let err = ValidationError::InvalidUnitPrice("-1".to_string());
        let msg = err.to_string();
        assert!(msg.contains("-1"));
        assert!(msg.contains("positive decimal"));
    }

    #[test]
    fn field_error_display_names_field() {
        let err = ValidationError::InvalidField {
            field: "name",
            reason: "must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid name: must not be empty");
    }

    #[test]
    fn category_error_display() {
        assert!(ValidationError::InvalidCategoryId(0)
            .to_string()
            .contains("positive"));
    }
}
