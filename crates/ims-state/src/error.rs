//! # Lifecycle Errors
//!
//! One error enum for every way a lifecycle operation can fail. Each
//! variant is terminal for the request that produced it; nothing in this
//! crate retries.

use ims_core::{ProductId, ValidationError};
use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Errors raised by registry lookups, authorization, and transition planning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// No product exists with the requested identifier.
    #[error("product {product_id} not found")]
    NotFound {
        /// The requested identifier.
        product_id: ProductId,
    },

    /// A state name outside the closed set was supplied.
    #[error("unknown lifecycle state \"{value}\"")]
    InvalidState {
        /// The rejected input.
        value: String,
    },

    /// The action has no edge from the current state.
    #[error("cannot {action} a product in state {from}")]
    InvalidTransition {
        /// Current state of the product.
        from: LifecycleState,
        /// Requested action name, verbatim.
        action: String,
        /// Set when the action would lead to the state the product already holds.
        already_in_target: bool,
    },

    /// The caller's roles do not permit the action from the current state.
    #[error("roles [{roles}] may not {action} a product in state {state}")]
    Unauthorized {
        /// Requested action name.
        action: String,
        /// Current state of the product.
        state: LifecycleState,
        /// Comma-separated role names held by the caller.
        roles: String,
    },

    /// The product changed between planning and commit.
    #[error("product {product_id} was modified concurrently (expected version {expected_version})")]
    Conflict {
        /// The contested product.
        product_id: ProductId,
        /// The version the losing plan was built against.
        expected_version: u64,
    },

    /// The caller lacks the creation-time privilege.
    #[error("caller is not allowed to create product drafts")]
    CreationForbidden,

    /// A request field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display_names_state_and_action() {
        let err = LifecycleError::InvalidTransition {
            from: LifecycleState::Active,
            action: "approve".into(),
            already_in_target: false,
        };
        assert_eq!(err.to_string(), "cannot approve a product in state active");
    }

    #[test]
    fn validation_error_is_transparent() {
        let inner = ValidationError::InvalidCategoryId(-1);
        let err: LifecycleError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn conflict_display_mentions_version() {
        let err = LifecycleError::Conflict {
            product_id: ProductId::new(),
            expected_version: 3,
        };
        assert!(err.to_string().contains("expected version 3"));
    }
}
