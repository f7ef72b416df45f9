//! # Transition Planning
//!
//! Validates one requested state change against the registry and the
//! authorization gate, and produces a [`TransitionPlan`]: the product as it
//! will look after the change, plus the audit event recording it.
//!
//! Planning is pure. A store applies the plan by compare-and-swap on
//! [`TransitionPlan::expected_version`]; if another transition committed in
//! between, the store reports [`LifecycleError::Conflict`] and nothing is
//! written.
//!
//! ## Check order
//!
//! 1. Unknown action name: `InvalidTransition`.
//! 2. Action outside every held role's allowlist: `Unauthorized`.
//! 3. No edge for the action from the current state: `InvalidTransition`
//!    (flagged `already_in_target` when the action would land where the
//!    product already is).
//! 4. Gate check for `(roles, state, action)`: `Unauthorized`.
//! 5. Notes: trimmed, bounded, and required for `reject`.

use ims_core::{ProductId, Timestamp, ValidationError};

use crate::audit::AuditEvent;
use crate::authorization::{authorize, Principal};
use crate::error::LifecycleError;
use crate::lifecycle::{action_targets, resolve, Edge, LifecycleAction};
use crate::product::Product;

/// Maximum length of transition notes, in characters.
pub const NOTES_MAX: usize = 1000;

/// A validated, not yet committed, state change.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    /// The product being transitioned.
    pub product_id: ProductId,
    /// Version the plan was built against; the commit guard.
    pub expected_version: u64,
    /// The edge being traversed.
    pub edge: Edge,
    /// The product after the change.
    pub next: Product,
    /// The audit event recording the change.
    pub event: AuditEvent,
}

/// Trim notes; blank becomes `None`.
///
/// # Errors
///
/// [`ValidationError::InvalidField`] if longer than [`NOTES_MAX`] characters.
pub fn normalize_notes(notes: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(raw) = notes else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > NOTES_MAX {
        return Err(ValidationError::InvalidField {
            field: "notes",
            reason: format!("must be at most {NOTES_MAX} characters"),
        });
    }
    Ok(Some(trimmed.to_string()))
}

/// Plan the transition named `action_name` on `current` for `principal`.
pub fn plan_transition(
    current: &Product,
    action_name: &str,
    principal: &Principal,
    notes: Option<String>,
    now: Timestamp,
) -> Result<TransitionPlan, LifecycleError> {
    let state = current.lifecycle_state;
    let Some(action) = LifecycleAction::from_name(action_name) else {
        return Err(LifecycleError::InvalidTransition {
            from: state,
            action: action_name.to_string(),
            already_in_target: false,
        });
    };

    if !principal.roles.allows_globally(action) {
        return Err(LifecycleError::Unauthorized {
            action: action.as_str().to_string(),
            state,
            roles: principal.roles.names(),
        });
    }

    let edge = resolve(state, action).ok_or_else(|| LifecycleError::InvalidTransition {
        from: state,
        action: action.as_str().to_string(),
        already_in_target: action_targets(action, state),
    })?;

    authorize(&principal.roles, state, action)?;

    let notes = normalize_notes(notes)?;
    if action.requires_notes() && notes.is_none() {
        return Err(ValidationError::InvalidField {
            field: "notes",
            reason: format!("a reason is required to {action}"),
        }
        .into());
    }

    let event = AuditEvent::following_product(
        current,
        action,
        edge.to,
        principal.actor.clone(),
        now,
        notes,
    );
    let next = current.advanced_by(&event);

    Ok(TransitionPlan {
        product_id: current.id,
        expected_version: current.version,
        edge,
        next,
        event,
    })
}
