//! # Transition Engine
//!
//! The only write path for lifecycle state. Each call is one unit of work:
//! load the product, plan the change with `ims_state::plan_transition`,
//! then commit it through the repository's version compare-and-swap. A
//! lost race surfaces as `STATE_CONFLICT`; nothing here retries.
//!
//! Every outcome is logged and counted in
//! `ims_lifecycle_transitions_total{action, outcome}`.

use ims_core::{ProductId, Timestamp};
use ims_state::{
    plan_transition, AuditEvent, LifecycleAction, LifecycleError, NewProduct, Principal, Product,
};

use crate::error::AppError;
use crate::repository::StoreError;
use crate::state::AppState;

/// Outcome label for a failed engine call.
fn outcome_of(err: &StoreError) -> &'static str {
    match err {
        StoreError::Lifecycle(e) => match e {
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::InvalidState { .. } => "invalid_state",
            LifecycleError::InvalidTransition {
                already_in_target: true,
                ..
            } => "already_in_state",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::Unauthorized { .. } => "action_not_permitted",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::CreationForbidden => "forbidden",
            LifecycleError::Validation(_) => "invalid_request",
        },
        StoreError::Duplicate { .. } => "conflict",
        StoreError::Database(_) => "error",
    }
}

/// Metric label for a requested action. Unknown names collapse to one label.
fn action_label(action: &str) -> &'static str {
    LifecycleAction::from_name(action)
        .map(|a| a.as_str())
        .unwrap_or("unknown")
}

/// Create a draft on behalf of `principal`, optionally submitting it for
/// approval in the same unit of work.
pub async fn create_draft(
    state: &AppState,
    principal: &Principal,
    new: NewProduct,
    submit: bool,
) -> Result<Product, AppError> {
    let result: Result<Product, StoreError> = async {
        let creation = new.into_draft(principal, submit, Timestamp::now())?;
        state.repo.insert_draft(&creation).await?;
        Ok(creation.product)
    }
    .await;

    match result {
        Ok(product) => {
            state.metrics.record_transition("create", "applied");
            if submit {
                state
                    .metrics
                    .record_transition(LifecycleAction::SubmitForApproval.as_str(), "applied");
            }
            tracing::info!(
                product_id = %product.id,
                sku = %product.sku,
                actor = %principal.actor,
                state = %product.lifecycle_state,
                "draft created"
            );
            Ok(product)
        }
        Err(err) => {
            let outcome = outcome_of(&err);
            state.metrics.record_transition("create", outcome);
            tracing::warn!(actor = %principal.actor, outcome, error = %err, "draft creation rejected");
            Err(err.into())
        }
    }
}

/// Apply the action named `action` to product `id` and return the new audit event.
pub async fn transition(
    state: &AppState,
    id: ProductId,
    action: &str,
    principal: &Principal,
    notes: Option<String>,
) -> Result<AuditEvent, AppError> {
    let current = state.repo.get(id).await;
    transition_from(state, id, current, action, principal, notes).await
}

/// Plan against the loaded snapshot and commit it. The commit fails with a
/// conflict if the product moved on after `current` was read.
async fn transition_from(
    state: &AppState,
    id: ProductId,
    current: Result<Product, StoreError>,
    action: &str,
    principal: &Principal,
    notes: Option<String>,
) -> Result<AuditEvent, AppError> {
    let result: Result<AuditEvent, StoreError> = async {
        let current = current?;
        let plan = plan_transition(&current, action, principal, notes, Timestamp::now())?;
        state.repo.commit(&plan).await?;
        Ok(plan.event)
    }
    .await;

    let label = action_label(action);
    match result {
        Ok(event) => {
            state.metrics.record_transition(label, "applied");
            tracing::info!(
                product_id = %id,
                action = label,
                actor = %principal.actor,
                from = ?event.old_state,
                to = %event.new_state,
                sequence = event.sequence,
                "lifecycle transition applied"
            );
            Ok(event)
        }
        Err(err) => {
            let outcome = outcome_of(&err);
            state.metrics.record_transition(label, outcome);
            if matches!(err, StoreError::Database(_)) {
                tracing::error!(product_id = %id, action = label, error = %err, "lifecycle transition failed");
            } else {
                tracing::warn!(
                    product_id = %id,
                    action = label,
                    actor = %principal.actor,
                    outcome,
                    error = %err,
                    "lifecycle transition rejected"
                );
            }
            Err(err.into())
        }
    }
}
