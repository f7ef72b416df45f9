//! # Product
//!
//! The lifecycle entity. Domain attributes (name, price, category) are
//! carried but play no part in the state machine; `lifecycle_state` is
//! only ever changed by applying an [`AuditEvent`] produced by transition
//! planning or draft creation.

use ims_core::{ActorId, CategoryId, ProductId, Sku, Timestamp, UnitPrice, ValidationError};
use serde::{Deserialize, Serialize};

use crate::audit::AuditEvent;
use crate::authorization::Principal;
use crate::error::LifecycleError;
use crate::lifecycle::{LifecycleAction, LifecycleState};

/// A product under lifecycle management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque identifier.
    pub id: ProductId,
    /// Stock keeping unit derived from the id.
    pub sku: Sku,
    /// Display name.
    pub name: String,
    /// Free-text description; may be empty.
    pub description: String,
    /// Catalogue category.
    pub category_id: CategoryId,
    /// Unit price as a decimal string.
    pub unit_price: UnitPrice,
    /// Optional size label.
    pub size: Option<String>,
    /// Optional color label.
    pub color: Option<String>,
    /// Current lifecycle state.
    pub lifecycle_state: LifecycleState,
    /// Bumped by every transition; the compare-and-swap guard for commits.
    pub version: u64,
    /// Actor who created the draft.
    pub created_by: ActorId,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the most recent audit event.
    pub updated_at: Timestamp,
    /// `event_hash` of the most recent audit event.
    pub audit_head: String,
}

impl Product {
    /// The product as it stands after `event` is applied.
    pub fn advanced_by(&self, event: &AuditEvent) -> Product {
        Product {
            lifecycle_state: event.new_state,
            version: event.sequence,
            updated_at: event.changed_at,
            audit_head: event.event_hash.clone(),
            ..self.clone()
        }
    }
}

/// Validated fields for a new draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    /// Display name, 1 to 200 characters.
    pub name: String,
    /// Description, at most 2000 characters.
    pub description: String,
    /// Catalogue category.
    pub category_id: CategoryId,
    /// Unit price.
    pub unit_price: UnitPrice,
    /// Optional size label, at most 50 characters.
    pub size: Option<String>,
    /// Optional color label, at most 50 characters.
    pub color: Option<String>,
}

/// A freshly created product and the audit events that go with it.
///
/// `events` holds the creation event and, when the draft was submitted at
/// creation, the submit event after it.
#[derive(Debug, Clone)]
pub struct DraftCreation {
    /// The stored product.
    pub product: Product,
    /// Events to append together with the insert.
    pub events: Vec<AuditEvent>,
}

const NAME_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;
const LABEL_MAX: usize = 50;

fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::InvalidField {
            field,
            reason: format!("must be at most {max} characters"),
        });
    }
    Ok(())
}

fn label(field: &'static str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            bounded(field, v, LABEL_MAX)?;
            Ok(Some(v.to_string()))
        }
    }
}

impl NewProduct {
    /// Trim and bound-check the free-text fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category_id: CategoryId,
        unit_price: UnitPrice,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "name",
                reason: "must not be empty".into(),
            });
        }
        bounded("name", &name, NAME_MAX)?;
        let description = description.into().trim().to_string();
        bounded("description", &description, DESCRIPTION_MAX)?;

        Ok(Self {
            name,
            description,
            category_id,
            unit_price,
            size: label("size", size)?,
            color: label("color", color)?,
        })
    }

    /// Create the draft on behalf of `creator`.
    ///
    /// With `submit` set, the draft is also moved to `pending_approval` in
    /// the same unit of work. Submission at creation rides on the creation
    /// privilege and does not consult the authorization gate.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::CreationForbidden`] if no role of `creator` may
    /// create drafts.
    pub fn into_draft(
        self,
        creator: &Principal,
        submit: bool,
        now: Timestamp,
    ) -> Result<DraftCreation, LifecycleError> {
        if !creator.roles.can_create_drafts() {
            return Err(LifecycleError::CreationForbidden);
        }

        let id = ProductId::new();
        let created = AuditEvent::creation(id, LifecycleState::Draft, creator.actor.clone(), now);
        let product = Product {
            id,
            sku: Sku::for_product(&id),
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            unit_price: self.unit_price,
            size: self.size,
            color: self.color,
            lifecycle_state: LifecycleState::Draft,
            version: 0,
            created_by: creator.actor.clone(),
            created_at: created.changed_at,
            updated_at: created.changed_at,
            audit_head: created.event_hash.clone(),
        };

        if !submit {
            return Ok(DraftCreation {
                product,
                events: vec![created],
            });
        }

        let submitted = AuditEvent::following(
            &created,
            LifecycleAction::SubmitForApproval,
            LifecycleState::PendingApproval,
            creator.actor.clone(),
            now,
            None,
        );
        Ok(DraftCreation {
            product: product.advanced_by(&submitted),
            events: vec![created, submitted],
        })
    }
}
