//! # Audit Log
//!
//! Immutable audit events with a SHA-256 hash chain per product, plus an
//! append-only in-memory log used by the in-memory repository and tests.
//!
//! Every event hashes its predecessor's hash together with its own
//! content:
//!
//! ```text
//! event_hash = SHA-256(previous_hash | id | entity_id | sequence | action
//!                      | old_state | new_state | changed_by | changed_at | notes)
//! ```
//!
//! Absent fields hash as the empty string. The first event of a product
//! chains to [`GENESIS_HASH`].

use std::collections::{HashMap, HashSet};

use ims_core::{ActorId, AuditEventId, ProductId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::lifecycle::{LifecycleAction, LifecycleState};
use crate::product::Product;

/// Previous-hash value of the first event in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One immutable lifecycle audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier. Appends are idempotent on it.
    pub id: AuditEventId,
    /// The product this event belongs to.
    pub entity_id: ProductId,
    /// Position in the product's chain; 0 for the creation event.
    pub sequence: u64,
    /// The action applied; `None` for the creation event.
    pub action: Option<LifecycleAction>,
    /// State before the change; `None` for the creation event.
    pub old_state: Option<LifecycleState>,
    /// State after the change.
    pub new_state: LifecycleState,
    /// The authenticated actor who made the change.
    pub changed_by: ActorId,
    /// When the change was applied.
    pub changed_at: Timestamp,
    /// Free-text notes supplied with the change.
    pub notes: Option<String>,
    /// `event_hash` of the preceding event, or [`GENESIS_HASH`].
    pub previous_hash: String,
    /// Hash of this event chained to `previous_hash`.
    pub event_hash: String,
}

impl AuditEvent {
    /// Build the creation event for a new product.
    pub fn creation(
        entity_id: ProductId,
        state: LifecycleState,
        changed_by: ActorId,
        changed_at: Timestamp,
    ) -> Self {
        Self::link(entity_id, None, None, None, state, changed_by, changed_at, None)
    }

    /// Build the transition event that follows `previous` in its chain.
    ///
    /// The timestamp is clamped so that it never precedes `previous`.
    pub fn following(
        previous: &AuditEvent,
        action: LifecycleAction,
        new_state: LifecycleState,
        changed_by: ActorId,
        now: Timestamp,
        notes: Option<String>,
    ) -> Self {
        let tip = ChainTip {
            sequence: previous.sequence,
            changed_at: previous.changed_at,
            hash: &previous.event_hash,
        };
        Self::link(
            previous.entity_id,
            Some(tip),
            Some(action),
            Some(previous.new_state),
            new_state,
            changed_by,
            now,
            notes,
        )
    }

    /// Build the transition event that follows the last event applied to
    /// `product`, read from its `version`, `updated_at` and `audit_head`.
    pub fn following_product(
        product: &Product,
        action: LifecycleAction,
        new_state: LifecycleState,
        changed_by: ActorId,
        now: Timestamp,
        notes: Option<String>,
    ) -> Self {
        let tip = ChainTip {
            sequence: product.version,
            changed_at: product.updated_at,
            hash: &product.audit_head,
        };
        Self::link(
            product.id,
            Some(tip),
            Some(action),
            Some(product.lifecycle_state),
            new_state,
            changed_by,
            now,
            notes,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn link(
        entity_id: ProductId,
        previous: Option<ChainTip<'_>>,
        action: Option<LifecycleAction>,
        old_state: Option<LifecycleState>,
        new_state: LifecycleState,
        changed_by: ActorId,
        now: Timestamp,
        notes: Option<String>,
    ) -> Self {
        let (sequence, changed_at, previous_hash) = match previous {
            Some(tip) => (
                tip.sequence + 1,
                now.not_before(tip.changed_at),
                tip.hash.to_string(),
            ),
            None => (0, now, GENESIS_HASH.to_string()),
        };
        let mut event = Self {
            id: AuditEventId::new(),
            entity_id,
            sequence,
            action,
            old_state,
            new_state,
            changed_by,
            changed_at,
            notes,
            previous_hash,
            event_hash: String::new(),
        };
        event.event_hash = event.compute_hash();
        event
    }

    /// Recompute this event's hash from its content and `previous_hash`.
    pub fn compute_hash(&self) -> String {
        let id = self.id.to_string();
        let entity_id = self.entity_id.to_string();
        let sequence = self.sequence.to_string();
        let changed_at = self.changed_at.to_canonical_string();
        let parts: [&str; 10] = [
            &self.previous_hash,
            &id,
            &entity_id,
            &sequence,
            self.action.map(|a| a.as_str()).unwrap_or(""),
            self.old_state.map(|s| s.as_str()).unwrap_or(""),
            self.new_state.as_str(),
            self.changed_by.as_str(),
            &changed_at,
            self.notes.as_deref().unwrap_or(""),
        ];
        sha256_hex(&parts.join("|"))
    }

    /// Whether this is the creation event of its product.
    pub fn is_creation(&self) -> bool {
        self.old_state.is_none()
    }

    fn order_key(&self) -> (Timestamp, u64) {
        (self.changed_at, self.sequence)
    }
}

/// The last link of a chain, as far as the next event needs to know it.
struct ChainTip<'a> {
    sequence: u64,
    changed_at: Timestamp,
    hash: &'a str,
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ─── Chain verification ──────────────────────────────────────────────

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    /// Number of events inspected.
    pub total_events: usize,
    /// Events whose `previous_hash` or `event_hash` does not check out.
    pub broken_links: usize,
    /// The first offending event, if any.
    pub first_broken: Option<AuditEventId>,
    /// `broken_links == 0`.
    pub chain_valid: bool,
}

/// Verify one product's chain, given its events in ascending order.
///
/// Checks that the first event chains to [`GENESIS_HASH`], that every other
/// event chains to its predecessor, and that every stored hash matches the
/// recomputed one.
pub fn verify_chain(events: &[AuditEvent]) -> ChainVerification {
    let mut broken_links = 0;
    let mut first_broken = None;
    let mut expected_prev = GENESIS_HASH;

    for event in events {
        let linked = event.previous_hash == expected_prev;
        let intact = event.event_hash == event.compute_hash();
        if !(linked && intact) {
            broken_links += 1;
            first_broken.get_or_insert(event.id);
        }
        expected_prev = &event.event_hash;
    }

    ChainVerification {
        total_events: events.len(),
        broken_links,
        first_broken,
        chain_valid: broken_links == 0,
    }
}

// ─── In-memory log ───────────────────────────────────────────────────

/// Append-only audit storage, indexed by product.
///
/// Events are never mutated or removed. Per product they are kept sorted by
/// `(changed_at, sequence)`.
#[derive(Debug, Default)]
pub struct AuditLog {
    by_entity: HashMap<ProductId, Vec<AuditEvent>>,
    ids: HashSet<AuditEventId>,
}

impl AuditLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event`. Returns `false` without changes if its id is already present.
    pub fn append(&mut self, event: AuditEvent) -> bool {
        if !self.ids.insert(event.id) {
            return false;
        }
        let events = self.by_entity.entry(event.entity_id).or_default();
        let key = event.order_key();
        let at = events.partition_point(|e| e.order_key() <= key);
        events.insert(at, event);
        true
    }

    /// Transition events of `entity`, ascending. Excludes the creation event.
    pub fn history_for(&self, entity: &ProductId) -> Vec<AuditEvent> {
        self.events(entity)
            .iter()
            .filter(|e| !e.is_creation())
            .cloned()
            .collect()
    }

    /// Every event of `entity`, creation first.
    pub fn audit_trail_for(&self, entity: &ProductId) -> Vec<AuditEvent> {
        self.events(entity).to_vec()
    }

    /// The most recent event of `entity`.
    pub fn last_for(&self, entity: &ProductId) -> Option<&AuditEvent> {
        self.events(entity).last()
    }

    /// Total number of events across all products.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn events(&self, entity: &ProductId) -> &[AuditEvent] {
        self.by_entity.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }
}
