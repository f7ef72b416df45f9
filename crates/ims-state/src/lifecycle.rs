//! # State Registry
//!
//! The canonical lifecycle states, the named actions, and the static
//! directed graph of `(from_state, action, to_state)` edges. This module is
//! the single source of truth for which transitions exist; no other layer
//! replicates the table.
//!
//! ## Design Decision
//!
//! Products are loaded from storage at runtime with a state value, so the
//! typestate pattern (one Rust type per state) does not fit here. A closed
//! enum with exhaustive matching gives the same guarantee that no product
//! ever holds a value outside the six states.

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

// ─── States ──────────────────────────────────────────────────────────

/// The lifecycle state of a product.
///
/// Declaration order is lifecycle order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created, editable, not yet submitted. Unique initial state.
    Draft,
    /// Submitted and waiting for an admin decision.
    PendingApproval,
    /// Approved but not yet sellable.
    Approved,
    /// Live in the catalogue.
    Active,
    /// Withdrawn from sale; may be reactivated or archived.
    Discontinued,
    /// Retired permanently. Terminal.
    Archived,
}

impl LifecycleState {
    /// All states, in lifecycle order.
    pub const ALL: [LifecycleState; 6] = [
        Self::Draft,
        Self::PendingApproval,
        Self::Approved,
        Self::Active,
        Self::Discontinued,
        Self::Archived,
    ];

    /// The canonical wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Discontinued => "discontinued",
            Self::Archived => "archived",
        }
    }

    /// Parse a canonical state name.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] for any name outside the
    /// closed set.
    pub fn from_name(name: &str) -> Result<Self, LifecycleError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| LifecycleError::InvalidState {
                value: name.to_string(),
            })
    }

    /// Whether this state has no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        edges_from(*self).is_empty()
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

// ─── Actions ─────────────────────────────────────────────────────────

/// A named lifecycle action, as it appears in request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleAction {
    /// `draft → pending_approval`.
    SubmitForApproval,
    /// `pending_approval → approved`.
    Approve,
    /// `pending_approval → draft`, with a mandatory reason.
    Reject,
    /// `approved → active` and `discontinued → active` (reactivation).
    Activate,
    /// `active → discontinued`.
    Discontinue,
    /// `discontinued → archived`.
    Archive,
}

impl LifecycleAction {
    /// All actions.
    pub const ALL: [LifecycleAction; 6] = [
        Self::SubmitForApproval,
        Self::Approve,
        Self::Reject,
        Self::Activate,
        Self::Discontinue,
        Self::Archive,
    ];

    /// The canonical wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForApproval => "submit-for-approval",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Activate => "activate",
            Self::Discontinue => "discontinue",
            Self::Archive => "archive",
        }
    }

    /// Parse a canonical action name. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Whether this action must carry explanatory notes.
    pub fn requires_notes(&self) -> bool {
        matches!(self, Self::Reject)
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transition Graph ────────────────────────────────────────────────

/// A directed, named edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source state.
    pub from: LifecycleState,
    /// Action name.
    pub action: LifecycleAction,
    /// Target state.
    pub to: LifecycleState,
}

const fn edge(from: LifecycleState, action: LifecycleAction, to: LifecycleState) -> Edge {
    Edge { from, action, to }
}

use LifecycleAction as A;
use LifecycleState as S;

const FROM_DRAFT: &[Edge] = &[edge(S::Draft, A::SubmitForApproval, S::PendingApproval)];
const FROM_PENDING: &[Edge] = &[
    edge(S::PendingApproval, A::Approve, S::Approved),
    edge(S::PendingApproval, A::Reject, S::Draft),
];
const FROM_APPROVED: &[Edge] = &[edge(S::Approved, A::Activate, S::Active)];
const FROM_ACTIVE: &[Edge] = &[edge(S::Active, A::Discontinue, S::Discontinued)];
const FROM_DISCONTINUED: &[Edge] = &[
    edge(S::Discontinued, A::Activate, S::Active),
    edge(S::Discontinued, A::Archive, S::Archived),
];

/// Outgoing edges of `state`. Empty for `archived`.
pub fn edges_from(state: LifecycleState) -> &'static [Edge] {
    match state {
        S::Draft => FROM_DRAFT,
        S::PendingApproval => FROM_PENDING,
        S::Approved => FROM_APPROVED,
        S::Active => FROM_ACTIVE,
        S::Discontinued => FROM_DISCONTINUED,
        S::Archived => &[],
    }
}

/// Resolve the edge for `action` leaving `state`, if one exists.
pub fn resolve(state: LifecycleState, action: LifecycleAction) -> Option<Edge> {
    edges_from(state).iter().copied().find(|e| e.action == action)
}

/// Every edge of the graph.
pub fn all_edges() -> impl Iterator<Item = Edge> {
    LifecycleState::ALL
        .into_iter()
        .flat_map(|s| edges_from(s).iter().copied())
}

/// Whether some edge labelled `action` leads into `state`.
///
/// Lets callers tell "already there" apart from "no such path" when a
/// requested action has no edge from the current state.
pub fn action_targets(action: LifecycleAction, state: LifecycleState) -> bool {
    all_edges().any(|e| e.action == action && e.to == state)
}
