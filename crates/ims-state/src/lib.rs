//! # ims-state: Product Lifecycle State Machine
//!
//! The pure, synchronous model of the product lifecycle. Nothing in this
//! crate performs I/O; the API crate owns storage and drives these types.
//!
//! ## Lifecycle
//!
//! ```text
//!            submit-for-approval          approve            activate
//!   DRAFT ───────────────────────▶ PENDING ─────────▶ APPROVED ─────────▶ ACTIVE
//!     ▲                             APPROVAL                              │  ▲
//!     └──────────── reject ────────────┘                    discontinue   │  │ activate
//!                                                                         ▼  │
//!                                                ARCHIVED ◀── archive ── DISCONTINUED
//! ```
//!
//! `draft` is the unique initial state; `archived` is terminal.
//!
//! ## Modules
//!
//! - **Registry** (`lifecycle.rs`): the closed state and action enums and the
//!   static transition graph.
//! - **Authorization** (`authorization.rs`): roles, role sets, and the gate
//!   mapping `(role, state)` to permitted actions.
//! - **Product** (`product.rs`): the lifecycle entity and draft creation.
//! - **Audit** (`audit.rs`): immutable audit events, the per-entity hash
//!   chain, and an append-only in-memory log.
//! - **Transition** (`transition.rs`): validation of one state change into a
//!   [`TransitionPlan`] that a store commits with compare-and-swap.
//! - **Stats** (`stats.rs`): counts by state and the FIFO review queue.

pub mod audit;
pub mod authorization;
pub mod error;
pub mod lifecycle;
pub mod product;
pub mod stats;
pub mod transition;

pub use audit::{verify_chain, AuditEvent, AuditLog, ChainVerification, GENESIS_HASH};
pub use authorization::{authorize, permitted_actions, roles_from_groups, Principal, Role, RoleSet};
pub use error::LifecycleError;
pub use lifecycle::{all_edges, edges_from, resolve, Edge, LifecycleAction, LifecycleState};
pub use product::{DraftCreation, NewProduct, Product};
pub use stats::{in_state_fifo, StateCounts};
pub use transition::{normalize_notes, plan_transition, TransitionPlan, NOTES_MAX};
