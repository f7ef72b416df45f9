#![deny(missing_docs)]

//! # ims-core: Foundational Types for the Inventory Lifecycle Service
//!
//! This crate defines the domain primitives every other crate in the
//! workspace depends on. It has no internal crate dependencies - only
//! `serde`, `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`CategoryId`] where a [`ProductId`]
//!    is expected, or a raw string where an [`ActorId`] is expected.
//!
//! 2. **Validate at construction.** String-backed primitives ([`ActorId`],
//!    [`Sku`], [`UnitPrice`]) reject malformed input in `new()` and in
//!    `Deserialize`, so an invalid value never reaches the lifecycle engine.
//!
//! 3. **Amounts are never floats.** [`UnitPrice`] is a decimal string with
//!    at most four fractional digits.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::UnitPrice;
pub use error::ValidationError;
pub use identity::{ActorId, AuditEventId, CategoryId, ProductId, Sku};
pub use temporal::Timestamp;
