//! # API Route Modules
//!
//! - `lifecycle` - product drafts, lifecycle transitions, the approval
//!   queue, per-state listings, stats, and audit history.

pub mod lifecycle;
