//! # Aggregate Stats
//!
//! Read-only views derived from current product states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;
use crate::product::Product;

/// Number of products in each lifecycle state. Every state is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCounts(BTreeMap<LifecycleState, u64>);

impl Default for StateCounts {
    fn default() -> Self {
        Self(LifecycleState::ALL.into_iter().map(|s| (s, 0)).collect())
    }
}

impl StateCounts {
    /// Count the states of `states`.
    pub fn tally<I: IntoIterator<Item = LifecycleState>>(states: I) -> Self {
        let mut counts = Self::default();
        for s in states {
            counts.add(s, 1);
        }
        counts
    }

    /// Add `n` to the count for `state`.
    pub fn add(&mut self, state: LifecycleState, n: u64) {
        *self.0.entry(state).or_insert(0) += n;
    }

    /// Count for `state`.
    pub fn get(&self, state: LifecycleState) -> u64 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    /// Sum over all states.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate `(state, count)` in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (LifecycleState, u64)> + '_ {
        self.0.iter().map(|(s, n)| (*s, *n))
    }
}

/// Products in `state`, oldest first. Ties on `created_at` break by id.
pub fn in_state_fifo<'a, I>(products: I, state: LifecycleState) -> Vec<Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut matching: Vec<Product> = products
        .into_iter()
        .filter(|p| p.lifecycle_state == state)
        .cloned()
        .collect();
    matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    matching
}
