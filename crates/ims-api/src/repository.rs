//! # Lifecycle Repository
//!
//! Storage for products and their audit trail behind one type with two
//! backends. The engine never sees which one is in use.
//!
//! The in-memory backend guards products and the audit log with a single
//! `RwLock`, so the product update and the audit append of a commit are
//! observed together. The PostgreSQL backend gets the same guarantee from
//! a transaction (see [`crate::db::lifecycle::commit`]).

use std::collections::HashMap;
use std::sync::Arc;

use ims_core::{ProductId, Sku};
use ims_state::{
    in_state_fifo, AuditEvent, AuditLog, DraftCreation, LifecycleError, LifecycleState, Product,
    StateCounts, TransitionPlan,
};
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;

use crate::db;
use crate::db::lifecycle::{CommitOutcome, InsertOutcome};
use crate::error::AppError;

/// Repository failures: a lifecycle outcome the caller can act on, or a
/// storage fault.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("product {product_id} or its SKU already exists")]
    Duplicate { product_id: ProductId },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Lifecycle(e) => e.into(),
            e @ StoreError::Duplicate { .. } => AppError::Conflict(e.to_string()),
            StoreError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    products: HashMap<ProductId, Product>,
    skus: HashMap<Sku, ProductId>,
    audit: AuditLog,
}

/// Products and audit log under one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

/// Storage backend for the lifecycle engine.
#[derive(Debug, Clone)]
pub enum LifecycleRepository {
    InMemory(Arc<MemoryStore>),
    Postgres(PgPool),
}

impl Default for LifecycleRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LifecycleRepository {
    /// A fresh, empty in-memory repository.
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(MemoryStore::default()))
    }

    /// Backend name for logs and readiness output.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Store a new draft with its events.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the id or SKU is already taken; nothing
    /// is written in that case.
    pub async fn insert_draft(&self, creation: &DraftCreation) -> Result<(), StoreError> {
        let product = &creation.product;
        let outcome = match self {
            Self::InMemory(store) => {
                let mut inner = store.inner.write();
                if inner.products.contains_key(&product.id) || inner.skus.contains_key(&product.sku)
                {
                    InsertOutcome::Duplicate
                } else {
                    for event in &creation.events {
                        inner.audit.append(event.clone());
                    }
                    inner.skus.insert(product.sku.clone(), product.id);
                    inner.products.insert(product.id, product.clone());
                    InsertOutcome::Inserted
                }
            }
            Self::Postgres(pool) => db::lifecycle::insert_draft(pool, creation).await?,
        };

        match outcome {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Duplicate => Err(StoreError::Duplicate {
                product_id: product.id,
            }),
        }
    }

    /// Load one product.
    pub async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let found = match self {
            Self::InMemory(store) => store.inner.read().products.get(&id).cloned(),
            Self::Postgres(pool) => db::lifecycle::get_by_id(pool, id).await?,
        };
        found.ok_or(StoreError::Lifecycle(LifecycleError::NotFound { product_id: id }))
    }

    /// Products in `state`, oldest first, ties by id.
    pub async fn list_in_state(&self, state: LifecycleState) -> Result<Vec<Product>, StoreError> {
        match self {
            Self::InMemory(store) => Ok(in_state_fifo(store.inner.read().products.values(), state)),
            Self::Postgres(pool) => Ok(db::lifecycle::list_in_state(pool, state).await?),
        }
    }

    /// Product counts over all six states.
    pub async fn counts(&self) -> Result<StateCounts, StoreError> {
        match self {
            Self::InMemory(store) => Ok(StateCounts::tally(
                store
                    .inner
                    .read()
                    .products
                    .values()
                    .map(|p| p.lifecycle_state),
            )),
            Self::Postgres(pool) => Ok(db::lifecycle::count_by_state(pool).await?),
        }
    }

    /// Commit a planned transition if the product is still at the version
    /// the plan was built against.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Conflict`] when another commit got there first,
    /// [`LifecycleError::NotFound`] when the product is gone.
    pub async fn commit(&self, plan: &TransitionPlan) -> Result<(), StoreError> {
        let outcome = match self {
            Self::InMemory(store) => {
                let mut inner = store.inner.write();
                match inner.products.get(&plan.product_id) {
                    None => CommitOutcome::Missing,
                    Some(current) if current.version != plan.expected_version => {
                        CommitOutcome::Stale
                    }
                    Some(_) => {
                        inner.audit.append(plan.event.clone());
                        inner.products.insert(plan.product_id, plan.next.clone());
                        CommitOutcome::Applied
                    }
                }
            }
            Self::Postgres(pool) => db::lifecycle::commit(pool, plan).await?,
        };

        match outcome {
            CommitOutcome::Applied => Ok(()),
            CommitOutcome::Stale => Err(LifecycleError::Conflict {
                product_id: plan.product_id,
                expected_version: plan.expected_version,
            }
            .into()),
            CommitOutcome::Missing => Err(LifecycleError::NotFound {
                product_id: plan.product_id,
            }
            .into()),
        }
    }

    /// Audit events of one product, ascending. Transitions only unless
    /// `include_creation` is set.
    pub async fn history(
        &self,
        id: ProductId,
        include_creation: bool,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        match self {
            Self::InMemory(store) => {
                let inner = store.inner.read();
                if !inner.products.contains_key(&id) {
                    return Err(LifecycleError::NotFound { product_id: id }.into());
                }
                Ok(if include_creation {
                    inner.audit.audit_trail_for(&id)
                } else {
                    inner.audit.history_for(&id)
                })
            }
            Self::Postgres(pool) => {
                if db::lifecycle::get_by_id(pool, id).await?.is_none() {
                    return Err(LifecycleError::NotFound { product_id: id }.into());
                }
                Ok(db::lifecycle::events_for(pool, id, include_creation).await?)
            }
        }
    }

    /// Whether the backend can serve requests.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::InMemory(_) => Ok(()),
            Self::Postgres(pool) => Ok(db::lifecycle::ping(pool).await?),
        }
    }
}
