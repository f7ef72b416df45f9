//! Product and audit-event persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `products` and
//! `audit_events` tables. The state machine is enforced at the application
//! layer (via `ims_state::plan_transition`); SQL only guards the version
//! compare-and-swap that makes a commit atomic per product.

use chrono::{DateTime, Utc};
use ims_core::{ActorId, AuditEventId, CategoryId, ProductId, Sku, Timestamp, UnitPrice};
use ims_state::{
    AuditEvent, DraftCreation, LifecycleAction, LifecycleState, Product, StateCounts,
    TransitionPlan,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// What happened to a compare-and-swap commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Product row updated and event appended.
    Applied,
    /// The product's version moved on since the plan was built.
    Stale,
    /// No product with that id.
    Missing,
}

/// What happened to a draft insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Product row and its events written.
    Inserted,
    /// The id or SKU is already taken.
    Duplicate,
}

const PRODUCT_COLUMNS: &str = "id, sku, name, description, category_id, unit_price, size, color, \
     lifecycle_state, version, created_by, created_at, updated_at, audit_head";

const EVENT_COLUMNS: &str = "id, entity_id, sequence, action, old_state, new_state, changed_by, \
     changed_at, notes, previous_hash, event_hash";

fn to_i64(field: &str, value: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(value)
        .map_err(|_| sqlx::Error::Protocol(format!("{field} {value} does not fit in BIGINT")))
}

fn to_u64(field: &str, value: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(value)
        .map_err(|_| sqlx::Error::Protocol(format!("negative {field} {value} in database")))
}

fn decode<T, E: std::fmt::Display>(what: &str, result: Result<T, E>) -> Result<T, sqlx::Error> {
    result.map_err(|e| sqlx::Error::Protocol(format!("invalid {what} in database: {e}")))
}

/// Insert a new product together with its creation (and submit) events.
///
/// A unique violation on `id` or `sku` rolls the transaction back and
/// reports [`InsertOutcome::Duplicate`].
pub async fn insert_draft(
    pool: &PgPool,
    creation: &DraftCreation,
) -> Result<InsertOutcome, sqlx::Error> {
    let product = &creation.product;
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(&format!(
        "INSERT INTO products ({PRODUCT_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
    ))
    .bind(*product.id.as_uuid())
    .bind(product.sku.as_str())
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.category_id.value())
    .bind(product.unit_price.as_str())
    .bind(product.size.as_deref())
    .bind(product.color.as_deref())
    .bind(product.lifecycle_state.as_str())
    .bind(to_i64("version", product.version)?)
    .bind(product.created_by.as_str())
    .bind(product.created_at.into_datetime())
    .bind(product.updated_at.into_datetime())
    .bind(&product.audit_head)
    .execute(&mut *tx)
    .await;

    match inserted {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Ok(InsertOutcome::Duplicate)
        }
        Err(e) => return Err(e),
        Ok(_) => {}
    }

    for event in &creation.events {
        insert_event(&mut tx, event).await?;
    }

    tx.commit().await?;
    Ok(InsertOutcome::Inserted)
}

/// Apply a transition plan: version-guarded product update plus audit
/// append, in one transaction.
///
/// If the guard fails the transaction is dropped, which rolls it back.
pub async fn commit(pool: &PgPool, plan: &TransitionPlan) -> Result<CommitOutcome, sqlx::Error> {
    let next = &plan.next;
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE products
         SET lifecycle_state = $1, version = $2, updated_at = $3, audit_head = $4
         WHERE id = $5 AND version = $6",
    )
    .bind(next.lifecycle_state.as_str())
    .bind(to_i64("version", next.version)?)
    .bind(next.updated_at.into_datetime())
    .bind(&next.audit_head)
    .bind(*plan.product_id.as_uuid())
    .bind(to_i64("version", plan.expected_version)?)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
            .bind(*plan.product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        return Ok(if exists.is_some() {
            CommitOutcome::Stale
        } else {
            CommitOutcome::Missing
        });
    }

    insert_event(&mut tx, &plan.event).await?;
    tx.commit().await?;
    Ok(CommitOutcome::Applied)
}

/// Append one audit event. A duplicate id is a no-op.
async fn insert_event(conn: &mut PgConnection, event: &AuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO audit_events ({EVENT_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (id) DO NOTHING"
    ))
    .bind(*event.id.as_uuid())
    .bind(*event.entity_id.as_uuid())
    .bind(to_i64("sequence", event.sequence)?)
    .bind(event.action.map(|a| a.as_str()))
    .bind(event.old_state.map(|s| s.as_str()))
    .bind(event.new_state.as_str())
    .bind(event.changed_by.as_str())
    .bind(event.changed_at.into_datetime())
    .bind(event.notes.as_deref())
    .bind(&event.previous_hash)
    .bind(&event.event_hash)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a product by ID.
pub async fn get_by_id(pool: &PgPool, id: ProductId) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await?;

    row.map(ProductRow::into_product).transpose()
}

/// Products in `state`, oldest first.
pub async fn list_in_state(
    pool: &PgPool,
    state: LifecycleState,
) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE lifecycle_state = $1 ORDER BY created_at, id"
    ))
    .bind(state.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ProductRow::into_product).collect()
}

/// Product counts per state, zero-filled.
pub async fn count_by_state(pool: &PgPool) -> Result<StateCounts, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT lifecycle_state, COUNT(*) FROM products GROUP BY lifecycle_state",
    )
    .fetch_all(pool)
    .await?;

    let mut counts = StateCounts::default();
    for (state, n) in rows {
        let state = decode("lifecycle_state", LifecycleState::from_name(&state))?;
        counts.add(state, to_u64("count", n)?);
    }
    Ok(counts)
}

/// Audit events of one product, ascending by `(changed_at, sequence)`.
pub async fn events_for(
    pool: &PgPool,
    id: ProductId,
    include_creation: bool,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let filter = if include_creation {
        ""
    } else {
        " AND old_state IS NOT NULL"
    };
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM audit_events
         WHERE entity_id = $1{filter} ORDER BY changed_at, sequence"
    ))
    .bind(*id.as_uuid())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(EventRow::into_event).collect()
}

/// Connectivity probe for readiness checks.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    description: String,
    category_id: i64,
    unit_price: String,
    size: Option<String>,
    color: Option<String>,
    lifecycle_state: String,
    version: i64,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    audit_head: String,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, sqlx::Error> {
        Ok(Product {
            id: ProductId::from_uuid(self.id),
            sku: decode("sku", Sku::new(self.sku))?,
            name: self.name,
            description: self.description,
            category_id: decode("category_id", CategoryId::new(self.category_id))?,
            unit_price: decode("unit_price", UnitPrice::new(self.unit_price))?,
            size: self.size,
            color: self.color,
            lifecycle_state: decode(
                "lifecycle_state",
                LifecycleState::from_name(&self.lifecycle_state),
            )?,
            version: to_u64("version", self.version)?,
            created_by: decode("created_by", ActorId::new(self.created_by))?,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
            audit_head: self.audit_head,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    entity_id: Uuid,
    sequence: i64,
    action: Option<String>,
    old_state: Option<String>,
    new_state: String,
    changed_by: String,
    changed_at: DateTime<Utc>,
    notes: Option<String>,
    previous_hash: String,
    event_hash: String,
}

impl EventRow {
    fn into_event(self) -> Result<AuditEvent, sqlx::Error> {
        let action = match self.action {
            Some(name) => Some(LifecycleAction::from_name(&name).ok_or_else(|| {
                sqlx::Error::Protocol(format!("invalid action in database: {name}"))
            })?),
            None => None,
        };
        let old_state = self
            .old_state
            .as_deref()
            .map(LifecycleState::from_name)
            .transpose();

        Ok(AuditEvent {
            id: AuditEventId::from_uuid(self.id),
            entity_id: ProductId::from_uuid(self.entity_id),
            sequence: to_u64("sequence", self.sequence)?,
            action,
            old_state: decode("old_state", old_state)?,
            new_state: decode("new_state", LifecycleState::from_name(&self.new_state))?,
            changed_by: decode("changed_by", ActorId::new(self.changed_by))?,
            changed_at: Timestamp::from_datetime(self.changed_at),
            notes: self.notes,
            previous_hash: self.previous_hash,
            event_hash: self.event_hash,
        })
    }
}
