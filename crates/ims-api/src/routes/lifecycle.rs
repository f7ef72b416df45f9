//! # Product Lifecycle API
//!
//! Draft creation, transitions, the approval queue, per-state listings,
//! stats, and audit history. Every write goes through [`crate::engine`].
//!
//! Reads take a snapshot and never block on writers for longer than one
//! repository call.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use ims_core::{ActorId, CategoryId, ProductId, UnitPrice};
use ims_state::{
    verify_chain, AuditEvent, LifecycleAction, LifecycleState, NewProduct, Product, StateCounts,
    NOTES_MAX,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::engine;
use crate::error::AppError;
use crate::extractors::{extract_optional_json, extract_validated_json, Validate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// An actor id claimed in a request body. Clients send either a number or
/// a string; it is compared with the authenticated caller by its text form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ActorRef {
    Number(i64),
    Text(String),
}

impl ActorRef {
    fn matches(&self, actor: &ActorId) -> bool {
        match self {
            Self::Number(n) => actor.as_str() == n.to_string(),
            Self::Text(s) => actor.as_str() == s,
        }
    }
}

impl std::fmt::Display for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Reject a body that names someone other than the caller as the actor.
fn check_claimed_actor(claimed: Option<&ActorRef>, caller: &CallerIdentity) -> Result<(), AppError> {
    match claimed {
        Some(claimed) if !claimed.matches(caller.actor()) => Err(AppError::BadRequest(format!(
            "body names actor {claimed} but the request is authenticated as {}",
            caller.actor()
        ))),
        _ => Ok(()),
    }
}

/// Request to create a draft product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    /// Display name, 1 to 200 characters.
    pub name: String,
    /// Positive catalogue category id.
    #[schema(value_type = i64)]
    pub category_id: CategoryId,
    /// Positive decimal string (or integer), at most 4 fractional digits.
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: UnitPrice,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Must equal the authenticated actor when present.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub created_by: Option<ActorRef>,
    /// Submit the draft for approval as part of creation.
    #[serde(default)]
    pub submit_for_approval: bool,
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if let Some(ActorRef::Text(s)) = &self.created_by {
            if s.trim().is_empty() {
                return Err("created_by must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Body of a transition request. Entirely optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Must equal the authenticated actor when present.
    #[serde(default, rename = "userId", alias = "user_id")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<ActorRef>,
    /// Free-text notes; the reason when rejecting.
    #[serde(default, alias = "reason")]
    pub notes: Option<String>,
}

impl Validate for TransitionRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.notes {
            Some(n) if n.chars().count() > NOTES_MAX => {
                Err(format!("notes must be at most {NOTES_MAX} characters"))
            }
            _ => Ok(()),
        }
    }
}

/// Query parameters for history.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HistoryParams {
    /// Include the creation event ahead of the transitions.
    #[serde(default)]
    pub include_creation: bool,
}

/// A product as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub unit_price: String,
    pub size: Option<String>,
    pub color: Option<String>,
    /// One of `draft`, `pending_approval`, `approved`, `active`,
    /// `discontinued`, `archived`.
    pub lifecycle_state: String,
    pub version: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: *p.id.as_uuid(),
            sku: p.sku.to_string(),
            name: p.name,
            description: p.description,
            category_id: p.category_id.value(),
            unit_price: p.unit_price.to_string(),
            size: p.size,
            color: p.color,
            lifecycle_state: p.lifecycle_state.as_str().to_string(),
            version: p.version,
            created_by: p.created_by.to_string(),
            created_at: p.created_at.into_datetime(),
            updated_at: p.updated_at.into_datetime(),
        }
    }
}

/// One audit event as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEventResponse {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub sequence: u64,
    /// `null` for the creation event.
    pub action: Option<String>,
    /// `null` for the creation event.
    pub old_state: Option<String>,
    pub new_state: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub previous_hash: String,
    pub event_hash: String,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(e: AuditEvent) -> Self {
        Self {
            id: *e.id.as_uuid(),
            entity_id: *e.entity_id.as_uuid(),
            sequence: e.sequence,
            action: e.action.map(|a| a.as_str().to_string()),
            old_state: e.old_state.map(|s| s.as_str().to_string()),
            new_state: e.new_state.as_str().to_string(),
            changed_by: e.changed_by.to_string(),
            changed_at: e.changed_at.into_datetime(),
            notes: e.notes,
            previous_hash: e.previous_hash,
            event_hash: e.event_hash,
        }
    }
}

/// `{ "data": [...] }` envelope for product lists.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub data: Vec<ProductResponse>,
}

/// `{ "data": [...] }` envelope for audit history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub data: Vec<AuditEventResponse>,
}

/// `{ "data": { state: count } }` covering all six states.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    #[schema(value_type = Object)]
    pub data: StateCounts,
}

/// What the caller may do to one product right now.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermittedActionsResponse {
    pub product_id: Uuid,
    pub lifecycle_state: String,
    pub roles: Vec<String>,
    pub permitted_actions: Vec<String>,
}

/// Result of re-verifying one product's audit hash chain.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChainVerificationResponse {
    pub product_id: Uuid,
    pub total_events: usize,
    pub broken_links: usize,
    pub first_broken: Option<Uuid>,
    pub chain_valid: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    raw.parse::<ProductId>()
        .map_err(|_| AppError::BadRequest(format!("invalid product id: \"{raw}\"")))
}

fn product_list(products: Vec<Product>) -> Json<ProductListResponse> {
    Json(ProductListResponse {
        data: products.into_iter().map(ProductResponse::from).collect(),
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the lifecycle router.
///
/// `:id` is the only parameter name at the third and fourth segments
/// because the router requires one name per position; on
/// `/v1/products/lifecycle/:id` it carries a state name.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/products/lifecycle", post(create_product))
        .route(
            "/v1/products/lifecycle/pending-approvals",
            get(list_pending_approvals),
        )
        .route("/v1/products/pending-approvals", get(list_pending_approvals))
        .route("/v1/products/lifecycle/:id", get(list_by_state))
        .route("/v1/products/lifecycle/:id/approve", post(approve_product))
        .route("/v1/products/lifecycle/:id/reject", post(reject_product))
        .route("/v1/products/lifecycle-stats", get(lifecycle_stats))
        .route("/v1/products/:id", get(get_product))
        .route("/v1/products/:id/permitted-actions", get(permitted_actions))
        .route("/v1/products/:id/lifecycle-history", get(lifecycle_history))
        .route("/v1/products/:id/audit-verification", get(verify_audit_chain))
        .route("/v1/products/:id/:action", post(apply_transition))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/products/lifecycle - Create a draft product.
#[utoipa::path(
    post,
    path = "/v1/products/lifecycle",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Draft created", body = ProductResponse),
        (status = 400, description = "Invalid fields", body = crate::error::ErrorBody),
        (status = 403, description = "Caller may not create drafts", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn create_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let req = extract_validated_json(body)?;
    check_claimed_actor(req.created_by.as_ref(), &caller)?;

    let new = NewProduct::new(
        req.name,
        req.description.unwrap_or_default(),
        req.category_id,
        req.unit_price,
        req.size,
        req.color,
    )?;
    let product =
        engine::create_draft(&state, caller.principal(), new, req.submit_for_approval).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /v1/products/lifecycle/pending-approvals - The review queue, oldest first.
#[utoipa::path(
    get,
    path = "/v1/products/lifecycle/pending-approvals",
    responses(
        (status = 200, description = "Products awaiting approval", body = ProductListResponse),
    ),
    tag = "lifecycle"
)]
async fn list_pending_approvals(
    State(state): State<AppState>,
) -> Result<Json<ProductListResponse>, AppError> {
    let products = state
        .repo
        .list_in_state(LifecycleState::PendingApproval)
        .await?;
    Ok(product_list(products))
}

/// GET /v1/products/lifecycle/{state} - Products in one state, oldest first.
#[utoipa::path(
    get,
    path = "/v1/products/lifecycle/{state}",
    params(("state" = String, Path, description = "Lifecycle state name")),
    responses(
        (status = 200, description = "Products in the state", body = ProductListResponse),
        (status = 400, description = "Unknown state", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn list_by_state(
    State(state): State<AppState>,
    Path(state_name): Path<String>,
) -> Result<Json<ProductListResponse>, AppError> {
    let lifecycle_state = LifecycleState::from_name(&state_name)?;
    let products = state.repo.list_in_state(lifecycle_state).await?;
    Ok(product_list(products))
}

/// POST /v1/products/lifecycle/{id}/approve - Approve a pending product.
#[utoipa::path(
    post,
    path = "/v1/products/lifecycle/{id}/approve",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content = TransitionRequest, description = "Optional"),
    responses(
        (status = 200, description = "Approved", body = AuditEventResponse),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or not permitted", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn approve_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AuditEventResponse>, AppError> {
    run_transition(&state, &caller, &id, LifecycleAction::Approve.as_str(), &body).await
}

/// POST /v1/products/lifecycle/{id}/reject - Send a pending product back to draft.
#[utoipa::path(
    post,
    path = "/v1/products/lifecycle/{id}/reject",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content = TransitionRequest, description = "`reason` (or `notes`) is required"),
    responses(
        (status = 200, description = "Rejected", body = AuditEventResponse),
        (status = 400, description = "Missing reason", body = crate::error::ErrorBody),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or not permitted", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn reject_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AuditEventResponse>, AppError> {
    run_transition(&state, &caller, &id, LifecycleAction::Reject.as_str(), &body).await
}

/// GET /v1/products/lifecycle-stats - Product counts per state.
#[utoipa::path(
    get,
    path = "/v1/products/lifecycle-stats",
    responses(
        (status = 200, description = "Counts over all six states", body = StatsResponse),
    ),
    tag = "lifecycle"
)]
async fn lifecycle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let data = state.repo.counts().await?;
    Ok(Json(StatsResponse { data }))
}

/// GET /v1/products/{id} - Fetch one product.
#[utoipa::path(
    get,
    path = "/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state.repo.get(parse_product_id(&id)?).await?;
    Ok(Json(product.into()))
}

/// GET /v1/products/{id}/permitted-actions - Actions the caller may invoke now.
#[utoipa::path(
    get,
    path = "/v1/products/{id}/permitted-actions",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Permitted actions", body = PermittedActionsResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn permitted_actions(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<PermittedActionsResponse>, AppError> {
    let product = state.repo.get(parse_product_id(&id)?).await?;
    let roles = &caller.principal().roles;
    Ok(Json(PermittedActionsResponse {
        product_id: *product.id.as_uuid(),
        lifecycle_state: product.lifecycle_state.as_str().to_string(),
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        permitted_actions: roles
            .permitted_actions(product.lifecycle_state)
            .into_iter()
            .map(|a| a.as_str().to_string())
            .collect(),
    }))
}

/// GET /v1/products/{id}/lifecycle-history - Audit events, ascending.
#[utoipa::path(
    get,
    path = "/v1/products/{id}/lifecycle-history",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("include_creation" = Option<bool>, Query, description = "Prepend the creation event"),
    ),
    responses(
        (status = 200, description = "Ordered audit events", body = HistoryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn lifecycle_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let events = state
        .repo
        .history(parse_product_id(&id)?, params.include_creation)
        .await?;
    Ok(Json(HistoryResponse {
        data: events.into_iter().map(AuditEventResponse::from).collect(),
    }))
}

/// GET /v1/products/{id}/audit-verification - Recompute the audit hash chain.
#[utoipa::path(
    get,
    path = "/v1/products/{id}/audit-verification",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Chain verification result", body = ChainVerificationResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn verify_audit_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChainVerificationResponse>, AppError> {
    let id = parse_product_id(&id)?;
    let trail = state.repo.history(id, true).await?;
    let result = verify_chain(&trail);
    if !result.chain_valid {
        tracing::error!(
            product_id = %id,
            broken_links = result.broken_links,
            "audit chain verification failed"
        );
    }
    Ok(Json(ChainVerificationResponse {
        product_id: *id.as_uuid(),
        total_events: result.total_events,
        broken_links: result.broken_links,
        first_broken: result.first_broken.map(|e| *e.as_uuid()),
        chain_valid: result.chain_valid,
    }))
}

/// POST /v1/products/{id}/{action} - Apply a named lifecycle action.
#[utoipa::path(
    post,
    path = "/v1/products/{id}/{action}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("action" = String, Path, description = "submit-for-approval, approve, reject, activate, discontinue or archive"),
    ),
    request_body(content = TransitionRequest, description = "Optional"),
    responses(
        (status = 200, description = "Transition applied", body = AuditEventResponse),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition, already in state, not permitted, or lost a race", body = crate::error::ErrorBody),
    ),
    tag = "lifecycle"
)]
async fn apply_transition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, action)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<AuditEventResponse>, AppError> {
    run_transition(&state, &caller, &id, &action, &body).await
}

async fn run_transition(
    state: &AppState,
    caller: &CallerIdentity,
    id: &str,
    action: &str,
    body: &Bytes,
) -> Result<Json<AuditEventResponse>, AppError> {
    let id = parse_product_id(id)?;
    let req: TransitionRequest = extract_optional_json(body)?;
    check_claimed_actor(req.user_id.as_ref(), caller)?;

    let event = engine::transition(state, id, action, caller.principal(), req.notes).await?;
    Ok(Json(event.into()))
}
