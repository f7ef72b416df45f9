//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("{groups}:{actor_id}:{secret}")
                        .description(Some(
                            "Identity-provider groups, actor id and the shared secret set via IMS_AUTH_SECRET.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the lifecycle service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "IMS Product Lifecycle API",
        version = "0.1.0",
        description = "Product lifecycle state machine: draft creation, role-gated transitions, approval queue, per-state counts, and a hash-chained audit history.\n\nAuthentication: `Authorization: Bearer {groups}:{actor_id}:{secret}`. Health probes and `/metrics` are unauthenticated."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::lifecycle::create_product,
        crate::routes::lifecycle::list_pending_approvals,
        crate::routes::lifecycle::list_by_state,
        crate::routes::lifecycle::approve_product,
        crate::routes::lifecycle::reject_product,
        crate::routes::lifecycle::lifecycle_stats,
        crate::routes::lifecycle::get_product,
        crate::routes::lifecycle::permitted_actions,
        crate::routes::lifecycle::lifecycle_history,
        crate::routes::lifecycle::verify_audit_chain,
        crate::routes::lifecycle::apply_transition,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::lifecycle::CreateProductRequest,
            crate::routes::lifecycle::TransitionRequest,
            crate::routes::lifecycle::ProductResponse,
            crate::routes::lifecycle::AuditEventResponse,
            crate::routes::lifecycle::ProductListResponse,
            crate::routes::lifecycle::HistoryResponse,
            crate::routes::lifecycle::StatsResponse,
            crate::routes::lifecycle::PermittedActionsResponse,
            crate::routes::lifecycle::ChainVerificationResponse,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "lifecycle", description = "Product lifecycle: draft → pending_approval → approved → active → discontinued → archived"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
