//! # Authentication Middleware
//!
//! Bearer token middleware that turns the identity provider's group
//! membership into an explicit [`Principal`] for every request.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {groups}:{actor_id}:{secret}
//! ```
//!
//! `groups` is a comma-separated list of identity-provider group names,
//! mapped to roles by [`ims_state::roles_from_groups`]. `actor_id` becomes
//! `changed_by` on every audit event the request produces. The secret is
//! compared in constant time.
//!
//! ## CallerIdentity
//!
//! The middleware injects a [`CallerIdentity`] into request extensions.
//! Handlers take it as an extractor argument; nothing looks the caller up
//! from ambient state.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ims_core::ActorId;
use ims_state::{roles_from_groups, Principal, Role, RoleSet};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AppError;

/// Actor id of the principal used when authentication is disabled.
pub const DEV_ACTOR: &str = "dev";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller, available to handlers via `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Principal);

impl CallerIdentity {
    /// The principal used when authentication is disabled: actor `dev`, role admin.
    pub fn development() -> Result<Self, AppError> {
        let actor = ActorId::new(DEV_ACTOR).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self(Principal::new(
            actor,
            [Role::Admin].into_iter().collect::<RoleSet>(),
        )))
    }

    /// The caller's actor id.
    pub fn actor(&self) -> &ActorId {
        &self.0.actor
    }

    /// The caller's principal.
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Shared bearer secret. Zeroed on drop; `Debug` never prints it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Auth configuration injected into request extensions.
///
/// With `secret: None` authentication is disabled and every request runs as
/// [`CallerIdentity::development`].
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub secret: Option<SecretToken>,
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of secrets.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{groups}:{actor_id}:{secret}`.
///
/// The secret may itself contain `:`; only the first two separators split.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<Principal, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let [groups, actor, secret] = parts.as_slice() else {
        return Err("invalid token format, expected {groups}:{actor_id}:{secret}".into());
    };
    if !constant_time_token_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }
    let actor = ActorId::new(*actor).map_err(|e| e.to_string())?;
    let roles = roles_from_groups(groups.split(',').map(str::trim).filter(|g| !g.is_empty()));
    Ok(Principal::new(actor, roles))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token and inject the caller's [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let Some(expected) = config.secret else {
        return match CallerIdentity::development() {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(e) => e.into_response(),
        };
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(provided)) => match parse_bearer_token(provided, expected.expose()) {
            Ok(principal) => {
                tracing::debug!(actor = %principal.actor, roles = %principal.roles.names(), "caller authenticated");
                request.extensions_mut().insert(CallerIdentity(principal));
                next.run(request).await
            }
            Err(msg) => {
                tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                AppError::Unauthorized(msg).into_response()
            }
        },
        Some(None) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            AppError::Unauthorized("authorization header must use Bearer scheme".into())
                .into_response()
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            AppError::Unauthorized("missing authorization header".into()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn whoami(caller: CallerIdentity) -> String {
        format!("{}|{}", caller.actor(), caller.principal().roles.names())
    }

    fn test_app(secret: Option<&str>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig {
                secret: secret.map(SecretToken::new),
            }))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn parses_groups_actor_and_secret() {
        let p = parse_bearer_token("IMS-Admins,Suppliers:alice:s3cret", "s3cret").unwrap();
        assert_eq!(p.actor.as_str(), "alice");
        assert!(p.roles.contains(Role::Admin));
        assert!(p.roles.contains(Role::Supplier));
    }

    #[test]
    fn secret_may_contain_colons() {
        assert!(parse_bearer_token("admin:bob:a:b:c", "a:b:c").is_ok());
    }

    #[test]
    fn rejects_wrong_secret_and_bad_shape() {
        assert!(parse_bearer_token("admin:bob:nope", "s3cret").is_err());
        assert!(parse_bearer_token("s3cret", "s3cret").is_err());
        assert!(parse_bearer_token("admin::s3cret", "s3cret").is_err());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let cfg = AuthConfig {
            secret: Some(SecretToken::new("hunter2")),
        };
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn disabled_auth_runs_as_dev_admin() {
        let (status, body) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "dev|admin");
    }

    #[tokio::test]
    async fn valid_token_is_accepted() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Bearer warehouse:w1:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "w1|warehouse_staff");
    }

    #[tokio::test]
    async fn missing_header_is_401() {
        let (status, body) = call(test_app(Some("s3cret")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn basic_scheme_is_401() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Basic abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
