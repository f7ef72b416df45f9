//! # Integration Tests for ims-api
//!
//! Drives the full router (auth, rate limiting, metrics, handlers, in-memory
//! repository) through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ims_api::auth::SecretToken;
use ims_api::state::{AppConfig, AppState};

const SECRET: &str = "s3cret";
const ADMIN: &str = "Bearer IMS-Admins:admin-1:s3cret";
const STAFF: &str = "Bearer Warehouse-Staff:staff-1:s3cret";
const SUPPLIER: &str = "Bearer Suppliers:sup-1:s3cret";

/// Helper: build the test app with auth disabled.
fn test_app() -> axum::Router {
    ims_api::app(AppState::try_new().unwrap())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth() -> axum::Router {
    test_app_with_config(AppConfig {
        auth_secret: Some(SecretToken::new(SECRET)),
        ..AppConfig::default()
    })
}

fn test_app_with_config(config: AppConfig) -> axum::Router {
    ims_api::app(AppState::try_with_config(config, None).unwrap())
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a request and parse the JSON response.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

fn widget() -> Value {
    json!({
        "name": "Widget",
        "category_id": 4,
        "unit_price": "12.50",
        "description": "A small widget",
        "size": "M",
        "color": ""
    })
}

async fn create(app: &axum::Router, token: Option<&str>) -> String {
    let (status, body) = send(app, "POST", "/v1/products/lifecycle", token, Some(widget())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn history_len(app: &axum::Router, id: &str, token: Option<&str>) -> usize {
    let (status, body) = send(
        app,
        "GET",
        &format!("/v1/products/{id}/lifecycle-history"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].as_array().unwrap().len()
}

async fn state_of(app: &axum::Router, id: &str, token: Option<&str>) -> String {
    let (status, body) = send(app, "GET", &format!("/v1/products/{id}"), token, None).await;
    assert_eq!(status, StatusCode::OK);
    body["lifecycle_state"].as_str().unwrap().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe_needs_no_auth() {
    let response = test_app_with_auth()
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Creation -----------------------------------------------------------------

#[tokio::test]
async fn test_create_draft() {
    let app = test_app();
    let (status, body) = send(&app, "POST", "/v1/products/lifecycle", None, Some(widget())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["lifecycle_state"], "draft");
    assert_eq!(body["version"], 0);
    assert_eq!(body["created_by"], "dev");
    assert_eq!(body["unit_price"], "12.50");
    assert_eq!(body["size"], "M");
    assert!(body["color"].is_null());
    assert!(body["sku"].as_str().unwrap().starts_with("PRD-"));
}

#[tokio::test]
async fn test_create_and_submit_in_one_step() {
    let app = test_app();
    let mut req = widget();
    req["submit_for_approval"] = json!(true);
    let (status, body) = send(&app, "POST", "/v1/products/lifecycle", None, Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["lifecycle_state"], "pending_approval");
    let id = body["id"].as_str().unwrap();
    assert_eq!(history_len(&app, id, None).await, 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_fields() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/products/lifecycle",
        None,
        Some(json!({"name": "", "category_id": 1, "unit_price": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/products/lifecycle",
        None,
        Some(json!({"name": "Widget", "category_id": 1, "unit_price": 1.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/products/lifecycle",
        None,
        Some(json!({"name": "Widget", "category_id": 0, "unit_price": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/products/lifecycle",
        None,
        Some(json!({"name": "Widget", "category_id": 1, "unit_price": "0.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_foreign_created_by() {
    let app = test_app();
    let mut req = widget();
    req["created_by"] = json!(1);
    let (status, body) = send(&app, "POST", "/v1/products/lifecycle", None, Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let mut req = widget();
    req["created_by"] = json!("dev");
    let (status, _) = send(&app, "POST", "/v1/products/lifecycle", None, Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_supplier_cannot_create() {
    let app = test_app_with_auth();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/products/lifecycle",
        Some(SUPPLIER),
        Some(widget()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_staff_can_create_but_not_transition() {
    let app = test_app_with_auth();
    let id = create(&app, Some(STAFF)).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/submit-for-approval"),
        Some(STAFF),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ACTION_NOT_PERMITTED");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = test_app_with_auth();
    let (status, body) = send(&app, "GET", "/v1/products/lifecycle-stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_wrong_secret_is_401() {
    let app = test_app_with_auth();
    let (status, _) = send(
        &app,
        "GET",
        "/v1/products/lifecycle-stats",
        Some("Bearer IMS-Admins:admin-1:wrong"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Transitions --------------------------------------------------------------

#[tokio::test]
async fn test_full_canonical_path() {
    let app = test_app();
    let id = create(&app, None).await;

    let path = [
        ("submit-for-approval", "draft", "pending_approval"),
        ("approve", "pending_approval", "approved"),
        ("activate", "approved", "active"),
        ("discontinue", "active", "discontinued"),
        ("archive", "discontinued", "archived"),
    ];
    for (action, from, to) in path {
        let (status, event) = send(
            &app,
            "POST",
            &format!("/v1/products/{id}/{action}"),
            None,
            Some(json!({"notes": format!("{action} action")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{action}: {event}");
        assert_eq!(event["old_state"], from);
        assert_eq!(event["new_state"], to);
        assert_eq!(event["action"], action);
        assert_eq!(event["changed_by"], "dev");
    }

    let (_, history) = send(
        &app,
        "GET",
        &format!("/v1/products/{id}/lifecycle-history"),
        None,
        None,
    )
    .await;
    let events = history["data"].as_array().unwrap();
    assert_eq!(events.len(), 5);
    for (event, (_, from, to)) in events.iter().zip(path) {
        assert_eq!(event["old_state"], from);
        assert_eq!(event["new_state"], to);
    }
    for pair in events.windows(2) {
        assert_eq!(pair[1]["previous_hash"], pair[0]["event_hash"]);
    }

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/activate"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_transition_without_body() {
    let app = test_app();
    let id = create(&app, None).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/products/{id}/submit-for-approval"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_transition_is_409_with_details() {
    let app = test_app();
    let id = create(&app, None).await;
    let (status, body) = send(&app, "POST", &format!("/v1/products/{id}/approve"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(body["error"]["details"]["current_state"], "draft");
    assert_eq!(body["error"]["details"]["action"], "approve");
    assert_eq!(state_of(&app, &id, None).await, "draft");
    assert_eq!(history_len(&app, &id, None).await, 0);
}

#[tokio::test]
async fn test_unknown_action_is_invalid_transition() {
    let app = test_app();
    let id = create(&app, None).await;
    let (status, body) = send(&app, "POST", &format!("/v1/products/{id}/teleport"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_already_in_state_is_distinct() {
    let app = test_app();
    let id = create(&app, None).await;
    for action in ["submit-for-approval", "approve", "activate"] {
        let (status, _) = send(&app, "POST", &format!("/v1/products/{id}/{action}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "POST", &format!("/v1/products/{id}/activate"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_IN_STATE");
}

#[tokio::test]
async fn test_reactivation_from_discontinued() {
    let app = test_app();
    let id = create(&app, None).await;
    for action in ["submit-for-approval", "approve", "activate", "discontinue", "activate"] {
        let (status, _) = send(&app, "POST", &format!("/v1/products/{id}/{action}"), None, None).await;
        assert_eq!(status, StatusCode::OK, "{action}");
    }
    assert_eq!(state_of(&app, &id, None).await, "active");
}

#[tokio::test]
async fn test_unknown_product_is_404() {
    let app = test_app();
    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "POST", &format!("/v1/products/{missing}/approve"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/products/{missing}/lifecycle-history"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/v1/products/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mismatched_user_id_is_rejected() {
    let app = test_app_with_auth();
    let id = create(&app, Some(ADMIN)).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/submit-for-approval"),
        Some(ADMIN),
        Some(json!({"userId": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/submit-for-approval"),
        Some(ADMIN),
        Some(json!({"userId": "admin-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// -- Approve / reject aliases -------------------------------------------------

#[tokio::test]
async fn test_approve_and_reject_aliases() {
    let app = test_app();
    let mut req = widget();
    req["submit_for_approval"] = json!(true);
    let (_, a) = send(&app, "POST", "/v1/products/lifecycle", None, Some(req.clone())).await;
    let (_, b) = send(&app, "POST", "/v1/products/lifecycle", None, Some(req)).await;
    let a = a["id"].as_str().unwrap();
    let b = b["id"].as_str().unwrap();

    let (status, event) = send(
        &app,
        "POST",
        &format!("/v1/products/lifecycle/{a}/approve"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["new_state"], "approved");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/products/lifecycle/{b}/reject"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, event) = send(
        &app,
        "POST",
        &format!("/v1/products/lifecycle/{b}/reject"),
        None,
        Some(json!({"reason": "missing photos"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["new_state"], "draft");
    assert_eq!(event["notes"], "missing photos");
}

// -- Reads --------------------------------------------------------------------

#[tokio::test]
async fn test_pending_queue_is_fifo_on_both_paths() {
    let app = test_app();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = create(&app, None).await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/products/{id}/submit-for-approval"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        ids.push(id);
    }
    create(&app, None).await;

    for uri in [
        "/v1/products/lifecycle/pending-approvals",
        "/v1/products/pending-approvals",
    ] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body["data"].as_array().unwrap();
        assert_eq!(listed.len(), 3);
        for product in listed {
            assert_eq!(product["lifecycle_state"], "pending_approval");
            assert!(ids.iter().any(|id| product["id"] == id.as_str()));
        }
        let created_at: Vec<chrono::DateTime<chrono::Utc>> = listed
            .iter()
            .map(|p| p["created_at"].as_str().unwrap().parse().unwrap())
            .collect();
        let mut sorted = created_at.clone();
        sorted.sort();
        assert_eq!(created_at, sorted);
    }
}

#[tokio::test]
async fn test_list_by_state() {
    let app = test_app();
    create(&app, None).await;
    create(&app, None).await;
    let (status, body) = send(&app, "GET", "/v1/products/lifecycle/draft", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/v1/products/lifecycle/retired", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_stats_cover_all_states_and_sum() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/v1/products/lifecycle-stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_object().unwrap();
    assert_eq!(data.len(), 6);
    assert!(data.values().all(|v| v == 0));

    for _ in 0..4 {
        create(&app, None).await;
    }
    let id = create(&app, None).await;
    send(&app, "POST", &format!("/v1/products/{id}/submit-for-approval"), None, None).await;

    let (_, body) = send(&app, "GET", "/v1/products/lifecycle-stats", None, None).await;
    let data = body["data"].as_object().unwrap();
    let total: u64 = data.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(total, 5);
    assert_eq!(data["draft"], 4);
    assert_eq!(data["pending_approval"], 1);
    assert_eq!(data["archived"], 0);
}

#[tokio::test]
async fn test_permitted_actions_per_role() {
    let app = test_app_with_auth();
    let id = create(&app, Some(ADMIN)).await;
    send(
        &app,
        "POST",
        &format!("/v1/products/{id}/submit-for-approval"),
        Some(ADMIN),
        None,
    )
    .await;

    let uri = format!("/v1/products/{id}/permitted-actions");
    let (status, body) = send(&app, "GET", &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lifecycle_state"], "pending_approval");
    assert_eq!(body["permitted_actions"], json!(["approve", "reject"]));

    let (_, body) = send(&app, "GET", &uri, Some(SUPPLIER), None).await;
    assert_eq!(body["permitted_actions"], json!([]));
    assert_eq!(body["roles"], json!(["supplier"]));
}

#[tokio::test]
async fn test_history_with_creation_and_chain_verification() {
    let app = test_app();
    let id = create(&app, None).await;
    send(&app, "POST", &format!("/v1/products/{id}/submit-for-approval"), None, None).await;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/v1/products/{id}/lifecycle-history?include_creation=true"),
        None,
        None,
    )
    .await;
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0]["old_state"].is_null());
    assert!(events[0]["action"].is_null());
    assert_eq!(events[0]["new_state"], "draft");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/products/{id}/audit-verification"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain_valid"], true);
    assert_eq!(body["total_events"], 2);
}

// -- Section scenario: role gate between submit and approve --------------------

#[tokio::test]
async fn test_supplier_approval_scenario() {
    let app = test_app_with_auth();
    let id = create(&app, Some(ADMIN)).await;
    assert_eq!(state_of(&app, &id, Some(ADMIN)).await, "draft");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/submit-for-approval"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state_of(&app, &id, Some(ADMIN)).await, "pending_approval");
    assert_eq!(history_len(&app, &id, Some(ADMIN)).await, 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/approve"),
        Some(SUPPLIER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ACTION_NOT_PERMITTED");
    assert_eq!(state_of(&app, &id, Some(ADMIN)).await, "pending_approval");
    assert_eq!(history_len(&app, &id, Some(ADMIN)).await, 1);

    let (status, event) = send(
        &app,
        "POST",
        &format!("/v1/products/{id}/approve"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["changed_by"], "admin-1");
    assert_eq!(state_of(&app, &id, Some(ADMIN)).await, "approved");
    assert_eq!(history_len(&app, &id, Some(ADMIN)).await, 2);
}

// -- Concurrency --------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_transitions_apply_once() {
    let app = test_app();
    let id = create(&app, None).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        let uri = format!("/v1/products/{id}/submit-for-approval");
        handles.push(tokio::spawn(async move {
            send(&app, "POST", &uri, None, None).await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
            let code = body["error"]["code"].as_str().unwrap();
            assert!(
                code == "STATE_CONFLICT" || code == "ALREADY_IN_STATE",
                "unexpected loser code {code}"
            );
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(history_len(&app, &id, None).await, 1);
}

// -- Rate limiting ------------------------------------------------------------

#[tokio::test]
async fn test_rate_limit_is_per_caller() {
    let app = test_app_with_config(AppConfig {
        auth_secret: Some(SecretToken::new(SECRET)),
        rate_limit: 2,
        ..AppConfig::default()
    });
    for _ in 0..2 {
        let (status, _) = send(&app, "GET", "/v1/products/lifecycle-stats", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "GET", "/v1/products/lifecycle-stats", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let (status, _) = send(&app, "GET", "/v1/products/lifecycle-stats", Some(SUPPLIER), None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Metrics & OpenAPI --------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_reports_products_and_transitions() {
    let app = test_app();
    let id = create(&app, None).await;
    send(&app, "POST", &format!("/v1/products/{id}/submit-for-approval"), None, None).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("ims_products_total{state=\"pending_approval\"} 1"));
    assert!(text.contains("ims_lifecycle_transitions_total"));
    assert!(text.contains("ims_http_requests_total"));
}

#[tokio::test]
async fn test_http_metrics_label_by_route_template() {
    let app = test_app();
    let id = create(&app, None).await;
    for i in 0..25 {
        let (status, _) = send(&app, "POST", &format!("/v1/products/{id}/junk-{i}"), None, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        send(&app, "GET", &format!("/no/such/route-{i}"), None, None).await;
    }

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = body_string(response).await;
    let series: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("ims_http_requests_total{"))
        .collect();

    assert!(series.iter().all(|line| !line.contains("junk") && !line.contains("route-")));
    assert!(series.iter().any(|line| line.contains("path=\"/v1/products/:id/:action\"")
        && line.contains("status=\"409\"")
        && line.ends_with(" 25")));
    assert!(series.iter().any(|line| line.contains("path=\"unmatched\"")));
    assert!(series.len() <= 4, "unexpected series: {series:?}");
}

#[tokio::test]
async fn test_metrics_can_be_disabled() {
    let app = test_app_with_config(AppConfig {
        metrics_enabled: false,
        ..AppConfig::default()
    });
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_json() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/products/{id}/{action}"].is_object());
}
