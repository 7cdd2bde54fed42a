//! Shared helpers for the integration test binaries.
//!
//! Mirrors the wiring in `main.rs` so tests exercise the same router,
//! middleware stack, and engine configuration that production uses —
//! only with millisecond dispatch windows and mock capabilities.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wayside_api::auth::jwt::{generate_access_token, JwtConfig};
use wayside_api::background::PaymentCapture;
use wayside_api::config::ServerConfig;
use wayside_api::notifications::NotificationRouter;
use wayside_api::router::build_app_router;
use wayside_api::state::AppState;
use wayside_core::types::DbId;
use wayside_dispatch::{
    AvailabilityManager, DispatchConfig, DispatchCoordinator, GeospatialIndex, OfferBoard,
};
use wayside_events::EventBus;
use wayside_gateway::{
    BlobStore, InMemoryBlobStore, MockPaymentGateway, Notifier, TracingNotifier,
};
use wayside_store::Store;

/// Everything a test needs: the router plus handles into the engine.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub payments: Arc<MockPaymentGateway>,
    pub config: ServerConfig,
}

/// Build a test `ServerConfig` with safe defaults and the given dispatch
/// tunables.
pub fn test_config(dispatch: DispatchConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        dispatch,
    }
}

/// Dispatch config for tests that are not about round timing: a window
/// long enough that offers never expire mid-test. Timing-sensitive tests
/// pass their own short windows via [`build_test_app_with`].
pub fn patient_dispatch() -> DispatchConfig {
    DispatchConfig {
        accept_window: Duration::from_secs(60),
        ..Default::default()
    }
}

/// Build the full application with all middleware layers and background
/// tasks, using in-memory stores and mock capabilities.
pub fn build_test_app() -> TestApp {
    build_test_app_with(patient_dispatch())
}

pub fn build_test_app_with(dispatch: DispatchConfig) -> TestApp {
    let config = test_config(dispatch);

    let store = Arc::new(Store::new());
    let index = Arc::new(GeospatialIndex::new());
    let bus = Arc::new(EventBus::default());
    let availability = Arc::new(AvailabilityManager::new(
        Arc::clone(&store.mechanics),
        Arc::clone(&index),
        Arc::clone(&bus),
    ));
    let offers = Arc::new(OfferBoard::new());
    let coordinator = Arc::new(DispatchCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&index),
        Arc::clone(&availability),
        offers,
        Arc::clone(&bus),
        config.dispatch.clone(),
    ));

    let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let payments = Arc::new(MockPaymentGateway::new());

    tokio::spawn(
        NotificationRouter::new(Arc::clone(&store), notifier).run(bus.subscribe()),
    );
    let gateway: Arc<dyn wayside_gateway::PaymentGateway> = payments.clone();
    tokio::spawn(PaymentCapture::new(gateway).run(bus.subscribe()));

    let state = AppState {
        store,
        index,
        availability,
        coordinator,
        bus,
        blobs,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state.clone(), &config);

    TestApp {
        app,
        state,
        payments,
        config,
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Mint a bearer token for an arbitrary user/role pair.
pub fn mint_token(config: &ServerConfig, user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &config.jwt).expect("token generation should succeed")
}

pub fn rider_token(app: &TestApp, user_id: DbId) -> String {
    mint_token(&app.config, user_id, wayside_core::roles::ROLE_RIDER)
}

pub fn mechanic_token(app: &TestApp, user_id: DbId) -> String {
    mint_token(&app.config, user_id, wayside_core::roles::ROLE_MECHANIC)
}

pub fn admin_token(app: &TestApp, user_id: DbId) -> String {
    mint_token(&app.config, user_id, wayside_core::roles::ROLE_ADMIN)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send a request through the router, optionally authenticated, with an
/// optional JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request construction should succeed");

    app.clone()
        .oneshot(request)
        .await
        .expect("request should not fail at the transport level")
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    request(app, Method::POST, uri, token, body).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn patch(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::PATCH, uri, token, Some(body)).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

/// Assert a status and return the parsed body.
pub async fn expect_status(
    response: Response<Body>,
    expected: StatusCode,
) -> serde_json::Value {
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Scenario helpers
// ---------------------------------------------------------------------------

/// Minneapolis downtown, the default rider location in tests.
pub fn rider_spot() -> (f64, f64) {
    (44.9778, -93.2650)
}

/// Register a mechanic for `user_id`, report a location, and go ONLINE.
/// Returns the mechanic record id.
pub async fn online_mechanic(app: &TestApp, user_id: DbId, lat: f64, lng: f64) -> DbId {
    let token = mechanic_token(app, user_id);
    let created = expect_status(
        post(
            &app.app,
            "/api/v1/mechanics",
            Some(&token),
            Some(serde_json::json!({ "name": format!("mech-{user_id}"), "skills": ["battery"] })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let mechanic_id = created["data"]["id"].as_i64().expect("mechanic id");

    expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/location",
            Some(&token),
            serde_json::json!({ "lat": lat, "lng": lng }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/status",
            Some(&token),
            serde_json::json!({ "status": "ONLINE" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    mechanic_id
}

/// Create a breakdown as `rider_id` at the default spot; returns its id.
pub async fn create_breakdown(app: &TestApp, rider_id: DbId) -> DbId {
    let token = rider_token(app, rider_id);
    let (lat, lng) = rider_spot();
    let created = expect_status(
        post(
            &app.app,
            "/api/v1/breakdowns",
            Some(&token),
            Some(serde_json::json!({
                "lat": lat,
                "lng": lng,
                "address": "394 & Penn Ave",
                "category": "FLAT_TIRE",
                "notes": "front left tire shredded"
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    created["data"]["id"].as_i64().expect("breakdown id")
}

/// Poll until the mechanic holds at least one offer; panics on timeout.
pub async fn wait_for_offer(app: &TestApp, mechanic_user_token: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(&app.app, "/api/v1/mechanics/me/offers", Some(mechanic_user_token)).await;
        if response.status() == StatusCode::OK {
            let json = body_json(response).await;
            if json["data"]
                .as_array()
                .is_some_and(|offers| !offers.is_empty())
            {
                return json;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no offer arrived within the deadline");
}

/// Poll until the breakdown reaches `status`; panics on timeout.
pub async fn wait_for_status(app: &TestApp, viewer_token: &str, breakdown_id: DbId, status: &str) {
    for _ in 0..200 {
        let response = get(
            &app.app,
            &format!("/api/v1/breakdowns/{breakdown_id}"),
            Some(viewer_token),
        )
        .await;
        if response.status() == StatusCode::OK {
            let json = body_json(response).await;
            if json["data"]["status"] == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("breakdown {breakdown_id} never reached {status}");
}
