//! Integration tests for mechanic availability records, live pings, and
//! the public proximity query.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, build_test_app, expect_status, get, mechanic_token, online_mechanic,
    post, put, rider_spot, rider_token,
};

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_creates_an_offline_record() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);

    let json = expect_status(
        post(
            &app.app,
            "/api/v1/mechanics",
            Some(&token),
            Some(serde_json::json!({ "name": "Lou's Mobile Repair", "skills": ["battery", "towing"] })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    let data = &json["data"];
    assert_eq!(data["user_id"], 10);
    assert_eq!(data["status"], "OFFLINE");
    assert_eq!(data["is_online"], false);
    assert_eq!(data["verified"], false);
    assert!(data["location"].is_null());
}

#[tokio::test]
async fn second_registration_for_same_user_conflicts() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);
    let body = serde_json::json!({ "name": "Lou" });

    expect_status(
        post(&app.app, "/api/v1/mechanics", Some(&token), Some(body.clone())).await,
        StatusCode::CREATED,
    )
    .await;
    let json = expect_status(
        post(&app.app, "/api/v1/mechanics", Some(&token), Some(body)).await,
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn empty_name_is_rejected_with_field_detail() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);

    let json = expect_status(
        post(
            &app.app,
            "/api/v1/mechanics",
            Some(&token),
            Some(serde_json::json!({ "name": "" })),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["details"]["name"].is_array());
}

#[tokio::test]
async fn me_without_record_is_404() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);

    expect_status(
        get(&app.app, "/api/v1/mechanics/me", Some(&token)).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

// ---------------------------------------------------------------------------
// Live pings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn location_ping_updates_the_snapshot() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);
    expect_status(
        post(
            &app.app,
            "/api/v1/mechanics",
            Some(&token),
            Some(serde_json::json!({ "name": "Lou" })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    let json = expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/location",
            Some(&token),
            serde_json::json!({ "lat": 44.98, "lng": -93.27 }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["location"]["lat"], 44.98);
    assert!(json["data"]["location_updated_at"].is_string());
}

#[tokio::test]
async fn out_of_range_location_is_rejected() {
    let app = build_test_app();
    let token = mechanic_token(&app, 10);
    expect_status(
        post(
            &app.app,
            "/api/v1/mechanics",
            Some(&token),
            Some(serde_json::json!({ "name": "Lou" })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    let json = expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/location",
            Some(&token),
            serde_json::json!({ "lat": -95.0, "lng": 10.0 }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn status_toggle_sets_derived_online_flag() {
    let app = build_test_app();
    let (lat, lng) = rider_spot();
    online_mechanic(&app, 10, lat, lng).await;
    let token = mechanic_token(&app, 10);

    let json = expect_status(
        get(&app.app, "/api/v1/mechanics/me", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "ONLINE");
    assert_eq!(json["data"]["is_online"], true);

    let json = expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/status",
            Some(&token),
            serde_json::json!({ "status": "OFFLINE" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "OFFLINE");
    assert_eq!(json["data"]["is_online"], false);
}

#[tokio::test]
async fn busy_cannot_be_requested_directly() {
    let app = build_test_app();
    let (lat, lng) = rider_spot();
    online_mechanic(&app, 10, lat, lng).await;

    let json = expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/status",
            Some(&mechanic_token(&app, 10)),
            serde_json::json!({ "status": "BUSY" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn admin_can_toggle_another_mechanics_status() {
    let app = build_test_app();
    let (lat, lng) = rider_spot();
    let mechanic_id = online_mechanic(&app, 10, lat, lng).await;

    let json = expect_status(
        put(
            &app.app,
            &format!("/api/v1/mechanics/{mechanic_id}/status"),
            Some(&admin_token(&app, 999)),
            serde_json::json!({ "status": "OFFLINE" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "OFFLINE");

    // Non-admins may not use the admin endpoint.
    let response = put(
        &app.app,
        &format!("/api/v1/mechanics/{mechanic_id}/status"),
        Some(&mechanic_token(&app, 10)),
        serde_json::json!({ "status": "ONLINE" }),
    )
    .await;
    expect_status(response, StatusCode::FORBIDDEN).await;
}

// ---------------------------------------------------------------------------
// Proximity query
// ---------------------------------------------------------------------------

/// A point approximately `km` kilometres due east of the rider spot.
fn east_of_spot(km: f64) -> (f64, f64) {
    let (lat, lng) = rider_spot();
    (lat, lng + km / (111.2 * lat.to_radians().cos()))
}

#[tokio::test]
async fn nearby_returns_online_mechanics_within_radius_nearest_first() {
    let app = build_test_app();
    // Mechanics at ~2, ~9, ~14, and ~20 km; only the first three are in
    // range at the default 15 km radius.
    for (user_id, km) in [(10, 9.0), (11, 2.0), (12, 20.0), (13, 14.0)] {
        let (lat, lng) = east_of_spot(km);
        online_mechanic(&app, user_id, lat, lng).await;
    }

    let (lat, lng) = rider_spot();
    let json = expect_status(
        get(
            &app.app,
            &format!("/api/v1/mechanics/nearby?lat={lat}&lng={lng}"),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    let users: Vec<i64> = items.iter().map(|i| i["user_id"].as_i64().unwrap()).collect();
    assert_eq!(users, vec![11, 10, 13], "nearest first");
    let distances: Vec<f64> = items
        .iter()
        .map(|i| i["distance_km"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    for item in items {
        assert_eq!(item["status"], "ONLINE");
    }
}

#[tokio::test]
async fn nearby_honours_a_custom_radius() {
    let app = build_test_app();
    let (lat, lng) = east_of_spot(20.0);
    online_mechanic(&app, 10, lat, lng).await;

    let (qlat, qlng) = rider_spot();
    let json = expect_status(
        get(
            &app.app,
            &format!("/api/v1/mechanics/nearby?lat={qlat}&lng={qlng}"),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let json = expect_status(
        get(
            &app.app,
            &format!("/api/v1/mechanics/nearby?lat={qlat}&lng={qlng}&radius=25"),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn nearby_excludes_offline_mechanics() {
    let app = build_test_app();
    let (lat, lng) = rider_spot();
    online_mechanic(&app, 10, lat, lng).await;
    expect_status(
        put(
            &app.app,
            "/api/v1/mechanics/me/status",
            Some(&mechanic_token(&app, 10)),
            serde_json::json!({ "status": "OFFLINE" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let json = expect_status(
        get(
            &app.app,
            &format!("/api/v1/mechanics/nearby?lat={lat}&lng={lng}"),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn nearby_validates_coordinates() {
    let app = build_test_app();
    let json = expect_status(
        get(&app.app, "/api/v1/mechanics/nearby?lat=99&lng=0", None).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Role gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn riders_cannot_view_offers() {
    let app = build_test_app();
    let response = get(
        &app.app,
        "/api/v1/mechanics/me/offers",
        Some(&rider_token(&app, 1)),
    )
    .await;
    expect_status(response, StatusCode::FORBIDDEN).await;
}
