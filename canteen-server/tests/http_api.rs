//! HTTP surface, driven in-process through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use canteen_server::auth::FACTORY_PIN;
use canteen_server::core::AdminCredentials;
use canteen_server::{CanteenState, ChangeBus, Config, ErrorCode, LocalStore, Store, api};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let bus = ChangeBus::new();
    let store: Arc<dyn Store> = Arc::new(LocalStore::open_in_memory(bus.clone()).unwrap());
    let state = CanteenState::with_store(Config::for_tests(), store, bus).unwrap();
    api::build_app(state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    match token {
        Some(token) => call_with(app, method, uri, &[("x-admin-token", token)], body).await,
        None => call_with(app, method, uri, &[], body).await,
    }
}

/// 厨房端请求 (出厂 PIN)
async fn kitchen_call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_with(app, method, uri, &[("x-kitchen-pin", FACTORY_PIN)], body).await
}

async fn call_with(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let creds = AdminCredentials::default();
    let (status, body) = call(
        app,
        "POST",
        "/api/admin/login",
        None,
        Some(json!({ "email": creds.email, "password": creds.password, "pin": creds.pin })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_local_backend() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "local");
}

#[tokio::test]
async fn menu_lists_items_with_image_urls() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/menu/tea", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Tea");
    assert_eq!(body["price"], 10);
    assert_eq!(body["imageUrl"], "/assets/menu/tea.jpg");

    let (status, body) = call(&app, "GET", "/api/menu/pizza", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], ErrorCode::ProductNotFound.code());
}

#[tokio::test]
async fn order_flow_over_http() {
    let app = app();
    let (status, order) = call(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(json!({
            "tableNumber": 3,
            "items": [{ "id": "tea", "name": "Tea", "price": 10, "quantity": 2 }],
            "totalAmount": 20
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["orderNumber"], "AGM-001");
    assert_eq!(order["status"], "placed");
    let id = order["id"].as_str().unwrap().to_string();

    // 同桌第二单被拒
    let (status, body) = call(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(json!({
            "tableNumber": 3,
            "items": [{ "id": "tea", "name": "Tea", "price": 10, "quantity": 1 }],
            "totalAmount": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], ErrorCode::TableOccupied.code());

    let (status, _) = kitchen_call(
        &app,
        "PUT",
        &format!("/api/orders/{id}/status"),
        Some(json!({ "status": "served" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for next in ["preparing", "ready", "served"] {
        let (status, body) = kitchen_call(
            &app,
            "PUT",
            &format!("/api/orders/{id}/status"),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], next);
    }

    let (status, rating) = call(
        &app,
        "POST",
        &format!("/api/orders/{id}/rating"),
        None,
        Some(json!({ "stars": 4, "tags": ["Tasty"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["stars"], 4);

    let (status, current) = call(&app, "GET", "/api/tables/3/order", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(current.is_null());
}

#[tokio::test]
async fn status_changes_need_kitchen_pin_or_admin_session() {
    let app = app();
    let (_, order) = call(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(json!({
            "tableNumber": 8,
            "items": [{ "id": "tea", "name": "Tea", "price": 10, "quantity": 1 }],
            "totalAmount": 10
        })),
    )
    .await;
    let uri = format!("/api/orders/{}/status", order["id"].as_str().unwrap());
    let reject = json!({ "status": "rejected" });

    let (status, body) = call(&app, "PUT", &uri, None, Some(reject.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::NotAuthenticated.code());

    let (status, body) =
        call_with(&app, "PUT", &uri, &[("x-kitchen-pin", "1111")], Some(reject.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::InvalidCredentials.code());

    let (status, body) = call(&app, "PUT", &uri, Some("session_bogus"), Some(reject.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::SessionExpired.code());

    // 被拒绝的请求都没有改动订单
    let (_, current) = call(&app, "GET", "/api/tables/8/order", None, None).await;
    assert_eq!(current["status"], "placed");

    let (status, body) = kitchen_call(&app, "PUT", &uri, Some(json!({ "status": "preparing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "preparing");

    let token = login(&app).await;
    let (status, body) = call(&app, "PUT", &uri, Some(&token), Some(reject)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
}

#[tokio::test]
async fn rating_sheet_tags() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/ratings/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Tasty", "Quick", "Worth it", "Too spicy", "Cold"]));
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = app();

    let (status, body) = call(&app, "GET", "/api/admin/analytics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::NotAuthenticated.code());

    let (status, body) = call(&app, "GET", "/api/admin/analytics", Some("session_bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::SessionExpired.code());

    let token = login(&app).await;
    let (status, body) = call(&app, "GET", "/api/admin/analytics", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hourlySales"].as_array().unwrap().len(), 12);

    let (status, body) = call(&app, "POST", "/api/admin/refresh", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expiresAt"].as_i64().unwrap() > 0);

    let (status, body) = call(&app, "POST", "/api/admin/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loggedOut"], true);

    let (status, _) = call(&app, "GET", "/api/admin/login-logs", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_tables_menu_and_pins() {
    let app = app();
    let token = login(&app).await;

    let (status, body) = call(
        &app,
        "PUT",
        "/api/admin/tables/5",
        Some(&token),
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);

    let (status, body) = call(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(json!({
            "tableNumber": 5,
            "items": [{ "id": "tea", "name": "Tea", "price": 10, "quantity": 1 }],
            "totalAmount": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], ErrorCode::TableDisabled.code());

    let (status, body) = call(
        &app,
        "PATCH",
        "/api/admin/menu/tea",
        Some(&token),
        Some(json!({ "price": 15, "bogus": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 15);

    let (status, body) = call(&app, "DELETE", "/api/admin/menu/tea/override", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 10);

    let (status, body) = call(
        &app,
        "POST",
        "/api/admin/kitchen/pins",
        Some(&token),
        Some(json!({ "pin": "12a4" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::InvalidPin.code());

    let (status, pins) = call(
        &app,
        "POST",
        "/api/admin/kitchen/pins",
        Some(&token),
        Some(json!({ "pin": "1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(pins.as_array().unwrap().contains(&json!("1234")));

    let (_, body) = call(&app, "POST", "/api/kitchen/verify", None, Some(json!({ "pin": "1234" }))).await;
    assert_eq!(body["valid"], true);
    let (_, body) = call(&app, "POST", "/api/kitchen/verify", None, Some(json!({ "pin": "5555" }))).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn qr_links_and_scans() {
    let app = app();

    let (status, body) = call(&app, "GET", "/api/qr?table=99", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tableNumber"], 12);
    assert_eq!(body["url"], "http://localhost:5173/order?table=12");

    let (_, body) = call(&app, "GET", "/api/qr/all", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 12);

    let (status, body) = call(&app, "POST", "/api/scans/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalScans"], 1);

    let (status, _) = call(&app, "POST", "/api/scans/40", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
