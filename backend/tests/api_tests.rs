//! HTTP surface tests: routing, authentication and error bodies
//!
//! The router runs against the in-memory stock store; the Postgres pool is
//! lazy and never connected, so only stock-service routes are exercised.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{dec, day, harness, Harness};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use stockroom_backend::config::{
    Config, DatabaseConfig, JwtConfig, ServerConfig, StockConfig,
};
use stockroom_backend::middleware::auth::Claims;
use stockroom_backend::{create_app, AppState};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/stockroom_test".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 1,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            leeway_secs: 0,
        },
        stock: StockConfig::default(),
    }
}

fn app(h: &Harness) -> Router {
    let config = test_config();
    let db = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .unwrap();
    create_app(AppState {
        db,
        config: Arc::new(config),
        stock: h.service.clone(),
    })
}

fn token(role: &str) -> String {
    let claims = Claims {
        id: 1,
        username: "maria".to_string(),
        role: role.to_string(),
        exp: chrono::Utc::now().timestamp() + 600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: Method, uri: &str, role: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn seeded() -> (Harness, i64, i64) {
    let h = harness();
    let product = h.store.seed_product("Espresso beans", dec("4.00"));
    let lot = h.store.seed_lot(product, 5, dec("2"), day(1));
    h.store.seed_lot(product, 3, dec("3"), day(2));
    (h, product, lot)
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let (h, product, _) = seeded();

    let (status, body) = send(
        app(&h),
        request(
            Method::GET,
            &format!("/api/v1/products/{}/lots", product),
            None,
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_withdraw_over_http() {
    let (h, product, lot) = seeded();

    let (status, body) = send(
        app(&h),
        request(
            Method::POST,
            "/api/v1/withdrawals",
            Some("staff"),
            Some(json!({ "product_id": product, "quantity": 7, "kind": "sale" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["committed_quantity"], 7);
    assert_eq!(body["shortfall"], 0);
    assert_eq!(body["records"][0]["lot_id"], lot);
    assert_eq!(h.store.product(product).total_quantity, 1);
    assert_eq!(h.activity.entries()[0].actor, "maria");
}

#[tokio::test]
async fn test_negative_withdrawal_is_bad_request() {
    let (h, product, _) = seeded();

    let (status, body) = send(
        app(&h),
        request(
            Method::POST,
            "/api/v1/withdrawals",
            Some("staff"),
            Some(json!({ "product_id": product, "quantity": -2, "kind": "shrinkage" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "quantity");
    assert_eq!(h.store.lot_total(product), 8);
}

#[tokio::test]
async fn test_lot_adjustment_requires_admin() {
    let (h, product, lot) = seeded();
    let uri = format!("/api/v1/lots/{}/quantity", lot);

    let (status, _) = send(
        app(&h),
        request(
            Method::PUT,
            &uri,
            Some("staff"),
            Some(json!({ "new_quantity": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.store.lot(lot).remaining_quantity, 5);

    let (status, body) = send(
        app(&h),
        request(
            Method::PUT,
            &uri,
            Some("admin"),
            Some(json!({ "new_quantity": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delta"], -4);
    assert_eq!(h.store.product(product).total_quantity, 4);
}

#[tokio::test]
async fn test_receive_and_list_lots() {
    let (h, product, _) = seeded();

    let (status, body) = send(
        app(&h),
        request(
            Method::POST,
            &format!("/api/v1/products/{}/lots", product),
            Some("staff"),
            Some(json!({ "quantity": 4, "unit_cost": "2.50" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["total_quantity"], 12);

    let (status, body) = send(
        app(&h),
        request(
            Method::GET,
            &format!("/api/v1/products/{}/lots", product),
            Some("staff"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_reconciliation_repair_over_http() {
    let (h, product, _) = seeded();
    h.store.force_aggregate(product, 2);

    let (status, body) = send(
        app(&h),
        request(
            Method::GET,
            &format!("/api/v1/products/{}/reconciliation", product),
            Some("staff"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drift"], -6);
    assert_eq!(body["repaired"], false);

    let (status, body) = send(
        app(&h),
        request(
            Method::POST,
            &format!("/api/v1/products/{}/reconciliation", product),
            Some("admin"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repaired"], true);
    assert_eq!(h.store.product(product).total_quantity, 8);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let (h, _, _) = seeded();

    let (status, body) = send(
        app(&h),
        request(
            Method::POST,
            "/api/v1/withdrawals",
            Some("staff"),
            Some(json!({ "product_id": 999, "quantity": 1, "kind": "return" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
