//! HTTP surface tests over the assembled router: operator auth, the config
//! admin endpoints, and the SOAP endpoint's always-200 contract.

mod support;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use qbwc_bridge::config::AppConfig;
use qbwc_bridge::server::{AppState, create_app};

use support::test_db;

const TOKEN: &str = "operator-token";

async fn test_app() -> axum::Router {
    let config = Arc::new(AppConfig {
        operator_tokens: vec![TOKEN.to_string()],
        ..Default::default()
    });
    let db = test_db().await;
    create_app(AppState::new(config, db))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request.header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn admin_api_requires_a_bearer_token() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sync/statistics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn config_roundtrip_never_exposes_the_password() {
    let app = test_app().await;

    let put = authed(Request::builder().method("PUT").uri("/api/config"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "sync_enabled": true,
                "sync_sales": true,
                "sync_inventory": false,
                "qbwc_username": "qbwc",
                "qbwc_password": "hunter2",
                "company_file": "C:\\POS\\hotel.qbw"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get = authed(Request::builder().uri("/api/config"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let config = body_json(response).await;
    assert_eq!(config["qbwc_username"], "qbwc");
    assert_eq!(config["sync_inventory"], false);
    assert_eq!(config["connection_status"], "never_connected");
    assert!(config.get("qbwc_password").is_none());
    assert!(config.get("qbwc_password_hash").is_none());
}

#[tokio::test]
async fn first_configuration_requires_a_password() {
    let app = test_app().await;

    let put = authed(Request::builder().method("PUT").uri("/api/config"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "sync_enabled": true,
                "sync_sales": true,
                "sync_inventory": true,
                "qbwc_username": "qbwc"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_bridge_reads_as_not_found() {
    let app = test_app().await;
    let get = authed(Request::builder().uri("/api/config"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_mapping_roundtrip() {
    let app = test_app().await;
    let item_id = uuid::Uuid::new_v4();

    let post = authed(Request::builder().method("POST").uri("/api/mappings/items"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "hotel_item_id": item_id,
                "hotel_item_type": "menu_item",
                "qb_list_id": "80000001-2",
                "qb_full_name": "Food:Tea",
                "sync_inventory": true
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(post).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = authed(Request::builder().uri("/api/mappings/items"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(list).await.unwrap();
    let mappings = body_json(response).await;
    assert_eq!(mappings.as_array().unwrap().len(), 1);
    assert_eq!(mappings[0]["qb_full_name"], "Food:Tea");
    assert_eq!(mappings[0]["sync_inventory"], true);
}

#[tokio::test]
async fn soap_endpoint_answers_server_version_in_xml() {
    let app = test_app().await;

    let envelope = "<?xml version=\"1.0\"?>\
        <soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
        <soap:Body><serverVersion xmlns=\"http://developer.intuit.com/\"/>\
        </soap:Body></soap:Envelope>";

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/qbwc")
                .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(Body::from(envelope))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/xml")
    );

    let body = body_string(response).await;
    assert!(body.contains("serverVersionResponse"));
    assert!(body.contains("serverVersionResult"));
}

#[tokio::test]
async fn unparseable_soap_body_is_answered_with_a_fault_not_an_http_error() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/qbwc")
                .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(Body::from("this is not xml at all <"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("soap:Fault"));
    assert!(body.contains("soap:Client"));
}
