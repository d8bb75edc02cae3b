mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header::COOKIE};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{balance, cookie_header, register, spawn_app};
use wornshot_adapters::outgoing::generation_reqwest::http_generator::HttpImageGenerator;
use wornshot_application::infrastructure_config::{GenerationBackend, GenerationConfig};

const GENERATE_PATH: &str = "/v1/images/generate";

fn app_against(server: &MockServer) -> common::TestApp {
    let config = GenerationConfig {
        backend: GenerationBackend::Http,
        endpoint_url: format!("{}{GENERATE_PATH}", server.uri()),
        api_key: None,
        model: "garment-tryon-v1".to_string(),
        timeout_secs: 2,
        multi_pose_count: 3,
    };
    spawn_app(Arc::new(HttpImageGenerator::from_config(&config).unwrap()))
}

fn generate_body() -> Value {
    json!({
        "sceneId": "studio-white",
        "referenceImageUrl": "https://cdn.example.com/uploads/dress.png"
    })
}

#[tokio::test]
async fn main_image_charges_one_credit() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "image_url": "https://img.example.com/main.png" })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_against(&upstream);
    let cookie = register(&app.server, "photographer").await;

    let response = app
        .server
        .post("/api/generate/main")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&generate_body())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["creditsCharged"], 1);
    assert_eq!(body["newBalance"], 5);
    assert_eq!(body["images"][0]["url"], "https://img.example.com/main.png");
    assert_eq!(balance(&app.server, &cookie).await, 5);
}

#[tokio::test]
async fn upstream_failure_refunds_the_reservation() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    let app = app_against(&upstream);
    let cookie = register(&app.server, "unlucky").await;

    let response = app
        .server
        .post("/api/generate/multi-pose")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&generate_body())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    response.assert_json(&json!({ "success": false, "error": "生成失败，积分已退还" }));
    assert_eq!(balance(&app.server, &cookie).await, 6);
}

#[tokio::test]
async fn partial_pose_set_is_still_charged() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("three-quarter view"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "image_url": "https://img.example.com/pose.png" })),
        )
        .mount(&upstream)
        .await;

    let app = app_against(&upstream);
    let cookie = register(&app.server, "poser").await;

    let response = app
        .server
        .post("/api/generate/multi-pose")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&generate_body())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["images"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["creditsCharged"], 5);
    assert_eq!(body["newBalance"], 1);
}

#[tokio::test]
async fn insufficient_balance_never_reaches_the_model() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = app_against(&upstream);
    let cookie = register(&app.server, "broke").await;

    app.server
        .post("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&json!({ "action": "deduct", "amount": 2 }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/generate/multi-pose")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&generate_body())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "success": false, "error": "积分不足" }));
    assert_eq!(balance(&app.server, &cookie).await, 4);
}

#[tokio::test]
async fn missing_reference_image_is_a_bad_request() {
    let upstream = MockServer::start().await;
    let app = app_against(&upstream);
    let cookie = register(&app.server, "forgetful").await;

    let response = app
        .server
        .post("/api/generate/main")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&json!({ "sceneId": "beach" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "success": false, "error": "参数缺失" }));
    assert_eq!(balance(&app.server, &cookie).await, 6);
}

#[tokio::test]
async fn generation_requires_a_session() {
    let upstream = MockServer::start().await;
    let app = app_against(&upstream);

    let response = app
        .server
        .post("/api/generate/main")
        .json(&generate_body())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "success": false, "error": "未登录" }));
}
