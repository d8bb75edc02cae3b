mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header::COOKIE};
use futures::future::join_all;
use serde_json::{Value, json};

use common::{balance, cookie_header, register, spawn_app};
use wornshot_adapters::outgoing::generation_reqwest::echo_generator::EchoImageGenerator;

fn app() -> common::TestApp {
    spawn_app(Arc::new(EchoImageGenerator))
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = app();

    let response = app.server.get("/api/credits").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "success": false, "error": "未登录" }));

    let response = app
        .server
        .post("/api/credits")
        .json(&json!({ "action": "deduct", "amount": 1 }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "success": false, "error": "未登录" }));
}

#[tokio::test]
async fn new_user_starts_with_six_credits() {
    let app = app();
    let cookie = register(&app.server, "first_user").await;

    let response = app
        .server
        .get("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "success": true, "credits": 6, "isSubscriber": false }));
}

#[tokio::test]
async fn deduct_and_add_report_the_new_balance() {
    let app = app();
    let cookie = register(&app.server, "spender").await;

    let response = app
        .server
        .post("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&json!({ "action": "deduct", "amount": 5 }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "success": true, "newBalance": 1 }));

    let response = app
        .server
        .post("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&json!({ "action": "add", "amount": 5 }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "success": true, "newBalance": 6 }));

    assert_eq!(balance(&app.server, &cookie).await, 6);
}

#[tokio::test]
async fn overdraft_is_rejected_without_changing_the_balance() {
    let app = app();
    let cookie = register(&app.server, "overdraft").await;

    let response = app
        .server
        .post("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .json(&json!({ "action": "deduct", "amount": 7 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "success": false, "error": "积分不足" }));
    assert_eq!(balance(&app.server, &cookie).await, 6);
}

#[tokio::test]
async fn malformed_mutations_get_contract_messages() {
    let app = app();
    let cookie = register(&app.server, "malformed").await;

    let cases = [
        (json!({ "amount": 1 }), "参数缺失"),
        (json!({ "action": "deduct" }), "参数缺失"),
        (json!({ "action": "bogus", "amount": 1 }), "无效操作"),
        (json!({ "action": 5, "amount": 1 }), "无效操作"),
        (json!({ "action": true, "amount": 1 }), "无效操作"),
        (json!({ "action": null, "amount": 1 }), "参数缺失"),
        (json!({ "action": "deduct", "amount": 0 }), "无效金额"),
        (json!({ "action": "add", "amount": -4 }), "无效金额"),
        (json!({ "action": "add", "amount": 2.5 }), "无效金额"),
    ];

    for (body, message) in cases {
        let response = app
            .server
            .post("/api/credits")
            .add_header(COOKIE, cookie_header(&cookie))
            .json(&body)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["error"], message, "body: {body}");
    }

    assert_eq!(balance(&app.server, &cookie).await, 6);
}

#[tokio::test]
async fn unreadable_body_counts_as_missing_parameters() {
    let app = app();
    let cookie = register(&app.server, "garbled").await;

    let response = app
        .server
        .post("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .text("action=deduct&amount=1")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "success": false, "error": "参数缺失" }));
}

#[tokio::test]
async fn concurrent_deductions_never_overdraw() {
    let app = app();
    let cookie = register(&app.server, "racer").await;

    let requests = (0..10).map(|_| {
        app.server
            .post("/api/credits")
            .add_header(COOKIE, cookie_header(&cookie))
            .json(&json!({ "action": "deduct", "amount": 1 }))
            .into_future()
    });
    let responses = join_all(requests).await;

    let succeeded = responses
        .iter()
        .filter(|response| response.status_code() == StatusCode::OK)
        .count();
    let rejected: Vec<Value> = responses
        .iter()
        .filter(|response| response.status_code() == StatusCode::BAD_REQUEST)
        .map(|response| response.json())
        .collect();

    assert_eq!(succeeded, 6);
    assert_eq!(rejected.len(), 4);
    assert!(rejected.iter().all(|body| body["error"] == "积分不足"));
    assert_eq!(balance(&app.server, &cookie).await, 0);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app();
    let cookie = register(&app.server, "leaving").await;

    app.server
        .post("/auth/logout")
        .add_header(COOKIE, cookie_header(&cookie))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get("/api/credits")
        .add_header(COOKIE, cookie_header(&cookie))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = app();
    register(&app.server, "forgetful").await;

    app.server
        .post("/auth/login")
        .json(&json!({ "email": "forgetful@example.com", "password": "not-the-password" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "forgetful@example.com", "password": common::PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["username"], "forgetful");
}
