#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header::COOKIE, header::SET_COOKIE};
use axum_test::TestServer;
use serde_json::{Value, json};

use wornshot_adapters::{
    incoming::http_axum::{
        auth::session::{SessionConfig, create_memory_session_layer},
        routes::build_application_router,
    },
    outgoing::{
        memory_dashmap::{ledger_memory::MemoryLedger, user_store_memory::MemoryUserStore},
        passwords::argon2::Argon2PasswordHasher,
    },
    shared::app_state::AppState,
};
use wornshot_application::{
    auth::service::AuthService,
    config::CreditSettings,
    credits::service::CreditService,
    generation::service::GenerationService,
    infrastructure_config::{Config, StorageBackend},
    ports::outgoing::{
        image_generation::DynImageGenerationPort, password_hasher::DynPasswordHasherPort,
        profile_store::DynProfileStorePort, reservation_store::DynReservationStorePort,
        user_store::DynUserStorePort,
    },
};

pub const PASSWORD: &str = "correct-horse-battery-staple-42";

pub struct TestApp {
    pub server: TestServer,
    pub ledger: Arc<MemoryLedger>,
}

/// Full router over in-memory stores and sessions, rate limiting off.
pub fn spawn_app(generator: DynImageGenerationPort) -> TestApp {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.rate_limit.enabled = false;
    let settings = CreditSettings::from_config(&config).unwrap();

    let ledger = Arc::new(MemoryLedger::new());
    let profiles: DynProfileStorePort = Arc::clone(&ledger) as DynProfileStorePort;
    let reservations: DynReservationStorePort = Arc::clone(&ledger) as DynReservationStorePort;
    let users: DynUserStorePort = Arc::new(MemoryUserStore::new());
    let hasher: DynPasswordHasherPort = Arc::new(Argon2PasswordHasher::new());

    let state = AppState::new(
        Arc::new(config),
        Arc::new(CreditService::new(Arc::clone(&profiles), settings.pricing)),
        Arc::new(GenerationService::new(
            Arc::clone(&profiles),
            reservations,
            generator,
            settings.clone(),
        )),
        Arc::new(AuthService::new(
            Arc::clone(&users),
            Arc::clone(&hasher),
            profiles,
            settings.pricing,
        )),
    );

    let session_layer = create_memory_session_layer(&SessionConfig::default());
    let router = build_application_router(&state, session_layer, users, hasher).with_state(state);

    TestApp {
        server: TestServer::new(router).unwrap(),
        ledger,
    }
}

/// Registers a fresh account and returns its session cookie.
pub async fn register(server: &TestServer, username: &str) -> HeaderValue {
    let response = server
        .post("/auth/register")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response
        .headers()
        .get(SET_COOKIE)
        .cloned()
        .expect("register should set a session cookie")
}

pub async fn balance(server: &TestServer, cookie: &HeaderValue) -> i64 {
    let response = server
        .get("/api/credits")
        .add_header(COOKIE, cookie_header(cookie))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["credits"].as_i64().unwrap()
}

/// `Cookie` request header carrying the `name=value` part of a `Set-Cookie`.
pub fn cookie_header(set_cookie: &HeaderValue) -> HeaderValue {
    let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
    HeaderValue::from_str(pair).unwrap()
}
