use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    middleware,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bootstrap::state::AppState;
use wornshot_adapters::incoming::http_axum::{
    auth::session::{SessionConfig, create_memory_session_layer, create_redis_session_layer},
    middleware::rate_limit::{create_general_rate_limiter, rate_limit_middleware},
    routes::build_application_router,
};
use wornshot_adapters::shared::app_state::AppState as AdaptersAppState;
use wornshot_application::error::AppError;
use wornshot_application::infrastructure_config::SessionBackend;

pub async fn create_router(state: &AppState) -> Result<Router, AppError> {
    let (adapters_state, user_store, password_hasher) = state.to_adapters_state();
    let cors_layer = create_cors_layer(&adapters_state);

    let auth_config = &adapters_state.config.auth;
    let session_config = SessionConfig::new(auth_config.cookie_name.clone(), auth_config.cookie_secure);

    let application_router = match auth_config.session_backend {
        SessionBackend::Redis => {
            let session_layer =
                create_redis_session_layer(&adapters_state.config.redis.redis_url, &session_config)
                    .await?;
            build_application_router(&adapters_state, session_layer, user_store, password_hasher)
        }
        SessionBackend::Memory => build_application_router(
            &adapters_state,
            create_memory_session_layer(&session_config),
            user_store,
            password_hasher,
        ),
    };

    let router_with_rate_limiting = if adapters_state.config.rate_limit.enabled {
        let global_rate_limiter = create_general_rate_limiter(&adapters_state.config.rate_limit);
        application_router.layer(middleware::from_fn(move |req, next| {
            let limiter = Arc::clone(&global_rate_limiter);
            rate_limit_middleware(limiter, req, next)
        }))
    } else {
        application_router
    };

    Ok(router_with_rate_limiting
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(adapters_state))
}

fn create_cors_layer(state: &AdaptersAppState) -> CorsLayer {
    let base_cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .allow_credentials(true);

    match &state.config.server.cors_origin {
        Some(origin) => base_cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173")),
        ),
        None => base_cors.allow_origin(HeaderValue::from_static("http://localhost:5173")),
    }
}
