use axum::{
    Router,
    routing::{get, post},
};
use axum_login::AuthManagerLayerBuilder;
use tower_sessions::{SessionManagerLayer, SessionStore};
#[cfg(feature = "docs")]
use utoipa::OpenApi;
#[cfg(feature = "docs")]
use utoipa_swagger_ui::SwaggerUi;

use crate::incoming::http_axum::{
    auth::backend::AuthBackend,
    handlers::{
        auth::{login_handler, logout_handler, me_handler, register_handler},
        credits::{get_credits, post_credits},
        generation::{generate_main_image, generate_multi_pose},
        health::health_check,
    },
    middleware::rate_limit::{
        create_auth_rate_limiter, create_credits_rate_limiter, create_generation_rate_limiter,
    },
    router_ext::RouterExt,
};
use crate::shared::app_state::AppState;
use wornshot_application::ports::outgoing::{
    password_hasher::DynPasswordHasherPort, user_store::DynUserStorePort,
};

#[cfg(feature = "docs")]
use crate::incoming::http_axum::docs::ApiDoc;

/// Assembles every HTTP route. The session store is chosen by the caller so
/// the same router runs over redis in production and in memory in tests.
pub fn build_application_router<S>(
    state: &AppState,
    session_layer: SessionManagerLayer<S>,
    user_store: DynUserStorePort,
    password_hasher: DynPasswordHasherPort,
) -> Router<AppState>
where
    S: SessionStore + Clone,
{
    let auth_backend = AuthBackend::new(user_store, password_hasher);
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();

    let routes = build_core_routes()
        .merge(build_credit_routes(state))
        .merge(build_generation_routes(state))
        .merge(build_auth_routes(state));

    routes.with_auth(auth_layer).with_request_id()
}

fn build_core_routes() -> Router<AppState> {
    let router = Router::new().route("/health", get(health_check));

    #[cfg(feature = "docs")]
    {
        router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
    }

    #[cfg(not(feature = "docs"))]
    {
        router
    }
}

fn build_credit_routes(state: &AppState) -> Router<AppState> {
    let rate_limit = &state.config.rate_limit;

    Router::new()
        .route("/api/credits", get(get_credits).post(post_credits))
        .with_rate_limit(rate_limit.enabled.then(|| create_credits_rate_limiter(rate_limit)))
}

fn build_generation_routes(state: &AppState) -> Router<AppState> {
    let rate_limit = &state.config.rate_limit;

    Router::new()
        .route("/api/generate/main", post(generate_main_image))
        .route("/api/generate/multi-pose", post(generate_multi_pose))
        .with_rate_limit(rate_limit.enabled.then(|| create_generation_rate_limiter(rate_limit)))
}

fn build_auth_routes(state: &AppState) -> Router<AppState> {
    let rate_limit = &state.config.rate_limit;

    let rate_limited_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .with_rate_limit(rate_limit.enabled.then(|| create_auth_rate_limiter(rate_limit)));

    let other_routes = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler));

    rate_limited_routes.merge(other_routes)
}
