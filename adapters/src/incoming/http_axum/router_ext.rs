use axum::{Router, middleware};
use axum_login::AuthManagerLayer;
use std::sync::Arc;
use tower_sessions::SessionStore;

use crate::incoming::http_axum::{
    auth::backend::AuthBackend,
    middleware::{
        rate_limit::{RateLimiter, rate_limit_middleware},
        request_id::request_id_middleware,
    },
};

pub trait RouterExt<State> {
    fn with_request_id(self) -> Self;
    fn with_auth<S>(self, layer: AuthManagerLayer<AuthBackend, S>) -> Self
    where
        S: SessionStore + Clone;
    /// Applies `limiter` only when one was configured.
    fn with_rate_limit(self, limiter: Option<Arc<RateLimiter>>) -> Self;
}

impl<State> RouterExt<State> for Router<State>
where
    State: Clone + Send + Sync + 'static,
{
    fn with_request_id(self) -> Self {
        self.layer(middleware::from_fn(request_id_middleware))
    }

    fn with_auth<S>(self, layer: AuthManagerLayer<AuthBackend, S>) -> Self
    where
        S: SessionStore + Clone,
    {
        self.layer(layer)
    }

    fn with_rate_limit(self, limiter: Option<Arc<RateLimiter>>) -> Self {
        let Some(limiter) = limiter else {
            return self;
        };

        self.layer(middleware::from_fn(move |req, next| {
            let limiter_clone = Arc::clone(&limiter);
            rate_limit_middleware(limiter_clone, req, next)
        }))
    }
}
