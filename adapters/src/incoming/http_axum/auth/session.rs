use tower_sessions::{MemoryStore, SessionManagerLayer, SessionStore, cookie::SameSite};
use tower_sessions_redis_store::{RedisStore, fred::prelude::*};
use tracing::info;

use wornshot_application::error::AppError;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
    pub same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            secure: false,
            same_site: "Lax".to_string(),
        }
    }
}

impl SessionConfig {
    /// Cross-site cookies are only sent with `SameSite=None`, which browsers
    /// accept on secure cookies alone.
    pub fn new(cookie_name: String, secure: bool) -> Self {
        Self {
            cookie_name,
            secure,
            same_site: if secure { "None" } else { "Lax" }.to_string(),
        }
    }
}

fn configure<S>(store: S, session_config: &SessionConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    let same_site = match session_config.same_site.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    };

    SessionManagerLayer::new(store)
        .with_name(session_config.cookie_name.clone())
        .with_same_site(same_site)
        .with_secure(session_config.secure)
        .with_http_only(true)
}

pub async fn create_redis_session_layer(
    redis_url: &str,
    session_config: &SessionConfig,
) -> Result<SessionManagerLayer<RedisStore<Client>>, AppError> {
    let redis_config = Config::from_url(redis_url).map_err(|e| AppError::ConfigError {
        message: format!("Invalid redis_url: {e}"),
    })?;

    let redis_client = Client::new(redis_config, None, None, None);
    redis_client.connect();
    redis_client
        .wait_for_connect()
        .await
        .map_err(|e| AppError::ExternalServiceError {
            message: format!("Failed to connect to redis session store: {e}"),
        })?;

    info!("Session store: redis");
    Ok(configure(RedisStore::new(redis_client), session_config))
}

pub fn create_memory_session_layer(session_config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    info!("Session store: in-memory");
    configure(MemoryStore::default(), session_config)
}
