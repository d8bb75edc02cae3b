use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, AppResult};
use domain::credits::{DEFAULT_INITIAL_CREDITS, DEFAULT_MAIN_IMAGE_COST, DEFAULT_MULTI_POSE_COST};
use domain::generation::POSE_DIRECTIONS;

const REDACTED: &str = "[REDACTED]";
const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/wornshot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub credits: CreditConfig,
    pub generation: GenerationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub environment: EnvironmentConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_backend: SessionBackend,
    pub argon2: Argon2Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Config {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionBackend {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "redis")]
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "postgres")]
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: SecretString,
    pub pool_size: u32,
    pub run_migrations: bool,
}

impl Serialize for DbConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbConfig", 3)?;
        state.serialize_field("database_url", REDACTED)?;
        state.serialize_field("pool_size", &self.pool_size)?;
        state.serialize_field("run_migrations", &self.run_migrations)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for DbConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct DbConfigHelper {
            database_url: String,
            pool_size: u32,
            #[serde(default = "default_run_migrations")]
            run_migrations: bool,
        }

        let helper = DbConfigHelper::deserialize(deserializer)?;
        // defaults are layered in through `Serialize`, which redacts the url
        let database_url = if helper.database_url == REDACTED {
            DEFAULT_DATABASE_URL.to_string()
        } else {
            helper.database_url
        };
        Ok(DbConfig {
            database_url: SecretString::from(database_url),
            pool_size: helper.pool_size,
            run_migrations: helper.run_migrations,
        })
    }
}

fn default_run_migrations() -> bool {
    true
}

impl DbConfig {
    #[must_use]
    pub fn redacted_url(&self) -> String {
        redact_url(self.database_url.expose_secret())
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}

fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                url.set_password(Some("***")).ok();
            }
            url.to_string()
        }
        Err(_) => "[INVALID_URL]".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub redis_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    pub initial_credits: i32,
    pub main_image_cost: i32,
    pub multi_pose_cost: i32,
    pub operation_timeout_secs: u64,
    pub reservation_ttl_secs: u64,
    pub reconcile_interval_secs: u64,
    pub reconcile_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GenerationBackend {
    #[serde(rename = "echo")]
    Echo,
    #[serde(rename = "http")]
    Http,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub backend: GenerationBackend,
    pub endpoint_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
    pub multi_pose_count: usize,
}

impl Serialize for GenerationConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("GenerationConfig", 6)?;
        state.serialize_field("backend", &self.backend)?;
        state.serialize_field("endpoint_url", &self.endpoint_url)?;
        state.serialize_field("api_key", &self.api_key.as_ref().map(|_| REDACTED))?;
        state.serialize_field("model", &self.model)?;
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.serialize_field("multi_pose_count", &self.multi_pose_count)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for GenerationConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct GenerationConfigHelper {
            backend: GenerationBackend,
            endpoint_url: String,
            api_key: Option<String>,
            model: String,
            timeout_secs: u64,
            multi_pose_count: usize,
        }

        let helper = GenerationConfigHelper::deserialize(deserializer)?;
        Ok(GenerationConfig {
            backend: helper.backend,
            endpoint_url: helper.endpoint_url,
            // the redacted placeholder written by `Serialize` is not a real key
            api_key: helper
                .api_key
                .filter(|key| !key.is_empty() && key != REDACTED)
                .map(SecretString::from),
            model: helper.model,
            timeout_secs: helper.timeout_secs,
            multi_pose_count: helper.multi_pose_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub credits_requests_per_minute: u32,
    pub generation_requests_per_minute: u32,
    pub auth_requests_per_minute: u32,
    pub global_requests_per_minute: u32,
    pub burst_size_multiplier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
            output_length: Some(32),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            cookie_secure: false,
            session_backend: SessionBackend::Memory,
            argon2: Argon2Config::default(),
        }
    }
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            initial_credits: DEFAULT_INITIAL_CREDITS,
            main_image_cost: DEFAULT_MAIN_IMAGE_COST,
            multi_pose_cost: DEFAULT_MULTI_POSE_COST,
            operation_timeout_secs: 5,
            reservation_ttl_secs: 600,
            reconcile_interval_secs: 60,
            reconcile_batch_size: 100,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::Echo,
            endpoint_url: "http://localhost:8080/v1/images/generate".to_string(),
            api_key: None,
            model: "garment-tryon-v1".to_string(),
            timeout_secs: 120,
            multi_pose_count: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origin: None,
            },
            db: DbConfig {
                database_url: SecretString::from(DEFAULT_DATABASE_URL),
                pool_size: 10,
                run_migrations: true,
            },
            redis: RedisConfig {
                redis_url: "redis://localhost:6379".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            credits: CreditConfig::default(),
            generation: GenerationConfig::default(),
            rate_limit: RateLimitConfig {
                enabled: true,
                credits_requests_per_minute: 120,
                generation_requests_per_minute: 20,
                auth_requests_per_minute: 30,
                global_requests_per_minute: 1000,
                burst_size_multiplier: 2,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: false,
            },
            environment: EnvironmentConfig {
                env: "development".to_string(),
            },
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::too_many_lines)]
    pub fn validate(&self) -> AppResult<()> {
        if self.storage.backend == StorageBackend::Postgres {
            if self.db.database_url.expose_secret().is_empty() {
                return Err(AppError::ConfigError {
                    message: "database_url cannot be empty".to_string(),
                });
            }

            if self.db.pool_size == 0 {
                return Err(AppError::ConfigError {
                    message: "db pool_size must be greater than 0".to_string(),
                });
            }
        }

        if self.auth.session_backend == SessionBackend::Redis && self.redis.redis_url.is_empty() {
            return Err(AppError::ConfigError {
                message: "redis_url cannot be empty when sessions are stored in redis"
                    .to_string(),
            });
        }

        if self.credits.initial_credits < 0 {
            return Err(AppError::ConfigError {
                message: "initial_credits must be greater than or equal to 0".to_string(),
            });
        }

        if self.credits.main_image_cost <= 0 || self.credits.multi_pose_cost <= 0 {
            return Err(AppError::ConfigError {
                message: "generation costs must be greater than 0".to_string(),
            });
        }

        if self.credits.operation_timeout_secs == 0 {
            return Err(AppError::ConfigError {
                message: "operation_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.credits.reservation_ttl_secs == 0 {
            return Err(AppError::ConfigError {
                message: "reservation_ttl_secs must be greater than 0".to_string(),
            });
        }

        if self.credits.reconcile_interval_secs == 0 || self.credits.reconcile_batch_size == 0 {
            return Err(AppError::ConfigError {
                message: "reconcile interval and batch size must be greater than 0".to_string(),
            });
        }

        if self.generation.timeout_secs == 0 {
            return Err(AppError::ConfigError {
                message: "generation timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.generation.multi_pose_count == 0
            || self.generation.multi_pose_count > POSE_DIRECTIONS.len()
        {
            return Err(AppError::ConfigError {
                message: format!(
                    "multi_pose_count must be between 1 and {}",
                    POSE_DIRECTIONS.len()
                ),
            });
        }

        if matches!(self.generation.backend, GenerationBackend::Http) {
            Url::parse(&self.generation.endpoint_url).map_err(|e| AppError::ConfigError {
                message: format!("generation endpoint_url is not a valid URL: {e}"),
            })?;
        }

        if self.rate_limit.enabled {
            if self.rate_limit.credits_requests_per_minute == 0
                || self.rate_limit.generation_requests_per_minute == 0
                || self.rate_limit.auth_requests_per_minute == 0
                || self.rate_limit.global_requests_per_minute == 0
            {
                return Err(AppError::ConfigError {
                    message: "Rate limit values must be greater than 0 when enabled".to_string(),
                });
            }

            if self.rate_limit.burst_size_multiplier == 0 {
                return Err(AppError::ConfigError {
                    message: "burst_size_multiplier must be greater than 0".to_string(),
                });
            }
        }

        if self.auth.argon2.memory_cost < 1024 {
            return Err(AppError::ConfigError {
                message: "Argon2 memory_cost must be at least 1024 KiB".to_string(),
            });
        }

        if self.auth.argon2.time_cost == 0 {
            return Err(AppError::ConfigError {
                message: "Argon2 time_cost must be greater than 0".to_string(),
            });
        }

        if self.auth.argon2.parallelism == 0 {
            return Err(AppError::ConfigError {
                message: "Argon2 parallelism must be greater than 0".to_string(),
            });
        }

        if let Some(output_len) = self.auth.argon2.output_length {
            if !(16..=512).contains(&output_len) {
                return Err(AppError::ConfigError {
                    message: "Argon2 output_length must be between 16 and 512 bytes".to_string(),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reconcile period with +-`jitter_percent` applied so replicas started
    /// together do not sweep in lockstep.
    #[must_use]
    pub fn reconcile_interval_with_jitter(&self, jitter_percent: u8) -> u64 {
        use rand::Rng;

        let base_seconds = self.credits.reconcile_interval_secs;
        let spread = f64::from(jitter_percent.min(100)) / 100.0;

        let mut rng = rand::rng();
        let jitter_factor = rng.random_range((1.0 - spread)..=(1.0 + spread));

        #[allow(clippy::cast_precision_loss)]
        let result = (base_seconds as f64 * jitter_factor).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let result_u64 = result as u64;
        result_u64.max(1)
    }
}
