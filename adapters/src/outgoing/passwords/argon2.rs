use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::Error as HashError,
};
use password_hash::{SaltString, rand_core::OsRng};
use tracing::warn;

use wornshot_application::error::{AppError, AppResult};
use wornshot_application::infrastructure_config::Argon2Config;
use wornshot_application::ports::outgoing::password_hasher::PasswordHasherPort;

pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn from_config(config: &Argon2Config) -> AppResult<Self> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(config.output_length.unwrap_or(32)),
        )
        .map_err(|e| AppError::ConfigError {
            message: format!("Invalid Argon2 parameters: {}", e),
        })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config_or_default(config: &Argon2Config) -> Self {
        Self::from_config(config).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to Argon2 default parameters");
            Self::new()
        })
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        if password.is_empty() {
            return Err(AppError::ValidationError {
                message: "Password cannot be empty".to_string(),
            });
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                warn!(error = %e, "Failed to hash password");
                AppError::InternalServerError
            })?;

        Ok(password_hash.to_string())
    }

    fn verify(&self, password: &str, password_hash: &str) -> AppResult<bool> {
        if password.is_empty() || password_hash.is_empty() {
            return Ok(false);
        }

        let parsed_hash =
            PasswordHash::new(password_hash).map_err(|e| AppError::ValidationError {
                message: format!("Invalid password hash format: {}", e),
            })?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AppError::ValidationError {
                message: format!("Password verification failed: {}", e),
            }),
        }
    }
}
