use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::password_validator::PasswordValidator;
use crate::error::{AppError, AppResult};
use crate::ports::incoming::auth::AuthUseCase;
use crate::ports::outgoing::password_hasher::PasswordHasherPort;
use crate::ports::outgoing::profile_store::DynProfileStorePort;
use crate::ports::outgoing::user_store::UserStorePort;
use domain::auth::{UserId, UserPublic};
use domain::credits::CreditPricing;

const INVALID_LOGIN: &str = "Invalid email or password";

pub struct AuthService {
    user_store: Arc<dyn UserStorePort>,
    password_hasher: Arc<dyn PasswordHasherPort>,
    profile_store: DynProfileStorePort,
    pricing: CreditPricing,
    password_validator: PasswordValidator,
}

impl AuthService {
    pub fn new(
        user_store: Arc<dyn UserStorePort>,
        password_hasher: Arc<dyn PasswordHasherPort>,
        profile_store: DynProfileStorePort,
        pricing: CreditPricing,
    ) -> Self {
        Self {
            user_store,
            password_hasher,
            profile_store,
            pricing,
            password_validator: PasswordValidator::new(),
        }
    }
}

#[async_trait::async_trait]
impl AuthUseCase for AuthService {
    #[instrument(skip(self, password), fields(username = %username))]
    async fn register_local(
        &self,
        email: String,
        username: String,
        password: String,
    ) -> AppResult<UserPublic> {
        self.password_validator.validate(&password)?;

        if (self.user_store.find_credentials_by_email(&email).await?).is_some() {
            return Err(AppError::ValidationError {
                message: "User with this email already exists".to_string(),
            });
        }
        if (self.user_store.find_user_by_username(&username).await?).is_some() {
            return Err(AppError::ValidationError {
                message: "Username already exists".to_string(),
            });
        }

        let password_hash = self.password_hasher.hash(&password)?;

        let user = self
            .user_store
            .create_user_with_password(&email, &username, &password_hash)
            .await?;

        // Lazy creation on first /api/credits access still covers the case
        // where this insert fails; the upsert makes a retry harmless.
        let profile = self
            .profile_store
            .create_profile(&user.id, self.pricing.initial_credits)
            .await
            .map_err(|e| AppError::ProfileCreationFailed {
                message: e.to_string(),
            })?;

        info!(user_id = %user.id, credits = profile.credits, "Registered user");

        Ok(user)
    }

    #[instrument(skip(self, password))]
    async fn login_local(&self, email: String, password: String) -> AppResult<UserPublic> {
        let credentials = self
            .user_store
            .find_credentials_by_email(&email)
            .await?
            .ok_or_else(|| AppError::ValidationError {
                message: INVALID_LOGIN.to_string(),
            })?;

        if !self
            .password_hasher
            .verify(&password, &credentials.password_hash)?
        {
            return Err(AppError::ValidationError {
                message: INVALID_LOGIN.to_string(),
            });
        }

        self.user_store
            .find_user_by_id(&credentials.id)
            .await?
            .ok_or(AppError::InternalServerError)
    }

    async fn me(&self, user_id: &UserId) -> AppResult<UserPublic> {
        self.user_store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                message: "User not found".to_string(),
            })
    }
}
