use axum_login::{AuthUser, AuthnBackend, UserId as AxumUserId};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use domain::auth::{UserId, UserPublic};
use wornshot_application::error::AppError;
use wornshot_application::ports::outgoing::{
    password_hasher::DynPasswordHasherPort, user_store::DynUserStorePort,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

impl User {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.id)
    }
}

impl From<UserPublic> for User {
    fn from(user_public: UserPublic) -> Self {
        Self {
            id: *user_public.id.as_uuid(),
            email: user_public.email,
            username: user_public.username,
        }
    }
}

impl AuthUser for User {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.email.as_bytes()
    }
}

#[derive(Clone)]
pub struct AuthBackend {
    user_store: DynUserStorePort,
    password_hasher: DynPasswordHasherPort,
}

impl AuthBackend {
    pub fn new(user_store: DynUserStorePort, password_hasher: DynPasswordHasherPort) -> Self {
        Self {
            user_store,
            password_hasher,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl AuthnBackend for AuthBackend {
    type User = User;
    type Credentials = Credentials;
    type Error = AppError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(stored) = self
            .user_store
            .find_credentials_by_email(&creds.email)
            .await?
        else {
            return Ok(None);
        };

        let password_valid = self
            .password_hasher
            .verify(&creds.password, &stored.password_hash)
            .map_err(|e| {
                warn!(error = %e, "Stored password hash could not be verified");
                AppError::InternalServerError
            })?;

        if !password_valid {
            return Ok(None);
        }

        Ok(self
            .user_store
            .find_user_by_id(&stored.id)
            .await?
            .map(User::from))
    }

    async fn get_user(
        &self,
        user_id: &AxumUserId<Self>,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user = self
            .user_store
            .find_user_by_id(&UserId::from_uuid(*user_id))
            .await?;

        Ok(user.map(User::from))
    }
}
