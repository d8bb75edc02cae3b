use std::sync::Arc;

use crate::error::AppResult;
use domain::auth::{UserCredentials, UserId, UserPublic};

#[async_trait::async_trait]
pub trait UserStorePort: Send + Sync {
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserPublic>;
    async fn find_credentials_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserPublic>>;
    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<UserPublic>>;
}

pub type DynUserStorePort = Arc<dyn UserStorePort>;
