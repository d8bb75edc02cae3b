use crate::error::AppResult;
use domain::auth::{UserId, UserPublic};

#[async_trait::async_trait]
pub trait AuthUseCase: Send + Sync {
    async fn register_local(
        &self,
        email: String,
        username: String,
        password: String,
    ) -> AppResult<UserPublic>;
    async fn login_local(&self, email: String, password: String) -> AppResult<UserPublic>;
    async fn me(&self, user_id: &UserId) -> AppResult<UserPublic>;
}
