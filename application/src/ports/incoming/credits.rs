use crate::error::AppResult;
use domain::auth::UserId;
use domain::credits::{CreditAction, CreditAmount, CreditOutcome, Profile};

#[async_trait::async_trait]
pub trait CreditsUseCase: Send + Sync {
    /// Returns the caller's profile, creating it with the initial balance on
    /// first access.
    async fn ensure_profile(&self, user_id: &UserId) -> AppResult<Profile>;

    async fn apply(
        &self,
        user_id: &UserId,
        action: CreditAction,
        amount: CreditAmount,
    ) -> AppResult<CreditOutcome>;
}
