use std::sync::Arc;

use crate::error::AppResult;
use domain::auth::UserId;
use domain::credits::{CreditAmount, CreditOutcome, Profile};

/// The only sanctioned path for reading and mutating a credit balance.
///
/// Expected business outcomes (missing user, insufficient funds) come back in
/// the inner [`CreditOutcome`]; the outer `AppResult` is reserved for storage
/// faults and timeouts.
#[async_trait::async_trait]
pub trait ProfileStorePort: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>>;

    /// Inserts the row if absent and returns whatever row is stored afterwards.
    /// Safe to race: concurrent callers for the same user observe one row.
    async fn create_profile(&self, user_id: &UserId, initial_credits: i32) -> AppResult<Profile>;

    /// Decrements only if the balance covers `amount`, as a single atomic step.
    async fn deduct_credits(&self, user_id: &UserId, amount: CreditAmount)
    -> AppResult<CreditOutcome>;

    async fn add_credits(&self, user_id: &UserId, amount: CreditAmount) -> AppResult<CreditOutcome>;
}

pub type DynProfileStorePort = Arc<dyn ProfileStorePort>;
