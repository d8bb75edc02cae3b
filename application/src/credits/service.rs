use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::ports::incoming::credits::CreditsUseCase;
use crate::ports::outgoing::profile_store::DynProfileStorePort;
use domain::auth::UserId;
use domain::credits::{CreditAction, CreditAmount, CreditOutcome, CreditPricing, Profile};

pub struct CreditService {
    profile_store: DynProfileStorePort,
    pricing: CreditPricing,
}

impl CreditService {
    pub fn new(profile_store: DynProfileStorePort, pricing: CreditPricing) -> Self {
        Self {
            profile_store,
            pricing,
        }
    }
}

/// Returns the caller's profile, creating it with `initial_credits` on first
/// access. Shared by every entry point that charges credits.
pub(crate) async fn load_or_create_profile(
    profile_store: &DynProfileStorePort,
    user_id: &UserId,
    initial_credits: i32,
) -> AppResult<Profile> {
    if let Some(profile) = profile_store.get_profile(user_id).await? {
        return Ok(profile);
    }

    let profile = profile_store
        .create_profile(user_id, initial_credits)
        .await
        .map_err(|e| AppError::ProfileCreationFailed {
            message: e.to_string(),
        })?;

    info!(
        user_id = %user_id,
        credits = profile.credits,
        "Created credit profile on first access"
    );

    Ok(profile)
}

#[async_trait::async_trait]
impl CreditsUseCase for CreditService {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn ensure_profile(&self, user_id: &UserId) -> AppResult<Profile> {
        load_or_create_profile(&self.profile_store, user_id, self.pricing.initial_credits).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, action = %action, amount = %amount))]
    async fn apply(
        &self,
        user_id: &UserId,
        action: CreditAction,
        amount: CreditAmount,
    ) -> AppResult<CreditOutcome> {
        let outcome = match action {
            CreditAction::Deduct => self.profile_store.deduct_credits(user_id, amount).await?,
            CreditAction::Add => self.profile_store.add_credits(user_id, amount).await?,
        };

        match &outcome {
            Ok(new_balance) => debug!(new_balance, "Credit balance updated"),
            Err(reason) => warn!(?reason, "Credit mutation rejected"),
        }

        Ok(outcome)
    }
}
