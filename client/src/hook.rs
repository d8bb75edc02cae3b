use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::CreditsClient;
use crate::error::ClientResult;

/// Last balance seen by this client. `credits` is `None` until the first
/// successful read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditState {
    pub credits: Option<i32>,
    pub is_subscriber: bool,
    pub loading: bool,
}

/// Publishes the caller's balance to subscribers and routes every mutation
/// through the server. Never decides affordability locally.
#[derive(Debug)]
pub struct CreditHook {
    client: CreditsClient,
    state: watch::Sender<CreditState>,
}

impl CreditHook {
    pub fn new(client: CreditsClient) -> Self {
        let (state, _) = watch::channel(CreditState::default());
        Self { client, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CreditState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> CreditState {
        *self.state.borrow()
    }

    pub fn client(&self) -> &CreditsClient {
        &self.client
    }

    /// Re-reads the balance. On failure the previous balance stays published.
    pub async fn refresh(&self) -> ClientResult<CreditState> {
        self.state.send_modify(|state| state.loading = true);

        let result = self.client.balance().await;
        self.state.send_modify(|state| {
            state.loading = false;
            if let Ok(balance) = &result {
                state.credits = Some(balance.credits);
                state.is_subscriber = balance.is_subscriber;
            }
        });

        result.map(|_| self.current())
    }

    /// Deducts on the server, then refreshes. Errors carry the server's
    /// message unchanged.
    pub async fn deduct_credit(&self, amount: i32) -> ClientResult<i32> {
        let new_balance = self.client.deduct(amount).await?;
        debug!(amount, new_balance, "Deducted credits");
        self.converge(new_balance).await;
        Ok(new_balance)
    }

    /// Gives credits back after a failed client-driven generation.
    pub async fn refund_credit(&self, amount: i32) -> ClientResult<i32> {
        let new_balance = self.client.add(amount).await?;
        debug!(amount, new_balance, "Refunded credits");
        self.converge(new_balance).await;
        Ok(new_balance)
    }

    async fn converge(&self, new_balance: i32) {
        self.state.send_modify(|state| state.credits = Some(new_balance));
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Balance refresh after mutation failed");
        }
    }
}
