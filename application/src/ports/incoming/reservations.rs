use time::OffsetDateTime;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub examined: usize,
    pub refunded: usize,
    pub failed: usize,
    /// Expired reservations skipped this pass after repeated refund failures.
    pub parked: usize,
}

#[async_trait::async_trait]
pub trait ReservationReconcileUseCase: Send + Sync {
    /// Refunds pending reservations whose expiry has passed.
    async fn refund_expired(&self, now: OffsetDateTime) -> AppResult<ReconcileReport>;
}
