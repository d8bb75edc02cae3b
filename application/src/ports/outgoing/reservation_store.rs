use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::AppResult;
use domain::credits::CreditError;
use domain::reservation::{Reservation, ReservationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRefund {
    pub reservation: Reservation,
    pub new_balance: i32,
}

#[async_trait::async_trait]
pub trait ReservationStorePort: Send + Sync {
    /// Deducts `reservation.amount` from the owner's balance and persists the
    /// pending reservation together. Nothing is written when the deduction is
    /// rejected.
    async fn reserve(
        &self,
        reservation: &Reservation,
    ) -> AppResult<Result<i32, CreditError>>;

    /// Marks a pending reservation confirmed. `None` if it was not pending.
    async fn confirm(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Reservation>>;

    /// Marks a pending reservation refunded and credits the amount back in
    /// the same step. `None` if it was not pending, so a reservation is never
    /// refunded twice.
    async fn refund(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<ReservationRefund>>;

    async fn get_reservation(&self, id: &ReservationId) -> AppResult<Option<Reservation>>;

    /// Pending reservations expired at `now`, oldest first, leaving out the
    /// ids in `exclude`.
    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: usize,
        exclude: &[ReservationId],
    ) -> AppResult<Vec<Reservation>>;
}

pub type DynReservationStorePort = Arc<dyn ReservationStorePort>;
