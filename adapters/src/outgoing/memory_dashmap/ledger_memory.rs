use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use domain::auth::UserId;
use domain::credits::{CreditAmount, CreditError, CreditOutcome, Profile};
use domain::reservation::{Reservation, ReservationId, ReservationStatus};
use wornshot_application::{
    error::{AppError, AppResult},
    ports::outgoing::{
        profile_store::ProfileStorePort,
        reservation_store::{ReservationRefund, ReservationStorePort},
    },
};

/// Process-local ledger backing both the profile and reservation ports.
///
/// Each balance mutation runs under the dashmap shard lock of that user's
/// entry, which serialises concurrent deductions the same way the
/// conditional `UPDATE` does in Postgres. A reservation entry may stay locked
/// while its owner's profile is credited; a profile lock is never held while
/// the reservation map is touched.
///
/// Only pending reservations are kept. An entry is evicted as soon as it is
/// confirmed or refunded, so settled history lives only in Postgres.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    profiles: DashMap<UserId, Profile>,
    reservations: DashMap<ReservationId, Reservation>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn pending_reservation_count(&self) -> usize {
        self.reservations.len()
    }

    fn evict_settled(&self, id: &ReservationId) {
        self.reservations
            .remove_if(id, |_, reservation| reservation.status.is_settled());
    }
}

#[async_trait::async_trait]
impl ProfileStorePort for MemoryLedger {
    async fn get_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn create_profile(&self, user_id: &UserId, initial_credits: i32) -> AppResult<Profile> {
        let profile = self
            .profiles
            .entry(user_id.clone())
            .or_insert_with(|| {
                debug!(initial_credits, "Inserted new profile");
                Profile::new(user_id.clone(), initial_credits, OffsetDateTime::now_utc())
            })
            .value()
            .clone();
        Ok(profile)
    }

    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: CreditAmount,
    ) -> AppResult<CreditOutcome> {
        let Some(mut profile) = self.profiles.get_mut(user_id) else {
            return Ok(Err(CreditError::UserNotFound));
        };
        Ok(profile.deduct(amount, OffsetDateTime::now_utc()))
    }

    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    async fn add_credits(&self, user_id: &UserId, amount: CreditAmount) -> AppResult<CreditOutcome> {
        let Some(mut profile) = self.profiles.get_mut(user_id) else {
            return Ok(Err(CreditError::UserNotFound));
        };
        Ok(profile.add(amount, OffsetDateTime::now_utc()))
    }
}

#[async_trait::async_trait]
impl ReservationStorePort for MemoryLedger {
    #[instrument(skip(self, reservation), fields(reservation_id = %reservation.id))]
    async fn reserve(&self, reservation: &Reservation) -> AppResult<Result<i32, CreditError>> {
        let outcome = {
            let Some(mut profile) = self.profiles.get_mut(&reservation.user_id) else {
                return Ok(Err(CreditError::UserNotFound));
            };
            profile.deduct(reservation.amount, OffsetDateTime::now_utc())
        };

        if outcome.is_ok() {
            self.reservations
                .insert(reservation.id.clone(), reservation.clone());
        }
        Ok(outcome)
    }

    async fn confirm(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Reservation>> {
        let confirmed = {
            let Some(mut entry) = self.reservations.get_mut(id) else {
                return Ok(None);
            };
            entry
                .settle(ReservationStatus::Confirmed, now)
                .then(|| entry.value().clone())
        };

        if confirmed.is_some() {
            self.evict_settled(id);
        }
        Ok(confirmed)
    }

    #[instrument(skip(self), fields(reservation_id = %id))]
    async fn refund(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<ReservationRefund>> {
        let refund = {
            let Some(mut entry) = self.reservations.get_mut(id) else {
                return Ok(None);
            };
            if !entry.is_pending() {
                return Ok(None);
            }

            // Credit first: a rejected add leaves the reservation pending for a retry.
            let new_balance = {
                let mut profile = self
                    .profiles
                    .get_mut(&entry.user_id)
                    .ok_or(AppError::Credit(CreditError::UserNotFound))?;
                profile.add(entry.amount, now)?
            };

            entry.settle(ReservationStatus::Refunded, now);
            ReservationRefund {
                reservation: entry.value().clone(),
                new_balance,
            }
        };

        self.evict_settled(id);
        Ok(Some(refund))
    }

    async fn get_reservation(&self, id: &ReservationId) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.get(id).map(|r| r.value().clone()))
    }

    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: usize,
        exclude: &[ReservationId],
    ) -> AppResult<Vec<Reservation>> {
        let mut expired: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.is_expired(now) && !exclude.contains(&r.id))
            .map(|r| r.value().clone())
            .collect();
        expired.sort_by_key(|r| r.expires_at);
        expired.truncate(limit);
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use domain::generation::GenerationKind;

    fn amount(value: i32) -> CreditAmount {
        CreditAmount::new(value).unwrap()
    }

    #[tokio::test]
    async fn create_is_idempotent_and_keeps_first_balance() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();

        ledger.create_profile(&user, 6).await.unwrap();
        ledger.deduct_credits(&user, amount(2)).await.unwrap().unwrap();
        let again = ledger.create_profile(&user, 6).await.unwrap();

        assert_eq!(again.credits, 4);
        assert_eq!(ledger.profile_count(), 1);
    }

    #[tokio::test]
    async fn mutations_on_missing_profile_report_user_not_found() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();

        assert_eq!(
            ledger.deduct_credits(&user, amount(1)).await.unwrap(),
            Err(CreditError::UserNotFound)
        );
        assert_eq!(
            ledger.add_credits(&user, amount(1)).await.unwrap(),
            Err(CreditError::UserNotFound)
        );
        assert!(ledger.get_profile(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_reserve_stores_nothing() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.create_profile(&user, 3).await.unwrap();
        let reservation = Reservation::new(
            user.clone(),
            GenerationKind::MultiPose,
            amount(5),
            OffsetDateTime::now_utc(),
            Duration::minutes(10),
        );

        let outcome = ledger.reserve(&reservation).await.unwrap();

        assert!(matches!(outcome, Err(CreditError::InsufficientCredits { .. })));
        assert!(ledger.get_reservation(&reservation.id).await.unwrap().is_none());
        assert_eq!(ledger.get_profile(&user).await.unwrap().unwrap().credits, 3);
    }

    #[tokio::test]
    async fn refund_after_confirm_is_a_no_op() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.create_profile(&user, 6).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let reservation = Reservation::new(
            user.clone(),
            GenerationKind::MainImage,
            amount(1),
            now,
            Duration::minutes(10),
        );
        ledger.reserve(&reservation).await.unwrap().unwrap();

        assert!(ledger.confirm(&reservation.id, now).await.unwrap().is_some());
        assert!(ledger.refund(&reservation.id, now).await.unwrap().is_none());
        assert_eq!(ledger.get_profile(&user).await.unwrap().unwrap().credits, 5);
        assert_eq!(ledger.pending_reservation_count(), 0);
    }

    #[tokio::test]
    async fn refund_restores_balance_once() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.create_profile(&user, 6).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let reservation = Reservation::new(
            user.clone(),
            GenerationKind::MultiPose,
            amount(5),
            now,
            Duration::minutes(10),
        );
        ledger.reserve(&reservation).await.unwrap().unwrap();

        let refund = ledger.refund(&reservation.id, now).await.unwrap().unwrap();
        assert_eq!(refund.new_balance, 6);
        assert_eq!(refund.reservation.status, ReservationStatus::Refunded);
        assert!(ledger.refund(&reservation.id, now).await.unwrap().is_none());
        assert_eq!(ledger.get_profile(&user).await.unwrap().unwrap().credits, 6);
        assert_eq!(ledger.pending_reservation_count(), 0);
    }

    #[tokio::test]
    async fn rejected_refund_keeps_reservation_pending_for_retry() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.create_profile(&user, 6).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let reservation = Reservation::new(
            user.clone(),
            GenerationKind::MainImage,
            amount(1),
            now,
            Duration::minutes(10),
        );
        ledger.reserve(&reservation).await.unwrap().unwrap();
        let headroom = i32::MAX - 5;
        ledger.add_credits(&user, amount(headroom)).await.unwrap().unwrap();

        let refund = ledger.refund(&reservation.id, now).await;

        assert!(matches!(
            refund,
            Err(AppError::Credit(CreditError::BalanceOverflow))
        ));
        let stored = ledger.get_reservation(&reservation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);
        assert_eq!(stored.settled_at, None);
        assert_eq!(ledger.get_profile(&user).await.unwrap().unwrap().credits, i32::MAX);

        ledger.deduct_credits(&user, amount(10)).await.unwrap().unwrap();
        let retried = ledger.refund(&reservation.id, now).await.unwrap().unwrap();
        assert_eq!(retried.new_balance, i32::MAX - 9);
        assert_eq!(ledger.pending_reservation_count(), 0);
    }

    #[tokio::test]
    async fn settled_reservations_are_evicted() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.create_profile(&user, 6).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let pending = || {
            Reservation::new(
                user.clone(),
                GenerationKind::MainImage,
                amount(1),
                now,
                Duration::minutes(10),
            )
        };
        let kept = pending();
        let confirmed = pending();
        let refunded = pending();
        for reservation in [&kept, &confirmed, &refunded] {
            ledger.reserve(reservation).await.unwrap().unwrap();
        }
        assert_eq!(ledger.pending_reservation_count(), 3);

        ledger.confirm(&confirmed.id, now).await.unwrap().unwrap();
        ledger.refund(&refunded.id, now).await.unwrap().unwrap();

        assert_eq!(ledger.pending_reservation_count(), 1);
        assert!(ledger.get_reservation(&kept.id).await.unwrap().is_some());
        assert!(ledger.get_reservation(&confirmed.id).await.unwrap().is_none());
        let later = now + Duration::minutes(11);
        let expired = ledger.list_expired(later, 10, &[]).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, kept.id);
    }
}
