use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AppResult;
use crate::ports::incoming::reservations::{ReconcileReport, ReservationReconcileUseCase};
use crate::ports::outgoing::reservation_store::DynReservationStorePort;
use domain::reservation::ReservationId;

/// Longest back-off, in passes, for a reservation whose refund keeps failing.
const MAX_BACKOFF_PASSES: u64 = 64;

#[derive(Debug, Clone, Copy)]
struct Parked {
    failures: u32,
    retry_at_pass: u64,
}

#[derive(Debug, Default)]
struct RetryBook {
    pass: u64,
    parked: HashMap<ReservationId, Parked>,
}

/// Refunds reservations left pending past their expiry.
///
/// A reservation whose refund fails is parked for an exponentially growing
/// number of passes, so rows that fail every time do not hold the head of
/// each batch against newer expiries.
pub struct ReservationReconciler {
    reservation_store: DynReservationStorePort,
    batch_size: usize,
    retries: Mutex<RetryBook>,
}

impl ReservationReconciler {
    pub fn new(reservation_store: DynReservationStorePort, batch_size: usize) -> Self {
        Self {
            reservation_store,
            batch_size: batch_size.max(1),
            retries: Mutex::new(RetryBook::default()),
        }
    }

    fn book(&self) -> MutexGuard<'_, RetryBook> {
        self.retries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advances the pass counter and returns the ids still backing off.
    fn start_pass(&self) -> Vec<ReservationId> {
        let mut book = self.book();
        book.pass += 1;
        let pass = book.pass;
        book.parked
            .iter()
            .filter(|(_, parked)| parked.retry_at_pass > pass)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn record_failure(&self, id: &ReservationId) -> Parked {
        let mut book = self.book();
        let pass = book.pass;
        let entry = book.parked.entry(id.clone()).or_insert(Parked {
            failures: 0,
            retry_at_pass: pass,
        });
        entry.failures = entry.failures.saturating_add(1);
        let backoff = 1_u64
            .checked_shl(entry.failures)
            .unwrap_or(MAX_BACKOFF_PASSES)
            .min(MAX_BACKOFF_PASSES);
        entry.retry_at_pass = pass + backoff;
        *entry
    }

    fn forget(&self, id: &ReservationId) {
        self.book().parked.remove(id);
    }
}

#[async_trait::async_trait]
impl ReservationReconcileUseCase for ReservationReconciler {
    #[instrument(skip(self))]
    async fn refund_expired(&self, now: OffsetDateTime) -> AppResult<ReconcileReport> {
        let parked = self.start_pass();
        let expired = self
            .reservation_store
            .list_expired(now, self.batch_size, &parked)
            .await?;

        let mut report = ReconcileReport {
            examined: expired.len(),
            parked: parked.len(),
            ..ReconcileReport::default()
        };

        for reservation in expired {
            match self.reservation_store.refund(&reservation.id, now).await {
                Ok(Some(refund)) => {
                    self.forget(&reservation.id);
                    report.refunded += 1;
                    info!(
                        reservation_id = %reservation.id,
                        user_id = %reservation.user_id,
                        amount = reservation.amount.get(),
                        new_balance = refund.new_balance,
                        "Refunded expired reservation"
                    );
                }
                // Settled concurrently by the request that owns it.
                Ok(None) => {
                    self.forget(&reservation.id);
                    debug!(reservation_id = %reservation.id, "Reservation already settled");
                }
                Err(e) => {
                    report.failed += 1;
                    let backoff = self.record_failure(&reservation.id);
                    error!(reservation_id = %reservation.id, error = %e, "Failed to refund expired reservation");
                    if backoff.failures > 1 {
                        warn!(
                            reservation_id = %reservation.id,
                            failures = backoff.failures,
                            retry_at_pass = backoff.retry_at_pass,
                            "Parking reservation after repeated refund failures"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}
