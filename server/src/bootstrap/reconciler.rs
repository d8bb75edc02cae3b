use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use wornshot_application::infrastructure_config::Config;
use wornshot_application::ports::incoming::reservations::ReservationReconcileUseCase;

const JITTER_PERCENT: u8 = 10;

/// Periodically refunds pending reservations whose holder never settled them.
/// Storage errors are logged and retried on the next pass.
pub fn spawn_reservation_reconciler(
    reconciler: Arc<dyn ReservationReconcileUseCase + Send + Sync>,
    config: Arc<Config>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = config.reconcile_interval_with_jitter(JITTER_PERCENT);
            sleep(Duration::from_secs(wait)).await;
            run_pass(reconciler.as_ref()).await;
        }
    })
}

async fn run_pass(reconciler: &(dyn ReservationReconcileUseCase + Send + Sync)) {
    match reconciler.refund_expired(OffsetDateTime::now_utc()).await {
        Ok(report) if report.examined > 0 => info!(
            examined = report.examined,
            refunded = report.refunded,
            failed = report.failed,
            parked = report.parked,
            "Expired reservations reconciled"
        ),
        Ok(_) => debug!("No expired reservations"),
        Err(e) => error!(error = %e, "Reservation reconcile pass failed"),
    }
}
