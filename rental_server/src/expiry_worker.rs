use std::time::Duration;

use log::*;
use rental_engine::{db_types::Rental, traits::SweepResult, ExpiryApi, RentalStore, SqliteDatabase, StoreError};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(api: ExpiryApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Booking expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            // Failures are logged and the next tick tries again
            let _ = run_sweep(&api).await;
        }
    })
}

/// Runs a single sweep and logs the outcome.
pub async fn run_sweep<B: RentalStore>(api: &ExpiryApi<B>) -> Result<SweepResult, StoreError> {
    trace!("🕰️ Running booking expiry job");
    match api.release_expired_bookings().await {
        Ok(result) => {
            if result.is_empty() {
                trace!("🕰️ Nothing to expire");
            } else {
                debug!(
                    "🕰️ {} bookings canceled, {} copies released",
                    result.canceled_count(),
                    result.released_count()
                );
                debug!("🕰️ Canceled bookings: {}", rental_list(&result.canceled));
                debug!("🕰️ Released copies: {:?}", result.released_copies);
            }
            Ok(result)
        },
        Err(e) => {
            error!("🕰️ Error running booking expiry job: {e}");
            Err(e)
        },
    }
}

fn rental_list(rentals: &[Rental]) -> String {
    rentals
        .iter()
        .map(|r| format!("[{}] user: {} copy: {} due: {}", r.id, r.user_id, r.copy_id, r.payment_due_at))
        .collect::<Vec<String>>()
        .join(", ")
}
