use std::{collections::BTreeSet, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::CopyStatus,
    events::{BookingExpiredEvent, EventProducers},
    traits::{RentalStore, StoreError, StoreTransaction, SweepResult},
};

/// `ExpiryApi` releases copies that were booked but never paid for.
///
/// A sweep cancels every BOOKED rental whose payment deadline has passed, puts their copies back on the shelf, and
/// then releases any other copy whose hold has lapsed. Both steps run in one transaction, and running a sweep twice
/// in a row is harmless: the second finds nothing to do.
pub struct ExpiryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for ExpiryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExpiryApi ({:?})", self.db)
    }
}

impl<B> ExpiryApi<B>
where B: RentalStore
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub async fn release_expired_bookings(&self) -> Result<SweepResult, StoreError> {
        self.release_expired_bookings_at(Utc::now()).await
    }

    /// Runs a sweep as if the current time were `now`.
    pub async fn release_expired_bookings_at(&self, now: DateTime<Utc>) -> Result<SweepResult, StoreError> {
        let mut tx = self.db.begin().await?;
        let canceled = tx.cancel_overdue_rentals(now).await?;
        let mut released = BTreeSet::new();
        for rental in &canceled {
            tx.set_copy_status(rental.copy_id, CopyStatus::Available, None).await?;
            released.insert(rental.copy_id);
        }
        released.extend(tx.release_expired_holds(now).await?);
        tx.commit().await?;
        let result = SweepResult { canceled, released_copies: released.into_iter().collect() };
        if result.is_empty() {
            trace!("🕰️ Nothing to sweep");
        } else {
            info!(
                "🕰️ Canceled {} unpaid bookings and released {} copies",
                result.canceled_count(),
                result.released_count()
            );
        }
        for rental in &result.canceled {
            debug!("🕰️ Rental #{} (copy #{}) expired unpaid at {}", rental.id, rental.copy_id, rental.payment_due_at);
            self.producers.publish_booking_expired(BookingExpiredEvent::new(rental.clone())).await;
        }
        Ok(result)
    }
}
