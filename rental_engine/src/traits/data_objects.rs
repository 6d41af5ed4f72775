use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Rental, RentalStatus};

/// One line of a user's rental history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub rental_id: i64,
    pub book_id: i64,
    pub book_name: String,
    pub copy_id: i64,
    pub price: Money,
    pub status: RentalStatus,
    pub booked_at: DateTime<Utc>,
    pub payment_due_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

/// The outcome of one expiry sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Rentals that were moved from BOOKED to CANCELED.
    pub canceled: Vec<Rental>,
    /// Copies whose hold lapsed and that are AVAILABLE again.
    pub released_copies: Vec<i64>,
}

impl SweepResult {
    pub fn canceled_count(&self) -> usize {
        self.canceled.len()
    }

    pub fn released_count(&self) -> usize {
        self.released_copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canceled.is_empty() && self.released_copies.is_empty()
    }
}
