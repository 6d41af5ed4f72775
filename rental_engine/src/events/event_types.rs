use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerEntry, Rental, WalletTopup};

/// How a rental came to be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationSource {
    /// Paid from the wallet deposit at booking time.
    Deposit,
    /// Activated by a settlement callback for the rental's invoice.
    Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalActivatedEvent {
    pub rental: Rental,
    pub source: ActivationSource,
}

impl RentalActivatedEvent {
    pub fn new(rental: Rental, source: ActivationSource) -> Self {
        Self { rental, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalReturnedEvent {
    pub rental: Rental,
}

impl RentalReturnedEvent {
    pub fn new(rental: Rental) -> Self {
        Self { rental }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupCreditedEvent {
    pub topup: WalletTopup,
    pub entry: LedgerEntry,
}

impl TopupCreditedEvent {
    pub fn new(topup: WalletTopup, entry: LedgerEntry) -> Self {
        Self { topup, entry }
    }
}

/// Emitted by the sweeper for every unpaid booking it cancels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingExpiredEvent {
    pub rental: Rental,
}

impl BookingExpiredEvent {
    pub fn new(rental: Rental) -> Self {
        Self { rental }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    RentalActivated(RentalActivatedEvent),
    RentalReturned(RentalReturnedEvent),
    TopupCredited(TopupCreditedEvent),
    BookingExpired(BookingExpiredEvent),
}
