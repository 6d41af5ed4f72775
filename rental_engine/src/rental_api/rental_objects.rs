use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Book, BookCopy, LedgerEntry, Money, Rental};

/// The result of a successful deposit-funded booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    pub rental: Rental,
    /// The RENTAL_CHARGE entry that paid for the rental.
    pub charge: LedgerEntry,
}

impl BookingReceipt {
    pub fn rental_id(&self) -> i64 {
        self.rental.id
    }

    pub fn balance_after(&self) -> Money {
        self.charge.balance_after
    }
}

/// A catalog entry together with the state of each of its copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub copies: Vec<BookCopy>,
}

/// The result of a successful invoice-funded booking. No money has moved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceBooking {
    pub rental_id: i64,
    pub copy_id: i64,
    pub invoice_id: String,
    pub payment_link: String,
    pub payment_due_at: DateTime<Utc>,
}

/// A pending wallet top-up, waiting for the user to pay the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopupInvoice {
    pub topup_id: i64,
    pub invoice_id: String,
    pub payment_link: String,
    pub expires_at: DateTime<Utc>,
}

/// The status of an invoice, as reported by the gateway. Only `Paid` drives a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Paid,
    Expired,
    Other(String),
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PAID" => Self::Paid,
            "EXPIRED" => Self::Expired,
            _ => Self::Other(s),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Paid => "PAID".to_string(),
            InvoiceStatus::Expired => "EXPIRED".to_string(),
            InvoiceStatus::Other(s) => s,
        }
    }
}

/// A decoded invoice status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEvent {
    #[serde(rename = "id")]
    pub invoice_id: String,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl InvoiceEvent {
    pub fn new<S: Into<String>>(invoice_id: S, status: InvoiceStatus) -> Self {
        Self { invoice_id: invoice_id.into(), status, external_id: None }
    }

    pub fn with_external_id<S: Into<String>>(mut self, external_id: S) -> Self {
        self.external_id = Some(external_id.into());
        self
    }
}

/// What settling an invoice event did. Every variant is an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The event was not a payment, so nothing changed.
    Ignored(InvoiceStatus),
    /// A pending top-up was marked paid and the wallet credited.
    TopupCredited { topup_id: i64, entry: LedgerEntry },
    /// A booked rental was paid for and activated.
    RentalActivated { rental: Rental, charge: LedgerEntry },
    /// The invoice had already been settled. Nothing changed.
    Duplicate,
}

impl SettlementOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}
