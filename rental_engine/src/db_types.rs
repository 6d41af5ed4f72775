//! Domain types shared by the store backends and the rental APIs.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
pub use rental_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------      CopyStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    /// The copy is on the shelf and may be claimed by a new rental.
    Available,
    /// The copy is held for a rental that has not been paid for yet.
    Booked,
    /// The copy is with a customer.
    Rented,
}

impl Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyStatus::Available => write!(f, "AVAILABLE"),
            CopyStatus::Booked => write!(f, "BOOKED"),
            CopyStatus::Rented => write!(f, "RENTED"),
        }
    }
}

impl FromStr for CopyStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "BOOKED" => Ok(Self::Booked),
            "RENTED" => Ok(Self::Rented),
            s => Err(ConversionError::new("copy status", s)),
        }
    }
}

//--------------------------------------     RentalStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    /// A copy is held, and payment is outstanding.
    Booked,
    /// Payment has been received, but the rental has not started.
    Paid,
    /// The customer has the copy.
    Active,
    /// The copy was brought back. Terminal.
    Returned,
    /// The booking lapsed without payment. Terminal.
    Canceled,
}

impl RentalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Returned | RentalStatus::Canceled)
    }
}

impl Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RentalStatus::Booked => write!(f, "BOOKED"),
            RentalStatus::Paid => write!(f, "PAID"),
            RentalStatus::Active => write!(f, "ACTIVE"),
            RentalStatus::Returned => write!(f, "RETURNED"),
            RentalStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

impl FromStr for RentalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(Self::Booked),
            "PAID" => Ok(Self::Paid),
            "ACTIVE" => Ok(Self::Active),
            "RETURNED" => Ok(Self::Returned),
            "CANCELED" => Ok(Self::Canceled),
            s => Err(ConversionError::new("rental status", s)),
        }
    }
}

//--------------------------------------      TopupStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopupStatus {
    Pending,
    Paid,
    Expired,
    Failed,
}

impl Display for TopupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopupStatus::Pending => write!(f, "PENDING"),
            TopupStatus::Paid => write!(f, "PAID"),
            TopupStatus::Expired => write!(f, "EXPIRED"),
            TopupStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for TopupStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "EXPIRED" => Ok(Self::Expired),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError::new("top-up status", s)),
        }
    }
}

//--------------------------------------    LedgerEntryType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    TopupConfirmed,
    RentalCharge,
    RentalRefund,
    Adjustment,
}

impl Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryType::TopupConfirmed => write!(f, "TOPUP_CONFIRMED"),
            LedgerEntryType::RentalCharge => write!(f, "RENTAL_CHARGE"),
            LedgerEntryType::RentalRefund => write!(f, "RENTAL_REFUND"),
            LedgerEntryType::Adjustment => write!(f, "ADJUSTMENT"),
        }
    }
}

impl FromStr for LedgerEntryType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOPUP_CONFIRMED" => Ok(Self::TopupConfirmed),
            "RENTAL_CHARGE" => Ok(Self::RentalCharge),
            "RENTAL_REFUND" => Ok(Self::RentalRefund),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            s => Err(ConversionError::new("ledger entry type", s)),
        }
    }
}

//--------------------------------------       LedgerRef      ---------------------------------------------------------
/// The record that caused a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRef {
    Rental(i64),
    Topup(i64),
    Adjustment,
}

impl LedgerRef {
    pub const RENTALS: &'static str = "rentals";
    pub const TOPUPS: &'static str = "wallet_topups";
    pub const ADJUSTMENTS: &'static str = "adjustments";

    pub fn table(&self) -> &'static str {
        match self {
            LedgerRef::Rental(_) => Self::RENTALS,
            LedgerRef::Topup(_) => Self::TOPUPS,
            LedgerRef::Adjustment => Self::ADJUSTMENTS,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            LedgerRef::Rental(id) | LedgerRef::Topup(id) => Some(*id),
            LedgerRef::Adjustment => None,
        }
    }

    pub fn from_parts(table: &str, id: Option<i64>) -> Result<Self, ConversionError> {
        match (table, id) {
            (Self::RENTALS, Some(id)) => Ok(Self::Rental(id)),
            (Self::TOPUPS, Some(id)) => Ok(Self::Topup(id)),
            (Self::ADJUSTMENTS, _) => Ok(Self::Adjustment),
            (t, id) => Err(ConversionError::new("ledger reference", &format!("{t}/{id:?}"))),
        }
    }
}

//--------------------------------------      HoldDuration    ---------------------------------------------------------
pub const MAX_HOLD_MINUTES: u32 = 1440;

#[derive(Debug, Clone, Error)]
#[error("A hold must be between 0 and {MAX_HOLD_MINUTES} minutes, but {0} was requested")]
pub struct HoldDurationError(pub u32);

/// How long a deposit-funded booking holds its copy. Zero means no hold deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldDuration(u32);

impl HoldDuration {
    pub fn try_from_minutes(minutes: u32) -> Result<Self, HoldDurationError> {
        if minutes > MAX_HOLD_MINUTES {
            return Err(HoldDurationError(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// The hold deadline counted from `now`, or `None` for a zero-length hold.
    pub fn deadline_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.0 > 0).then(|| now + Duration::minutes(i64::from(self.0)))
    }
}

//--------------------------------------          User        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    /// Cached projection of the ledger. The ledger is authoritative.
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(email: S, display_name: S) -> Self {
        Self { email: email.into(), display_name: display_name.into() }
    }
}

//--------------------------------------          Book        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub rental_cost: Money,
    /// Number of copies currently AVAILABLE. Always derived from the copies, never stored.
    pub available_copies: i64,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub category: String,
    pub rental_cost: Money,
}

impl NewBook {
    pub fn new<S: Into<String>>(name: S, category: S, rental_cost: Money) -> Self {
        Self { name: name.into(), category: category.into(), rental_cost }
    }
}

//--------------------------------------        BookCopy      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
    pub id: i64,
    pub book_id: i64,
    pub status: CopyStatus,
    pub booked_until: Option<DateTime<Utc>>,
}

//--------------------------------------         Rental       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub copy_id: i64,
    pub status: RentalStatus,
    /// The price at booking time. It never follows later catalog changes.
    pub rental_cost: Money,
    pub booked_at: DateTime<Utc>,
    pub payment_due_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub external_invoice_id: Option<String>,
    pub payment_link: Option<String>,
}

/// Funding details for a new rental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RentalFunding {
    /// Paid from the wallet deposit when the rental was booked.
    Deposit,
    /// To be paid through an external invoice.
    Invoice { invoice_id: String, payment_link: String },
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub user_id: i64,
    pub book_id: i64,
    pub copy_id: i64,
    pub rental_cost: Money,
    pub booked_at: DateTime<Utc>,
    pub payment_due_at: DateTime<Utc>,
    pub funding: RentalFunding,
}

impl NewRental {
    /// The status a rental is created in: deposit-funded rentals start out active, invoice-funded ones wait for
    /// settlement.
    pub fn initial_status(&self) -> RentalStatus {
        match self.funding {
            RentalFunding::Deposit => RentalStatus::Active,
            RentalFunding::Invoice { .. } => RentalStatus::Booked,
        }
    }

    pub fn invoice_id(&self) -> Option<&str> {
        match &self.funding {
            RentalFunding::Deposit => None,
            RentalFunding::Invoice { invoice_id, .. } => Some(invoice_id.as_str()),
        }
    }

    pub fn payment_link(&self) -> Option<&str> {
        match &self.funding {
            RentalFunding::Deposit => None,
            RentalFunding::Invoice { payment_link, .. } => Some(payment_link.as_str()),
        }
    }
}

//--------------------------------------      LedgerEntry     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub reference: LedgerRef,
    pub entry_type: LedgerEntryType,
    /// Signed change to the balance.
    pub amount: Money,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: i64,
    pub reference: LedgerRef,
    pub entry_type: LedgerEntryType,
    pub amount: Money,
    pub balance_after: Money,
}

//--------------------------------------      WalletTopup     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTopup {
    pub id: i64,
    pub user_id: i64,
    pub amount: Money,
    pub status: TopupStatus,
    pub external_invoice_id: String,
    pub payment_link: String,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTopup {
    pub user_id: i64,
    pub amount: Money,
    pub external_invoice_id: String,
    pub payment_link: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["BOOKED", "PAID", "ACTIVE", "RETURNED", "CANCELED"] {
            assert_eq!(s.parse::<RentalStatus>().unwrap().to_string(), s);
        }
        assert!("Active".parse::<RentalStatus>().is_err());
        assert_eq!("RENTED".parse::<CopyStatus>().unwrap(), CopyStatus::Rented);
        assert_eq!(LedgerEntryType::RentalCharge.to_string(), "RENTAL_CHARGE");
        assert!(RentalStatus::Canceled.is_terminal());
        assert!(!RentalStatus::Active.is_terminal());
    }

    #[test]
    fn hold_duration_bounds() {
        assert!(HoldDuration::try_from_minutes(0).is_ok());
        assert!(HoldDuration::try_from_minutes(1440).is_ok());
        assert!(HoldDuration::try_from_minutes(1441).is_err());
        let now = Utc::now();
        assert_eq!(HoldDuration::default().deadline_from(now), None);
        let hold = HoldDuration::try_from_minutes(30).unwrap();
        assert_eq!(hold.deadline_from(now), Some(now + Duration::minutes(30)));
    }

    #[test]
    fn ledger_references() {
        assert_eq!(LedgerRef::Rental(4).table(), "rentals");
        assert_eq!(LedgerRef::from_parts("wallet_topups", Some(9)).unwrap(), LedgerRef::Topup(9));
        assert_eq!(LedgerRef::from_parts("adjustments", None).unwrap(), LedgerRef::Adjustment);
        assert!(LedgerRef::from_parts("rentals", None).is_err());
    }
}
