use std::fmt::Display;

use thiserror::Error;

use crate::{
    db_types::{HoldDurationError, Money},
    traits::{GatewayError, StoreError},
};

/// The closed set of failure kinds that callers map to client-visible outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    PaymentRequired,
    BadInput,
    /// A settlement event for an invoice this system never issued.
    Unmapped,
    /// A settlement event that could not be decoded.
    Malformed,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::PaymentRequired => "PaymentRequired",
            ErrorKind::BadInput => "BadInput",
            ErrorKind::Unmapped => "Unmapped",
            ErrorKind::Malformed => "Malformed",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum BookingError {
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Book #{0} does not exist")]
    BookNotFound(i64),
    #[error("Insufficient funds. The rental costs {price}, but the balance is {balance}. {deficit} more is required.")]
    InsufficientFunds { balance: Money, price: Money, deficit: Money },
    #[error("There are no copies of book #{0} available")]
    NoStock(i64),
    #[error("{0}")]
    InvalidHold(#[from] HoldDurationError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::BookNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::PaymentRequired,
            Self::NoStock(_) => ErrorKind::Conflict,
            Self::InvalidHold(_) => ErrorKind::BadInput,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum InvoiceBookingError {
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Book #{0} does not exist")]
    BookNotFound(i64),
    #[error("There are no copies of book #{0} available")]
    NoStock(i64),
    #[error("Could not create a payment invoice. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl InvoiceBookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::BookNotFound(_) => ErrorKind::NotFound,
            Self::NoStock(_) => ErrorKind::Conflict,
            Self::GatewayError(_) | Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for InvoiceBookingError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReturnError {
    #[error("Rental #{0} does not exist")]
    NotFound(i64),
    #[error("Rental #{rental_id} does not belong to user #{user_id}")]
    NotOwner { rental_id: i64, user_id: i64 },
    #[error("Rental #{0} is not active")]
    NotActive(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ReturnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotOwner { .. } => ErrorKind::Forbidden,
            Self::NotActive(_) => ErrorKind::Conflict,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ReturnError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("The callback could not be verified")]
    InvalidCallback,
    #[error("Malformed settlement event. {0}")]
    MalformedEvent(String),
    #[error("Invoice {0} was not issued by this system")]
    UnmappedInvoice(String),
    #[error("Insufficient funds to settle rental #{rental_id}. It costs {price}, but the balance is {balance}.")]
    InsufficientFunds { rental_id: i64, balance: Money, price: Money, deficit: Money },
    #[error("Rental #{0} was canceled before its payment arrived")]
    RentalCanceled(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCallback => ErrorKind::Forbidden,
            Self::MalformedEvent(_) => ErrorKind::Malformed,
            Self::UnmappedInvoice(_) => ErrorKind::Unmapped,
            Self::InsufficientFunds { .. } => ErrorKind::PaymentRequired,
            Self::RentalCanceled(_) => ErrorKind::Conflict,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for SettlementError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Amounts must be positive, but {0} was given")]
    InvalidAmount(Money),
    #[error("Insufficient funds. The balance is {balance}, which cannot cover a debit of {amount}.")]
    InsufficientFunds { balance: Money, amount: Money },
    #[error("Could not create a payment invoice. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl WalletApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::InvalidAmount(_) => ErrorKind::BadInput,
            Self::InsufficientFunds { .. } => ErrorKind::PaymentRequired,
            Self::GatewayError(_) | Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for WalletApiError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Book #{0} does not exist")]
    BookNotFound(i64),
    #[error("Invalid catalog entry. {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CatalogApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookNotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::BadInput,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for CatalogApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingRecord(what) => Self::InvalidInput(format!("{what} does not exist")),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("A user with email {0} already exists")]
    EmailTaken(String),
    #[error("Invalid user details. {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AccountApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::EmailTaken(_) => ErrorKind::Conflict,
            Self::InvalidInput(_) => ErrorKind::BadInput,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for AccountApiError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn failures_map_to_their_kinds() {
        let e = BookingError::InsufficientFunds {
            balance: Money::from(5_000),
            price: Money::from(20_000),
            deficit: Money::from(15_000),
        };
        assert_eq!(e.kind(), ErrorKind::PaymentRequired);
        assert_eq!(BookingError::NoStock(1).kind(), ErrorKind::Conflict);
        assert_eq!(ReturnError::NotOwner { rental_id: 1, user_id: 2 }.kind(), ErrorKind::Forbidden);
        assert_eq!(ReturnError::NotActive(1).kind(), ErrorKind::Conflict);
        assert_eq!(SettlementError::UnmappedInvoice("inv".into()).kind(), ErrorKind::Unmapped);
        assert_eq!(SettlementError::MalformedEvent("no id".into()).kind(), ErrorKind::Malformed);
        assert_eq!(SettlementError::InvalidCallback.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn store_failures_are_internal() {
        let e: BookingError = StoreError::DatabaseError("disk full".into()).into();
        assert_eq!(e.kind(), ErrorKind::Internal);
        let e: SettlementError = StoreError::AlreadyExists("ledger".into()).into();
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    #[test]
    fn insufficient_funds_reports_the_deficit() {
        let e = BookingError::InsufficientFunds {
            balance: Money::from(5_000),
            price: Money::from(20_000),
            deficit: Money::from(15_000),
        };
        assert!(e.to_string().contains("15000 IDR more is required"));
    }
}
