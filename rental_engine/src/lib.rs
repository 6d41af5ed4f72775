//! Rental Engine
//!
//! The rental engine is the booking and payment-settlement core of the book rental marketplace. It prevents
//! double-booking of physical copies, moves money at most once per payment, and reconciles asynchronous payment
//! notifications with local state, all under concurrent requests for the same book or user.
//!
//! The library is divided into three main sections:
//! 1. Store contracts and backends ([`mod@traits`], [`mod@sqlite`] and, with the `postgres` feature, `postgres`).
//!    You should never need to access the database directly. Instead, use the public API provided by the engine. The
//!    exception is the data types used in the database. These are defined in the [`mod@db_types`] module and are
//!    public.
//! 2. The rental engine public API (`rental_api`). This books, returns and settles rentals, manages wallets and the
//!    catalog, and sweeps expired bookings.
//! 3. Events. The engine publishes events when rentals are activated, returned or expire, and when top-ups are
//!    credited. Hooks can subscribe to them via [`events::EventHooks`].
mod db_rows;

pub mod db_types;
pub mod events;
pub mod helpers;
mod rental_api;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db_types::{HoldDuration, Money};
#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
pub use rental_api::{
    accounts_api::AccountApi,
    catalog_api::CatalogApi,
    errors::{
        AccountApiError,
        BookingError,
        CatalogApiError,
        ErrorKind,
        InvoiceBookingError,
        ReturnError,
        SettlementError,
        WalletApiError,
    },
    expiry_api::ExpiryApi,
    rental_flow_api::{RentalFlowApi, RentalFlowOptions, DEFAULT_INVOICE_EXPIRY_HOURS},
    rental_objects,
    settlement_api::SettlementApi,
    wallet_api::{WalletApi, DEFAULT_TOPUP_EXPIRY_SECS},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountManagement,
    CatalogManagement,
    GatewayError,
    InvoiceRequest,
    IssuedInvoice,
    PaymentGateway,
    RentalStore,
    StoreError,
    StoreTransaction,
};
