//! # Rental engine public API
//!
//! The `rental_api` module exposes the programmatic API of the rental engine. The API is modular, so that clients can
//! pick and choose the functionality they want.
//!
//! * [`rental_flow_api`] books copies (from the deposit or through an invoice), returns them and lists a user's
//!   rental history.
//! * [`settlement_api`] applies payment notifications from the gateway.
//! * [`wallet_api`] issues top-up invoices, reports balances and the ledger, and applies manual adjustments.
//! * [`catalog_api`] browses and maintains the catalog.
//! * [`accounts_api`] registers and looks up users.
//! * [`expiry_api`] releases copies whose bookings were never paid for.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific store traits required by the API, plus a payment gateway where invoices are involved.
//!
//! ```rust,ignore
//! use rental_engine::{events::EventProducers, HoldDuration, RentalFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/rentals.db", 5).await?;
//! let api = RentalFlowApi::new(db, gateway, EventProducers::default());
//! let receipt = api.book_with_deposit(user_id, book_id, HoldDuration::default()).await?;
//! ```
pub mod accounts_api;
pub mod catalog_api;
pub mod errors;
pub mod expiry_api;
pub mod rental_flow_api;
pub mod rental_objects;
pub mod settlement_api;
pub mod wallet_api;
