//! #  Store and gateway contracts
//!
//! This module provides the interfaces that define the contracts of the rental engine *backends*.
//!
//! ## Stores
//! The catalog store owns books and their physical copies. The ledger store owns user balances, wallet top-ups and
//! the append-only ledger. Both live in the same database, so that every engine operation can touch both inside one
//! transaction.
//!
//! * [`RentalStore`] is the highest level of behaviour for backends. It opens [`StoreTransaction`]s and answers the
//!   idempotency lookups used by payment settlement.
//! * [`StoreTransaction`] is one atomic unit of work. Every balance change, copy claim and rental transition happens
//!   through it. Dropping a transaction without calling [`StoreTransaction::commit`] rolls everything back.
//! * [`CatalogManagement`] provides the catalog queries and catalog maintenance.
//! * [`AccountManagement`] provides read access to users, rentals, top-ups and the ledger.
//!
//! ## Gateway
//! [`PaymentGateway`] is the boundary to the external invoice provider. The engine only ever calls it *outside* of a
//! store transaction.
mod account_management;
mod catalog_management;
mod data_objects;
mod payment_gateway;
mod rental_store;

pub use account_management::AccountManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{HistoryEntry, SweepResult};
pub use payment_gateway::{GatewayError, InvoiceRequest, IssuedInvoice, PaymentGateway};
pub use rental_store::{RentalStore, StoreError, StoreTransaction};
