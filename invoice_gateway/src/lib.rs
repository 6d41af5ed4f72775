//! A client for a Xendit-compatible invoice API.
//!
//! [`XenditApi`] implements the rental engine's [`PaymentGateway`](rental_engine::PaymentGateway) trait: it creates
//! invoices with `POST /v2/invoices` and verifies callbacks by comparing the `x-callback-token` header with the
//! configured token.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::XenditApi;
pub use config::XenditConfig;
pub use data_objects::{InvoiceResponse, NewInvoice};
pub use error::XenditApiError;

/// The header that carries the callback verification token.
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";
