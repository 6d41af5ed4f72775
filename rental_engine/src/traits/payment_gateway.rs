use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db_types::Money;

/// A request for a new external payment invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceRequest {
    /// Our own reference for the invoice. It is echoed back in callbacks.
    pub external_id: String,
    pub amount: Money,
    pub payer_email: String,
    pub description: String,
    pub expiry_seconds: u32,
}

/// An invoice that the gateway has created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvoice {
    pub invoice_id: String,
    pub invoice_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway. {0}")]
    RequestFailed(String),
    #[error("The payment gateway rejected the request. Status {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("The payment gateway sent an invalid response. {0}")]
    InvalidResponse(String),
}

/// The external payment provider, as seen by the engine.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<IssuedInvoice, GatewayError>;

    /// Checks that a callback really came from the gateway.
    fn verify_callback(&self, signature_header: &str, raw_body: &[u8]) -> bool;
}
