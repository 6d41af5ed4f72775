use chrono::{DateTime, Duration, Utc};
use log::*;
use rental_engine::{InvoiceRequest, IssuedInvoice};
use serde::{Deserialize, Serialize};

use crate::XenditApiError;

/// The body of a `POST /v2/invoices` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub external_id: String,
    /// Whole rupiah. The API does not use minor units for IDR.
    pub amount: i64,
    pub description: String,
    pub payer_email: String,
    /// Seconds until the invoice expires.
    pub invoice_duration: u32,
}

impl From<InvoiceRequest> for NewInvoice {
    fn from(req: InvoiceRequest) -> Self {
        Self {
            external_id: req.external_id,
            amount: req.amount.value(),
            description: req.description,
            payer_email: req.payer_email,
            invoice_duration: req.expiry_seconds,
        }
    }
}

/// The parts of the invoice response that the engine uses.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub invoice_url: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

impl InvoiceResponse {
    /// Checks the response and converts it. If the expiry date is missing or unreadable, it is estimated from the
    /// requested duration.
    pub fn into_issued(self, requested_at: DateTime<Utc>, duration: u32) -> Result<IssuedInvoice, XenditApiError> {
        if self.id.trim().is_empty() {
            return Err(XenditApiError::EmptyInvoiceId);
        }
        let parsed = self.expiry_date.as_deref().map(DateTime::parse_from_rfc3339);
        let expires_at = match parsed {
            Some(Ok(dt)) => dt.with_timezone(&Utc),
            Some(Err(e)) => {
                warn!("💳️ Invoice {} has an unreadable expiry date ({e}). Estimating it.", self.id);
                requested_at + Duration::seconds(i64::from(duration))
            },
            None => requested_at + Duration::seconds(i64::from(duration)),
        };
        Ok(IssuedInvoice { invoice_id: self.id, invoice_url: self.invoice_url, expires_at })
    }
}
