use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::{Duration, Utc};
use log::*;
use tokio::sync::Mutex;

use crate::traits::{GatewayError, InvoiceRequest, IssuedInvoice, PaymentGateway};

pub const MOCK_CALLBACK_TOKEN: &str = "test-callback-token";

/// An in-memory payment gateway. Invoices are numbered `inv-1`, `inv-2`, ... and every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    next_id: Arc<AtomicU64>,
    fail: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<InvoiceRequest>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent invoice request fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<InvoiceRequest> {
        self.requests.lock().await.clone()
    }

    pub fn invoices_issued(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for MockGateway {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<IssuedInvoice, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::RequestFailed("mock gateway is offline".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice_id = format!("inv-{n}");
        let expires_at = Utc::now() + Duration::seconds(i64::from(request.expiry_seconds));
        debug!("💳️ Mock invoice {invoice_id} for {} ({})", request.amount, request.external_id);
        self.requests.lock().await.push(request);
        Ok(IssuedInvoice { invoice_url: format!("https://pay.example.test/{invoice_id}"), invoice_id, expires_at })
    }

    fn verify_callback(&self, signature_header: &str, _raw_body: &[u8]) -> bool {
        signature_header == MOCK_CALLBACK_TOKEN
    }
}
