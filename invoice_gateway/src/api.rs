use std::sync::Arc;

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use rental_engine::{GatewayError, InvoiceRequest, IssuedInvoice, PaymentGateway};

use crate::{
    config::XenditConfig,
    data_objects::{InvoiceResponse, NewInvoice},
    XenditApiError,
};

#[derive(Clone)]
pub struct XenditApi {
    config: XenditConfig,
    client: Arc<Client>,
}

impl XenditApi {
    pub fn new(config: XenditConfig) -> Result<Self, XenditApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| XenditApiError::Initialization(e.to_string()))?;
        if config.callback_token.is_empty() {
            warn!("💳️ No callback token is configured. Every payment callback will be rejected.");
        }
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Creates a new invoice and returns the raw response.
    pub async fn new_invoice(&self, invoice: &NewInvoice) -> Result<InvoiceResponse, XenditApiError> {
        let url = self.url("/v2/invoices");
        trace!("💳️ Requesting invoice for {} from {url}", invoice.external_id);
        let response = self
            .client
            .post(url)
            .basic_auth(self.config.secret_key.reveal(), Some(""))
            .json(invoice)
            .send()
            .await
            .map_err(|e| XenditApiError::RequestFailed(e.to_string()))?;
        if response.status().is_success() {
            response.json::<InvoiceResponse>().await.map_err(|e| XenditApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| XenditApiError::RequestFailed(e.to_string()))?;
            warn!("💳️ Invoice request for {} was rejected. {status}: {message}", invoice.external_id);
            Err(XenditApiError::QueryError { status, message })
        }
    }
}

impl PaymentGateway for XenditApi {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<IssuedInvoice, GatewayError> {
        let requested_at = Utc::now();
        let invoice = NewInvoice::from(request);
        let response = self.new_invoice(&invoice).await?;
        let issued = response.into_issued(requested_at, invoice.invoice_duration)?;
        info!("💳️ Invoice {} issued for {} ({})", issued.invoice_id, invoice.external_id, invoice.amount);
        Ok(issued)
    }

    fn verify_callback(&self, signature_header: &str, _raw_body: &[u8]) -> bool {
        if self.config.callback_token.is_empty() {
            warn!("💳️ Rejecting a callback because no callback token is configured.");
            return false;
        }
        self.config.callback_token.matches(signature_header)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use rental_common::Money;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;

    /// Serves exactly one HTTP request with the given status and body, and hands back the raw request text.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: \
                 close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    /// The value of the first header called `name` (case-insensitive) in a raw HTTP request.
    fn header_value<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
        raw.split("\r\n\r\n").next()?.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    fn request() -> InvoiceRequest {
        InvoiceRequest {
            external_id: "rental:7:1700000000".into(),
            amount: Money::from(15_000),
            payer_email: "bob@example.com".into(),
            description: "Rental of The Hobbit".into(),
            expiry_seconds: 86_400,
        }
    }

    #[tokio::test]
    async fn create_invoice() {
        let _ = env_logger::try_init();
        let body = r#"{"id":"65a0c0ffee","external_id":"rental:7:1700000000","status":"PENDING","invoice_url":"https://checkout.example/65a0c0ffee","expiry_date":"2024-01-02T00:00:00.000Z"}"#;
        let (url, server) = one_shot_server("200 OK", body).await;
        let api = XenditApi::new(XenditConfig::new(url.as_str(), "xnd_development_key", "cb")).unwrap();
        let issued = api.create_invoice(request()).await.unwrap();
        assert_eq!(issued.invoice_id, "65a0c0ffee");
        assert_eq!(issued.invoice_url, "https://checkout.example/65a0c0ffee");
        assert_eq!(issued.expires_at.to_rfc3339(), "2024-01-02T00:00:00+00:00");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v2/invoices HTTP/1.1"));
        let auth = header_value(&raw, "authorization").expect("No authorization header");
        // base64("xnd_development_key:")
        assert_eq!(auth, "Basic eG5kX2RldmVsb3BtZW50X2tleTo=");
        assert!(raw.contains(r#""external_id":"rental:7:1700000000""#));
        assert!(raw.contains(r#""amount":15000"#));
        assert!(raw.contains(r#""invoice_duration":86400"#));
    }

    #[tokio::test]
    async fn rejected_invoice() {
        let _ = env_logger::try_init();
        let body = r#"{"error_code":"API_VALIDATION_ERROR","message":"amount is too small"}"#;
        let (url, server) = one_shot_server("400 Bad Request", body).await;
        let api = XenditApi::new(XenditConfig::new(url.as_str(), "key", "cb")).unwrap();
        let err = api.create_invoice(request()).await.unwrap_err();
        match err {
            GatewayError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("amount is too small"));
            },
            e => panic!("Unexpected error: {e}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn invoice_without_id() {
        let (url, server) = one_shot_server("200 OK", r#"{"invoice_url":"https://checkout.example/x"}"#).await;
        let api = XenditApi::new(XenditConfig::new(url.as_str(), "key", "cb")).unwrap();
        let err = api.create_invoice(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let mut config = XenditConfig::new(url.as_str(), "key", "cb");
        config.timeout = Duration::from_secs(2);
        let api = XenditApi::new(config).unwrap();
        let err = api.create_invoice(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::RequestFailed(_)));
    }

    #[test]
    fn callback_verification() {
        let api = XenditApi::new(XenditConfig::new("http://localhost", "key", "s3cret")).unwrap();
        assert!(api.verify_callback("s3cret", b"{}"));
        assert!(!api.verify_callback("s3cret ", b"{}"));
        assert!(!api.verify_callback("", b"{}"));

        let api = XenditApi::new(XenditConfig::new("http://localhost", "key", "")).unwrap();
        assert!(!api.verify_callback("", b"{}"));
    }
}
