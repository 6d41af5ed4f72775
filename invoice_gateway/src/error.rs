use rental_engine::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XenditApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not complete the request: {0}")]
    RequestFailed(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway returned an invoice without an id")]
    EmptyInvoiceId,
}

impl From<XenditApiError> for GatewayError {
    fn from(e: XenditApiError) -> Self {
        match e {
            XenditApiError::QueryError { status, message } => GatewayError::Rejected { status, message },
            XenditApiError::JsonError(s) => GatewayError::InvalidResponse(s),
            XenditApiError::EmptyInvoiceId => GatewayError::InvalidResponse(e.to_string()),
            XenditApiError::Initialization(s) | XenditApiError::RequestFailed(s) => GatewayError::RequestFailed(s),
        }
    }
}
