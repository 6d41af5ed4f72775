use std::time::Duration;

use log::*;
use rental_common::Secret;

pub const DEFAULT_XENDIT_API_URL: &str = "https://api.xendit.co";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct XenditConfig {
    /// Base URL of the API, without a trailing slash.
    pub api_url: String,
    /// Used as the basic-auth username. The password is empty.
    pub secret_key: Secret<String>,
    /// The value the gateway sends in the `x-callback-token` header.
    pub callback_token: Secret<String>,
    pub timeout: Duration,
}

impl Default for XenditConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_XENDIT_API_URL.to_string(),
            secret_key: Secret::default(),
            callback_token: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl XenditConfig {
    pub fn new<S: Into<String>>(api_url: S, secret_key: S, callback_token: S) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            secret_key: Secret::new(secret_key.into()),
            callback_token: Secret::new(callback_token.into()),
            ..Default::default()
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("XENDIT_API_URL").unwrap_or_else(|_| {
            info!("💳️ XENDIT_API_URL not set, using {DEFAULT_XENDIT_API_URL}");
            DEFAULT_XENDIT_API_URL.to_string()
        });
        let secret_key = std::env::var("XENDIT_SECRET_KEY").unwrap_or_else(|_| {
            warn!("💳️ XENDIT_SECRET_KEY not set. Invoice requests will be rejected.");
            String::default()
        });
        let callback_token = std::env::var("XENDIT_CALLBACK_TOKEN").unwrap_or_else(|_| {
            warn!("💳️ XENDIT_CALLBACK_TOKEN not set. Every callback will fail verification.");
            String::default()
        });
        Self::new(api_url, secret_key, callback_token)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailing_slashes_are_removed() {
        let config = XenditConfig::new("http://localhost:9000/", "xnd_secret_abc", "cb_tok_xyz");
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let printed = format!("{config:?}");
        assert!(!printed.contains("xnd_secret_abc"));
        assert!(!printed.contains("cb_tok_xyz"));
    }
}
