//! Process configuration, read once at startup.
//!
//! The PayU credentials are injected into the hasher and gateway adapter from
//! here instead of being read from the environment at call time, so tests can
//! run against fake credentials.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub payu: PayuConfig,
}

#[derive(Debug, Clone)]
pub struct PayuConfig {
    pub merchant_key: String,
    pub merchant_salt: String,
    /// Hosted checkout / verification API base, e.g. `https://test.payu.in`.
    pub base_url: String,
    /// Public base of this service, used for the surl/furl callback URLs.
    pub backend_url: String,
    /// Frontend base the gateway callbacks redirect the buyer to.
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8083);
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| Error::Configuration("DATABASE_URL is not set".into()))?,
            port,
            nats_url: std::env::var("NATS_URL").ok(),
            payu: PayuConfig::from_env(port)?,
        })
    }
}

impl PayuConfig {
    fn from_env(port: u16) -> Result<Self> {
        let merchant_key = std::env::var("PAYU_MERCHANT_KEY")
            .map_err(|_| Error::Configuration("PAYU_MERCHANT_KEY is not set".into()))?;
        let merchant_salt = std::env::var("PAYU_MERCHANT_SALT")
            .map_err(|_| Error::Configuration("PAYU_MERCHANT_SALT is not set".into()))?;
        if merchant_key.is_empty() || merchant_salt.is_empty() {
            return Err(Error::Configuration("PayU credentials are empty".into()));
        }
        Ok(Self {
            merchant_key,
            merchant_salt,
            base_url: std::env::var("PAYU_BASE_URL")
                .unwrap_or_else(|_| "https://test.payu.in".to_string()),
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }

    /// Fixed credentials for tests, no environment involved.
    pub fn for_tests() -> Self {
        Self {
            merchant_key: "gtKFFx".to_string(),
            merchant_salt: "eCwWELxi".to_string(),
            base_url: "https://test.payu.in".to_string(),
            backend_url: "http://localhost:8083".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }

    pub fn success_callback_url(&self) -> String {
        format!("{}/api/v1/payment/success", self.backend_url)
    }

    pub fn failure_callback_url(&self) -> String {
        format!("{}/api/v1/payment/failure", self.backend_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_urls_derive_from_backend_url() {
        let cfg = PayuConfig::for_tests();
        assert_eq!(
            cfg.success_callback_url(),
            "http://localhost:8083/api/v1/payment/success"
        );
        assert_eq!(
            cfg.failure_callback_url(),
            "http://localhost:8083/api/v1/payment/failure"
        );
    }
}
