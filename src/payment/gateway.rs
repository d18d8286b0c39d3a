//! Outbound adapter for the PayU hosted checkout and verification API.

use std::time::Duration;

use serde::Serialize;

use crate::config::PayuConfig;
use crate::error::{Error, Result};
use crate::payment::hash::PayuHasher;

/// Bound on the out-of-band verification call. A timeout is surfaced as
/// `GatewayUnavailable`, never retried automatically.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const VERIFY_COMMAND: &str = "verify_payment";

/// Form fields for the client-side redirect to the hosted checkout page.
#[derive(Debug, Clone, Serialize)]
pub struct PayuCheckoutForm {
    pub key: String,
    pub txnid: String,
    /// Two-decimal string, exactly as hashed.
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub surl: String,
    pub furl: String,
    pub hash: String,
    /// Hosted checkout endpoint the form posts to.
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifiedStatus {
    Success,
    Failure,
}

/// Outcome of a verification call. `status` is `None` when the gateway
/// response did not carry a recognizable transaction status; `raw` passes the
/// vendor body through untouched (opaque text when it was not JSON).
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResponse {
    pub status: Option<VerifiedStatus>,
    pub raw: serde_json::Value,
}

pub struct PayuGateway {
    client: reqwest::Client,
    hasher: PayuHasher,
    config: PayuConfig,
}

impl PayuGateway {
    pub fn new(config: PayuConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, hasher: PayuHasher::new(&config), config })
    }

    /// Assemble the redirect payload for a checkout attempt. Pure except for
    /// the request hash over the already-formatted amount.
    pub fn build_checkout_form(
        &self,
        txnid: &str,
        amount: &str,
        productinfo: &str,
        firstname: &str,
        email: &str,
        phone: &str,
    ) -> PayuCheckoutForm {
        let hash = self.hasher.request_hash(txnid, amount, productinfo, firstname, email);
        PayuCheckoutForm {
            key: self.hasher.merchant_key().to_string(),
            txnid: txnid.to_string(),
            amount: amount.to_string(),
            productinfo: productinfo.to_string(),
            firstname: firstname.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            surl: self.config.success_callback_url(),
            furl: self.config.failure_callback_url(),
            hash,
            action: format!("{}/_payment", self.config.base_url),
        }
    }

    /// Server-to-server status check for a transaction, used to reconcile
    /// orders whose callback was missed.
    pub async fn verify_payment(&self, txnid: &str) -> Result<GatewayResponse> {
        let hash = self.hasher.command_hash(VERIFY_COMMAND, txnid);
        let url = format!("{}/merchant/postservice?form=2", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("key", self.hasher.merchant_key()),
                ("command", VERIFY_COMMAND),
                ("var1", txnid),
                ("hash", hash.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::GatewayUnavailable(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::GatewayUnavailable(e.to_string()))?;
        Ok(parse_verification(txnid, &body))
    }
}

/// Pull `transaction_details.<txnid>.status` out of a verification response.
/// Non-JSON bodies are passed through as opaque text with no status.
fn parse_verification(txnid: &str, body: &str) -> GatewayResponse {
    let raw: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            return GatewayResponse { status: None, raw: serde_json::Value::String(body.to_string()) }
        }
    };
    let status = raw
        .get("transaction_details")
        .and_then(|d| d.get(txnid))
        .and_then(|t| t.get("status"))
        .and_then(|s| s.as_str())
        .map(|s| {
            if s.eq_ignore_ascii_case("success") {
                VerifiedStatus::Success
            } else {
                VerifiedStatus::Failure
            }
        });
    GatewayResponse { status, raw }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PayuGateway {
        PayuGateway::new(PayuConfig::for_tests()).unwrap()
    }

    #[test]
    fn checkout_form_carries_hash_and_callback_urls() {
        let form = gateway().build_checkout_form(
            "TXN_1",
            "100.00",
            "Widget",
            "Asha",
            "asha@example.com",
            "+919900112233",
        );
        assert_eq!(form.key, "gtKFFx");
        assert_eq!(form.amount, "100.00");
        assert_eq!(form.action, "https://test.payu.in/_payment");
        assert_eq!(form.surl, "http://localhost:8083/api/v1/payment/success");
        assert_eq!(form.furl, "http://localhost:8083/api/v1/payment/failure");
        assert_eq!(form.hash.len(), 128);
    }

    #[test]
    fn verification_status_is_extracted_from_json() {
        let body = r#"{"status":1,"transaction_details":{"TXN_1":{"status":"success","mihpayid":"403993715521"}}}"#;
        let parsed = parse_verification("TXN_1", body);
        assert_eq!(parsed.status, Some(VerifiedStatus::Success));

        let body = r#"{"transaction_details":{"TXN_1":{"status":"failure"}}}"#;
        assert_eq!(parse_verification("TXN_1", body).status, Some(VerifiedStatus::Failure));
    }

    #[test]
    fn missing_transaction_yields_no_status() {
        let body = r#"{"transaction_details":{"OTHER":{"status":"success"}}}"#;
        assert_eq!(parse_verification("TXN_1", body).status, None);
    }

    #[test]
    fn non_json_body_is_passed_through_as_text() {
        let parsed = parse_verification("TXN_1", "<html>gateway maintenance</html>");
        assert_eq!(parsed.status, None);
        assert_eq!(parsed.raw, serde_json::Value::String("<html>gateway maintenance</html>".into()));
    }
}
