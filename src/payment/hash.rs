//! SHA-512 hash handshake for the PayU protocol.
//!
//! The pipe-delimited field order and the exact run of delimiter-only fields
//! are dictated by the vendor and reproduced byte-for-byte; any deviation
//! breaks interoperability.

use sha2::{Digest, Sha512};

use crate::config::PayuConfig;

/// Computes and verifies PayU integrity hashes with credentials injected at
/// construction time.
#[derive(Debug, Clone)]
pub struct PayuHasher {
    key: String,
    salt: String,
}

fn sha512_hex(input: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

impl PayuHasher {
    pub fn new(config: &PayuConfig) -> Self {
        Self { key: config.merchant_key.clone(), salt: config.merchant_salt.clone() }
    }

    pub fn merchant_key(&self) -> &str {
        &self.key
    }

    /// Request hash for the outbound checkout form.
    ///
    /// `key|txnid|amount|productinfo|firstname|email|||||||||||salt`
    ///
    /// `amount` must already be formatted with exactly two decimal digits.
    pub fn request_hash(
        &self,
        txnid: &str,
        amount: &str,
        productinfo: &str,
        firstname: &str,
        email: &str,
    ) -> String {
        sha512_hex(&format!(
            "{}|{}|{}|{}|{}|{}|||||||||||{}",
            self.key, txnid, amount, productinfo, firstname, email, self.salt
        ))
    }

    /// Reverse hash over a gateway callback.
    ///
    /// `salt|status|||||||||||email|firstname|productinfo|amount|txnid|key`
    pub fn response_hash(
        &self,
        status: &str,
        email: &str,
        firstname: &str,
        productinfo: &str,
        amount: &str,
        txnid: &str,
    ) -> String {
        sha512_hex(&format!(
            "{}|{}|||||||||||{}|{}|{}|{}|{}|{}",
            self.salt, status, email, firstname, productinfo, amount, txnid, self.key
        ))
    }

    /// Recompute the response hash and compare byte-for-byte. A `false`
    /// result is a security-relevant rejection and must never be downgraded
    /// or retried with alternate field orderings.
    #[allow(clippy::too_many_arguments)]
    pub fn verify_callback(
        &self,
        received_hash: &str,
        status: &str,
        email: &str,
        firstname: &str,
        productinfo: &str,
        amount: &str,
        txnid: &str,
    ) -> bool {
        self.response_hash(status, email, firstname, productinfo, amount, txnid) == received_hash
    }

    /// Hash authenticating an out-of-band API command.
    ///
    /// `key|command|var1|salt`
    pub fn command_hash(&self, command: &str, var1: &str) -> String {
        sha512_hex(&format!("{}|{}|{}|{}", self.key, command, var1, self.salt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PayuHasher {
        PayuHasher::new(&PayuConfig::for_tests())
    }

    // Known-answer vectors computed independently for the test credentials
    // (key=gtKFFx, salt=eCwWELxi).
    #[test]
    fn request_hash_known_vector() {
        let h = hasher().request_hash("TXN_1", "100.00", "Widget", "Asha", "asha@example.com");
        assert_eq!(
            h,
            "7a1bc70d48a6dc531aaf131f3b2a2395eab2243ef96abe8e41ff9b1fde5cfa11\
             f3fadc9cc7b5df474de11e2a98fe1c5fa5cf68d456fda23d3486e77674baabaa"
        );
    }

    #[test]
    fn response_hash_known_vector() {
        let h = hasher().response_hash(
            "success",
            "asha@example.com",
            "Asha",
            "Widget",
            "100.00",
            "TXN_1",
        );
        assert_eq!(
            h,
            "d9a9f33b4952aea344ea4856782e07d6d0b60fb792f97db9700b15fbd1a59163\
             c564a9986dddff7ccb16b2fb32730d4950fdd9387edd34e9e798890dce6a3920"
        );
    }

    #[test]
    fn command_hash_known_vector() {
        let h = hasher().command_hash("verify_payment", "TXN_1");
        assert_eq!(
            h,
            "e02a20e2fb9ce973f4688d25eea1d330d8bce2e948eefcd3778229850e063329\
             8db4ee631e7d079280bf88235fac6b849fbfeae6e18f4cd808666aaaa1d9e9e8"
        );
    }

    #[test]
    fn response_hash_is_deterministic() {
        let a = hasher().response_hash("success", "e@x.com", "E", "P", "10.00", "T1");
        let b = hasher().response_hash("success", "e@x.com", "E", "P", "10.00", "T1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn any_field_change_alters_the_digest() {
        let h = hasher();
        let base = h.response_hash("success", "e@x.com", "E", "P", "10.00", "T1");
        assert_ne!(base, h.response_hash("failure", "e@x.com", "E", "P", "10.00", "T1"));
        assert_ne!(base, h.response_hash("success", "e@x.org", "E", "P", "10.00", "T1"));
        assert_ne!(base, h.response_hash("success", "e@x.com", "F", "P", "10.00", "T1"));
        assert_ne!(base, h.response_hash("success", "e@x.com", "E", "Q", "10.00", "T1"));
        assert_ne!(base, h.response_hash("success", "e@x.com", "E", "P", "10.01", "T1"));
        assert_ne!(base, h.response_hash("success", "e@x.com", "E", "P", "10.00", "T2"));
    }

    #[test]
    fn verify_callback_rejects_tampered_fields() {
        let h = hasher();
        let good = h.response_hash("success", "e@x.com", "E", "P", "10.00", "T1");
        assert!(h.verify_callback(&good, "success", "e@x.com", "E", "P", "10.00", "T1"));
        assert!(!h.verify_callback(&good, "success", "e@x.com", "E", "P", "99.00", "T1"));
        assert!(!h.verify_callback("deadbeef", "success", "e@x.com", "E", "P", "10.00", "T1"));
    }
}
