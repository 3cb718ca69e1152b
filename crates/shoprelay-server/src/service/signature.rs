//! Webhook request authentication.
//!
//! The commerce platform signs each webhook delivery with HMAC-SHA256 over
//! the raw request body and sends the digest base64-encoded in a header.
//! Verification must happen on the raw bytes, before any JSON parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::service::TRACING_TARGET_SIGNATURE;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook signatures against a shared secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    /// Creates a verifier with the given shared secret.
    ///
    /// An empty secret disables verification; every request is accepted.
    /// That mode is for local development only and warns once at startup.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if secret.is_empty() {
            warn!(
                target: TRACING_TARGET_SIGNATURE,
                "Webhook secret is empty, signature verification is disabled"
            );
        }
        Self { secret }
    }

    /// Returns whether verification is enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Verifies the base64-encoded signature header against the raw body.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        if self.secret.is_empty() {
            return true;
        }

        let Ok(expected) = BASE64.decode(signature) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(body);

        // verify_slice is constant-time
        mac.verify_slice(&expected).is_ok()
    }

    /// Computes the base64-encoded signature for a body.
    ///
    /// Used by tests and by the diagnostics tooling to produce valid
    /// deliveries.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_signature_verifies() {
        let verifier = WebhookVerifier::new("shhh-secret");
        let body = br#"{"order_id":42}"#;

        let signature = verifier.sign(body);
        assert!(verifier.verify(body, &signature));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let verifier = WebhookVerifier::new("shhh-secret");
        let signature = verifier.sign(br#"{"order_id":42}"#);

        assert!(!verifier.verify(br#"{"order_id":43}"#, &signature));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signer = WebhookVerifier::new("secret-a");
        let verifier = WebhookVerifier::new("secret-b");

        let body = b"payload";
        assert!(!verifier.verify(body, &signer.sign(body)));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let verifier = WebhookVerifier::new("shhh-secret");
        assert!(!verifier.verify(b"payload", "not-base64!!!"));
    }

    #[test]
    fn test_empty_secret_accepts_everything() {
        let verifier = WebhookVerifier::new("");
        assert!(!verifier.is_enabled());
        assert!(verifier.verify(b"anything", "whatever"));
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        // = f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8
        let verifier = WebhookVerifier::new("key");
        let signature = verifier.sign(b"The quick brown fox jumps over the lazy dog");
        assert_eq!(signature, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
    }
}
