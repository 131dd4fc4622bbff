//! Provider webhook signature verification.
//!
//! The provider signs every webhook with HMAC-SHA512 over the exact request
//! body, keyed by the shared secret, and sends the hex digest in the
//! signature header. Verification must run on the raw bytes as received.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Verifier for provider webhook signatures.
#[derive(Clone)]
pub struct WebhookSignatureVerifier {
    secret: SecretString,
}

impl WebhookSignatureVerifier {
    /// Creates a new verifier with the given shared secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Returns true when `signature_hex` is the HMAC-SHA512 of `payload`.
    ///
    /// Malformed hex and length mismatches are treated as a plain mismatch.
    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> bool {
        let Ok(provided) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        match self.compute_signature(payload) {
            Some(expected) => constant_time_compare(&expected, &provided),
            None => false,
        }
    }

    /// Computes the raw HMAC-SHA512 digest of the payload.
    fn compute_signature(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha512::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(payload);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for WebhookSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignatureVerifier").finish_non_exhaustive()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hex HMAC-SHA512 of `payload`, as the provider would send it.
///
/// Exposed for tests and local tooling that need to forge valid deliveries.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(payload);
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "sk_test_webhook_secret_12345";

    fn verifier() -> WebhookSignatureVerifier {
        WebhookSignatureVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let payload = br#"{"event":"charge.success","data":{"reference":"TXN_1_AB"}}"#;
        let signature = sign_payload(TEST_SECRET, payload);

        assert_eq!(signature.len(), 128);
        assert!(verifier().verify(payload, &signature));
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let payload = br#"{"event":"charge.success"}"#;
        let signature = sign_payload(TEST_SECRET, payload).to_uppercase();

        assert!(verifier().verify(payload, &signature));
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let payload = br#"{"event":"charge.success"}"#;
        let signature = sign_payload("another_secret", payload);

        assert!(!verifier().verify(payload, &signature));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let original = br#"{"event":"charge.failed","data":{"reference":"R"}}"#;
        let tampered = br#"{"event":"charge.success","data":{"reference":"R"}}"#;
        let signature = sign_payload(TEST_SECRET, original);

        assert!(!verifier().verify(tampered, &signature));
    }

    #[test]
    fn verify_covers_exact_bytes_not_reserialized_form() {
        let compact = br#"{"event":"charge.success"}"#;
        let spaced = br#"{ "event": "charge.success" }"#;
        let signature = sign_payload(TEST_SECRET, compact);

        assert!(!verifier().verify(spaced, &signature));
    }

    #[test]
    fn verify_rejects_non_hex_and_empty_signatures() {
        let payload = b"{}";
        assert!(!verifier().verify(payload, "not-hex"));
        assert!(!verifier().verify(payload, ""));
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let payload = b"{}";
        let signature = sign_payload(TEST_SECRET, payload);

        assert!(!verifier().verify(payload, &signature[..64]));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(!rendered.contains(TEST_SECRET));
    }
}
