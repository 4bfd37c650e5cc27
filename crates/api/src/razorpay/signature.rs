//! Checkout callback signature verification.
//!
//! Razorpay signs `"{order_id}|{payment_id}"` with HMAC-SHA256 keyed by the
//! account's key secret and sends the lowercase hex digest.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::error::RazorpayError;

fn payment_mac(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
) -> Result<Hmac<Sha256>, RazorpayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.expose_secret().as_bytes())
        .map_err(|e| RazorpayError::InvalidKey(e.to_string()))?;

    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Compute the signature the gateway produces for a successful payment.
///
/// # Errors
///
/// Returns [`RazorpayError::InvalidKey`] if the secret cannot key an HMAC.
pub fn payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
) -> Result<String, RazorpayError> {
    let mac = payment_mac(key_secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Whether `signature` matches the expected signature for this payment.
///
/// The hex digest is decoded and checked with [`Mac::verify_slice`], which
/// compares in constant time. Anything that is not valid hex is a mismatch.
///
/// # Errors
///
/// Returns [`RazorpayError::InvalidKey`] if the secret cannot key an HMAC.
pub fn verify_payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool, RazorpayError> {
    let mac = payment_mac(key_secret, order_id, payment_id)?;
    let Ok(provided) = hex::decode(signature) else {
        return Ok(false);
    };
    Ok(mac.verify_slice(&provided).is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("rzp_test_secret".to_owned())
    }

    #[test]
    fn test_malformed_signatures_rejected() {
        let sig = payment_signature(&secret(), "order_A", "pay_B").unwrap();

        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", "not hex at all").unwrap());
        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", &sig[..sig.len() - 2]).unwrap());
        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", &sig[..sig.len() - 1]).unwrap());
        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", &format!("{sig}00")).unwrap());
    }

    #[test]
    fn test_digest_bytes_are_compared_not_text() {
        // Hex case does not change the digest.
        let sig = payment_signature(&secret(), "order_A", "pay_B").unwrap();
        assert!(verify_payment_signature(&secret(), "order_A", "pay_B", &sig.to_uppercase()).unwrap());
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"rzp_test_secret").unwrap();
        mac.update(b"order_A|pay_B");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(
            payment_signature(&secret(), "order_A", "pay_B").unwrap(),
            expected
        );
        assert!(verify_payment_signature(&secret(), "order_A", "pay_B", &expected).unwrap());
    }

    #[test]
    fn test_tampered_inputs_rejected() {
        let sig = payment_signature(&secret(), "order_A", "pay_B").unwrap();

        assert!(!verify_payment_signature(&secret(), "order_A", "pay_C", &sig).unwrap());
        assert!(!verify_payment_signature(&secret(), "order_X", "pay_B", &sig).unwrap());
        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", "").unwrap());
        assert!(
            !verify_payment_signature(&SecretString::from("other".to_owned()), "order_A", "pay_B", &sig)
                .unwrap()
        );
    }

    #[test]
    fn test_separator_is_significant() {
        // "order_Apay_B" concatenated without the pipe must not verify.
        let mut mac = Hmac::<Sha256>::new_from_slice(b"rzp_test_secret").unwrap();
        mac.update(b"order_Apay_B");
        let unseparated = hex::encode(mac.finalize().into_bytes());

        assert!(!verify_payment_signature(&secret(), "order_A", "pay_B", &unseparated).unwrap());
    }
}
