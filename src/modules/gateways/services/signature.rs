use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw webhook body
pub const SIGNATURE_HEADER: &str = "X-Tap-Signature";

/// Hex-encoded HMAC-SHA256 of `payload`
pub fn sign(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify `signature` against the raw body in constant time.
///
/// Missing, malformed (non-hex) or mismatched signatures are all
/// `AppError::WebhookIntegrity`.
pub fn verify(secret: &str, payload: &[u8], signature: Option<&str>) -> Result<()> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::integrity("Missing signature"))?;

    let expected = hex::decode(signature.to_ascii_lowercase())
        .map_err(|_| AppError::integrity("Malformed signature"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::integrity("Signature mismatch"))
}
