// File: voltledger-core/src/crypto/mod.rs

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::Rng;
use rand_core::TryRngCore;
use sha2::Sha512;

use crate::Error;

type HmacSha512 = Hmac<Sha512>;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hashes a password into a PHC string (argon2id, random 16-byte salt).
pub fn hash_password(password: &str) -> Result<String, Error> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, phc: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(phc).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hex HMAC-SHA512 of `body`, as sent in payment webhooks.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, Error> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC-SHA512 signature.
pub fn verify_payload_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// `<PREFIX>-<unix millis>-<9 base36 chars>`, e.g. `TXN-1718000000000-k3j9x0abq`.
pub fn generate_reference(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn signature_verifies_and_rejects_tampering() {
        let sig = sign_payload("sk_test", br#"{"event":"charge.success"}"#).unwrap();
        assert_eq!(sig.len(), 128);
        assert!(verify_payload_signature("sk_test", br#"{"event":"charge.success"}"#, &sig));
        assert!(!verify_payload_signature("sk_test", br#"{"event":"charge.failed"}"#, &sig));
        assert!(!verify_payload_signature("other", br#"{"event":"charge.success"}"#, &sig));
        assert!(!verify_payload_signature("sk_test", b"{}", "not-hex"));
    }

    #[test]
    fn references_have_expected_shape() {
        let r = generate_reference("CARBON");
        let parts: Vec<&str> = r.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CARBON");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_reference("TXN"), generate_reference("TXN"));
    }
}
