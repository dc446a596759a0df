//! Cryptographic helpers for authentication and sensitive personal data.
//!
//! - PBKDF2-SHA256 password hashing (600k iterations)
//! - HMAC-SHA256 JWT signing/verification
//! - ChaCha20-Poly1305 sealing of resident registration numbers

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};

use crate::ServiceError;

const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const NONCE_LEN: usize = 12;

// ── Password hashing ────────────────────────────────────────────────────────

/// Hash a password with PBKDF2-SHA256. Returns `(hash_hex, salt_hex)`.
pub fn hash_password(password: &str) -> Result<(String, String), ServiceError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    Ok((hex::encode(hash), hex::encode(salt)))
}

/// Verify a password against a stored hash and salt (both hex-encoded).
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    constant_time_eq(&hash, &expected)
}

// ── JWT (HMAC-SHA256) ───────────────────────────────────────────────────────

/// JWT header (always HS256).
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// JWT expiry: 1 hour in seconds.
pub const JWT_EXPIRY_SECS: u64 = 3600;

/// Refresh token expiry: 7 days in seconds.
pub const REFRESH_EXPIRY_SECS: u64 = 7 * 24 * 3600;

/// Sign an access token whose `sub` is the user id.
pub fn sign_jwt(user_id: &str, secret: &str, now_unix: u64) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes());

    let payload = serde_json::json!({
        "sub": user_id,
        "iat": now_unix,
        "exp": now_unix + JWT_EXPIRY_SECS,
    });
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());

    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

    format!("{signing_input}.{sig_b64}")
}

/// Verify a JWT and return the `sub` (user_id) if valid.
pub fn verify_jwt(token: &str, secret: &str, now_unix: u64) -> Result<String, ServiceError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ServiceError::Unauthorized("invalid JWT format".into()));
    }

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let expected_sig = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let actual_sig = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| ServiceError::Unauthorized("invalid JWT signature encoding".into()))?;

    if !constant_time_eq(&expected_sig, &actual_sig) {
        return Err(ServiceError::Unauthorized("invalid JWT signature".into()));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| ServiceError::Unauthorized("invalid JWT payload encoding".into()))?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|_| ServiceError::Unauthorized("invalid JWT payload".into()))?;

    let exp = payload["exp"]
        .as_u64()
        .ok_or_else(|| ServiceError::Unauthorized("missing exp claim".into()))?;
    if now_unix > exp {
        return Err(ServiceError::Unauthorized("JWT expired".into()));
    }

    let sub = payload["sub"]
        .as_str()
        .ok_or_else(|| ServiceError::Unauthorized("missing sub claim".into()))?
        .to_string();

    Ok(sub)
}

/// Generate a secure random token (for refresh tokens). Returns hex-encoded.
pub fn generate_token() -> Result<String, ServiceError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Hash a token with SHA-256 for storage. Returns hex-encoded.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// ── Sensitive data sealing ──────────────────────────────────────────────────

/// 32-byte data key. Stored as given when it is 64 hex chars, else SHA-256 of it.
#[derive(Clone)]
pub struct DataKey([u8; 32]);

impl DataKey {
    pub fn derive(raw: &str) -> Self {
        if raw.len() == 64 {
            if let Ok(bytes) = hex::decode(raw) {
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                return Self(key);
            }
        }
        Self(Sha256::digest(raw.as_bytes()).into())
    }

    /// A throwaway key for processes started without `ENCRYPTION_KEY`.
    pub fn random() -> Result<Self, ServiceError> {
        let mut key = [0u8; 32];
        getrandom::getrandom(&mut key)
            .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
        Ok(Self(key))
    }
}

/// Encrypt `plaintext`. Output is `nonce_hex:ciphertext_hex` (tag appended to ciphertext).
pub fn seal(key: &DataKey, plaintext: &str) -> Result<String, ServiceError> {
    if plaintext.is_empty() {
        return Err(ServiceError::BadRequest("nothing to encrypt".into()));
    }
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| ServiceError::Internal("failed to encrypt data".into()))?;

    Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
}

/// Decrypt a value produced by [`seal`].
pub fn open(key: &DataKey, sealed: &str) -> Result<String, ServiceError> {
    let corrupt = || ServiceError::Internal("sealed data is corrupt or the key does not match".into());

    let (nonce_hex, ct_hex) = sealed.split_once(':').ok_or_else(corrupt)?;
    let nonce = hex::decode(nonce_hex).map_err(|_| corrupt())?;
    if nonce.len() != NONCE_LEN {
        return Err(corrupt());
    }
    let ciphertext = hex::decode(ct_hex).map_err(|_| corrupt())?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
    let plain = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| corrupt())?;
    String::from_utf8(plain).map_err(|_| corrupt())
}

/// Fully masked resident number, shown when the value is unreadable.
pub const MASKED_RESIDENT_NUMBER: &str = "******-*******";

/// `YYMMDD-GXXXXXX` (or the 13-digit form) → `YYMMDD-G******`.
pub fn mask_resident_number(rrn: &str) -> String {
    let rrn = rrn.trim();
    let digits: Option<(&str, &str)> = match rrn.split_once('-') {
        Some((front, back)) if front.len() == 6 && back.len() == 7 => Some((front, back)),
        None if rrn.len() == 13 && rrn.is_ascii() => Some(rrn.split_at(6)),
        _ => None,
    };
    match digits {
        Some((front, back)) if back.is_ascii() => {
            format!("{front}-{}******", &back[..1])
        }
        _ => MASKED_RESIDENT_NUMBER.to_string(),
    }
}

/// Decrypt then mask; any failure yields the fully masked form.
pub fn open_masked(key: &DataKey, sealed: &str) -> String {
    open(key, sealed)
        .map(|plain| mask_resident_number(&plain))
        .unwrap_or_else(|_| MASKED_RESIDENT_NUMBER.to_string())
}

// ── Internal ────────────────────────────────────────────────────────────────

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
