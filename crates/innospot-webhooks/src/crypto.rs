//! Cryptographic operations for webhook authentication.
//!
//! - AES-256-GCM encryption/decryption for authentication configs at rest
//! - HMAC payload signatures (SHA-256, SHA-1, MD5) over the exact body bytes
//! - The authentication header an outbound request carries

use aes_gcm::{
    aead::{Aead, KeyInit as AeadKeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::WebhookError;
use crate::models::{AuthConfig, SignatureAlgorithm};

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;
type HmacMd5 = Hmac<Md5>;

// ---------------------------------------------------------------------------
// AES-256-GCM encryption/decryption (for secrets at rest)
// ---------------------------------------------------------------------------

/// Encrypt a plaintext secret to a base64-encoded string for DB storage.
///
/// Format: base64(nonce || ciphertext || auth_tag)
pub fn encrypt_secret(plaintext: &str, key: &[u8]) -> Result<String, WebhookError> {
    let cipher = cipher(key)?;

    // SECURITY: nonces come straight from the OS CSPRNG
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&result))
}

/// Decrypt a base64-encoded secret from DB storage back to plaintext.
pub fn decrypt_secret(encoded: &str, key: &[u8]) -> Result<String, WebhookError> {
    let cipher = cipher(key)?;

    let encrypted = BASE64
        .decode(encoded)
        .map_err(|e| WebhookError::EncryptionFailed(format!("Base64 decode failed: {e}")))?;

    if encrypted.len() < NONCE_SIZE + 1 {
        return Err(WebhookError::EncryptionFailed(
            "Invalid encrypted data format".to_string(),
        ));
    }

    let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
    let plaintext = cipher
        .decrypt(nonce, &encrypted[NONCE_SIZE..])
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| WebhookError::EncryptionFailed(e.to_string()))
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm, WebhookError> {
    if key.len() != 32 {
        return Err(WebhookError::EncryptionFailed(format!(
            "Invalid key length: expected 32 bytes, got {}",
            key.len()
        )));
    }
    <Aes256Gcm as AeadKeyInit>::new_from_slice(key)
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// HMAC payload signing
// ---------------------------------------------------------------------------

fn hmac_hex<M: Mac + KeyInit>(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = <M as KeyInit>::new_from_slice(secret)
        .map_err(|e| WebhookError::Configuration(format!("Invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compute the hex HMAC of `body` with `secret`.
///
/// `body` must be the exact bytes sent on the wire.
pub fn compute_signature(
    algorithm: SignatureAlgorithm,
    secret: &str,
    body: &[u8],
) -> Result<String, WebhookError> {
    match algorithm {
        SignatureAlgorithm::Sha256 => hmac_hex::<HmacSha256>(secret.as_bytes(), body),
        SignatureAlgorithm::Sha1 => hmac_hex::<HmacSha1>(secret.as_bytes(), body),
        SignatureAlgorithm::Md5 => hmac_hex::<HmacMd5>(secret.as_bytes(), body),
    }
}

/// Check a received hex signature against `body`.
///
/// Hex case is ignored. Comparison is constant-time.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    secret: &str,
    body: &[u8],
    signature_hex: &str,
) -> bool {
    match compute_signature(algorithm, secret, body) {
        Ok(computed) => constant_time_eq(
            signature_hex.to_ascii_lowercase().as_bytes(),
            computed.as_bytes(),
        ),
        Err(_) => false,
    }
}

/// SECURITY: Uses the `subtle` crate for proper constant-time comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

// ---------------------------------------------------------------------------
// Authentication header
// ---------------------------------------------------------------------------

/// Build the authentication header for one request body.
///
/// Returns `Ok(None)` for [`AuthConfig::None`]. A config that cannot be
/// applied is a [`WebhookError::Configuration`]; callers must not send the
/// request in that case.
pub fn auth_header(
    auth: &AuthConfig,
    body: &[u8],
) -> Result<Option<(HeaderName, HeaderValue)>, WebhookError> {
    match auth {
        AuthConfig::None => Ok(None),
        AuthConfig::Secret {
            secret,
            header_name,
        } => {
            if secret.is_empty() {
                return Err(WebhookError::Configuration(
                    "secret must not be empty".to_string(),
                ));
            }
            Ok(Some((header(header_name)?, value(secret)?)))
        }
        AuthConfig::Signature {
            secret,
            algorithm,
            header_name,
        } => {
            if secret.is_empty() {
                return Err(WebhookError::Configuration(
                    "signature secret must not be empty".to_string(),
                ));
            }
            let name = header(header_name)?;
            let signature = compute_signature(*algorithm, secret, body)?;
            Ok(Some((name, value(&signature)?)))
        }
        AuthConfig::BearerToken { token } => {
            if token.is_empty() {
                return Err(WebhookError::Configuration(
                    "bearer token must not be empty".to_string(),
                ));
            }
            Ok(Some((AUTHORIZATION, value(&format!("Bearer {token}"))?)))
        }
    }
}

fn header(name: &str) -> Result<HeaderName, WebhookError> {
    if !crate::validation::is_allowed_auth_header(name) {
        return Err(WebhookError::Configuration(format!(
            "Header {name} is reserved and cannot carry credentials"
        )));
    }
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| WebhookError::Configuration(format!("Invalid header name: {name:?}")))
}

fn value(raw: &str) -> Result<HeaderValue, WebhookError> {
    let mut value = HeaderValue::from_str(raw).map_err(|_| {
        WebhookError::Configuration("Credential is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}
