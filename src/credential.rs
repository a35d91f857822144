//! API key protection.
//!
//! In credential mode the plaintext API key is encrypted once, at client
//! construction, with the service's RSA public key (OAEP, SHA-256) and only
//! the base64 ciphertext is kept. In mutual TLS mode the key is kept as an
//! [`ApiKey`], whose `Debug` output is redacted.

use crate::anchor::TrustAnchor;
use crate::error::{FirmaError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

/// A plaintext API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a plaintext key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The plaintext key.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Base64 ciphertext of an API key, sent as the `Authorization` value.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedCredential(String);

impl EncryptedCredential {
    /// Wrap an already encrypted, base64 rendered credential.
    pub fn from_base64(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The base64 text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the base64 text back to ciphertext bytes.
    pub fn ciphertext(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.0)
            .map_err(|e| FirmaError::Decode(e.to_string()))
    }
}

impl fmt::Debug for EncryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedCredential({} chars)", self.0.len())
    }
}

impl fmt::Display for EncryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a plaintext API key into an [`EncryptedCredential`].
pub trait CredentialEncryptor: Send + Sync {
    /// Encrypt `plaintext` for the holder of `anchor`'s private key.
    fn encrypt(&self, plaintext: &str, anchor: &TrustAnchor) -> Result<EncryptedCredential>;
}

/// RSA-OAEP with SHA-256, the scheme the signing service expects.
///
/// Accepts the anchor as an SPKI or PKCS#1 public key, or an X.509
/// certificate, each in PEM or DER form. Ciphertext is randomized, so two
/// calls with the same input never produce the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaOaepEncryptor;

impl RsaOaepEncryptor {
    /// Create the encryptor.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialEncryptor for RsaOaepEncryptor {
    fn encrypt(&self, plaintext: &str, anchor: &TrustAnchor) -> Result<EncryptedCredential> {
        let public_key = parse_public_key(anchor.as_bytes())?;
        let ciphertext = public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|e| FirmaError::EncryptionFailed(e.to_string()))?;
        Ok(EncryptedCredential(BASE64.encode(ciphertext)))
    }
}

/// Parse an RSA public key from any of the supported encodings.
///
/// On failure the SubjectPublicKeyInfo decoder's diagnostic is reported, since
/// that is the encoding the service publishes.
pub fn parse_public_key(bytes: &[u8]) -> Result<RsaPublicKey> {
    let pem = std::str::from_utf8(bytes)
        .ok()
        .map(str::trim)
        .filter(|text| text.starts_with("-----BEGIN"));

    if let Some(text) = pem {
        let spki_error = match RsaPublicKey::from_public_key_pem(text) {
            Ok(key) => return Ok(key),
            Err(e) => e,
        };
        if let Ok(key) = RsaPublicKey::from_pkcs1_pem(text) {
            return Ok(key);
        }
        if let Ok(cert) = Certificate::from_pem(text.as_bytes()) {
            return key_from_certificate(&cert);
        }
        return Err(not_a_public_key(spki_error));
    }

    let spki_error = match RsaPublicKey::from_public_key_der(bytes) {
        Ok(key) => return Ok(key),
        Err(e) => e,
    };
    if let Ok(key) = RsaPublicKey::from_pkcs1_der(bytes) {
        return Ok(key);
    }
    if let Ok(cert) = Certificate::from_der(bytes) {
        return key_from_certificate(&cert);
    }
    Err(not_a_public_key(spki_error))
}

fn not_a_public_key(cause: impl fmt::Display) -> FirmaError {
    FirmaError::EncryptionFailed(format!(
        "trust anchor is not an RSA public key or certificate: {}",
        cause
    ))
}

fn key_from_certificate(cert: &Certificate) -> Result<RsaPublicKey> {
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| FirmaError::EncryptionFailed(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| FirmaError::EncryptionFailed(format!("certificate key: {}", e)))
}
