//! SPKI SHA-256 pins.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use ring::digest::{digest, SHA256};
use x509_parser::prelude::*;

use crate::error::TrustError;

/// Prefix used by the canonical string form (`sha256/<base64>`), the same
/// syntax OkHttp's CertificatePinner uses.
const PIN_PREFIX: &str = "sha256/";

/// A certificate pin: the SHA-256 digest over the leaf certificate's
/// SubjectPublicKeyInfo (DER). Compared by exact byte equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrustPin([u8; 32]);

impl TrustPin {
    pub const LEN: usize = 32;

    /// Compute a pin from SubjectPublicKeyInfo bytes (DER).
    pub fn from_spki_der(spki: &[u8]) -> Self {
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(digest(&SHA256, spki).as_ref());
        TrustPin(out)
    }

    /// Parse a DER-encoded X.509 certificate and pin its public key.
    pub fn from_leaf_der(der: &[u8]) -> Result<Self, TrustError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| TrustError::LeafParse(e.to_string()))?;
        Ok(Self::from_spki_der(cert.public_key().raw))
    }

    /// Parse the canonical base64 form. The `sha256/` prefix is optional.
    pub fn from_base64(value: &str) -> Result<Self, TrustError> {
        let encoded = value.strip_prefix(PIN_PREFIX).unwrap_or(value);
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| TrustError::BadPinFormat(format!("{value}: {e}")))?;
        if bytes.len() != Self::LEN {
            return Err(TrustError::BadPinFormat(format!(
                "{value}: expected {} digest bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        Ok(TrustPin(out))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Canonical string form: `sha256/<base64>`.
    pub fn to_base64(&self) -> String {
        format!("{PIN_PREFIX}{}", BASE64_STANDARD.encode(self.0))
    }
}

impl fmt::Display for TrustPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for TrustPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrustPin({})", self.to_base64())
    }
}

impl FromStr for TrustPin {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}
