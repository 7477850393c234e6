//! Typed trust and configuration errors.

use thiserror::Error;

use crate::pin::TrustPin;

/// Outcome taxonomy for a single validation attempt. Every failure is
/// terminal for that connection attempt; retry policy belongs to the
/// transport layer.
#[derive(Debug, Error)]
pub enum TrustError {
    /// The delegate (platform/library) validator rejected the chain:
    /// expired, untrusted root, hostname mismatch. Pins were not consulted.
    #[error("chain validation failed: {reason}")]
    ChainInvalid { reason: String },

    /// The chain had no certificates. Unreachable after successful chain
    /// validation, kept as a hard stop rather than an assumption.
    #[error("server presented an empty certificate chain")]
    EmptyChain,

    /// The host has no registered pin set and the policy requires one.
    #[error("no pins configured for host {host}")]
    NoPinsConfigured { host: String },

    /// Chain validation passed but the leaf key is not a recognized pin.
    /// This is the "TLS interception detected" case.
    #[error("pin mismatch for host {host}: leaf key is {computed_pin}")]
    PinMismatch { host: String, computed_pin: TrustPin },

    /// A pin set was declared with zero pins. Enforce mode would silently
    /// reject every handshake for the host, so construction fails instead.
    #[error("pin set for host {host} must contain at least one pin")]
    EmptyPinSet { host: String },

    /// A pin string was not `sha256/<base64>` over a 32-byte digest.
    #[error("invalid pin encoding: {0}")]
    BadPinFormat(String),

    /// The leaf certificate could not be parsed as DER X.509.
    #[error("failed to parse leaf certificate: {0}")]
    LeafParse(String),
}

/// Failure reported by a [`crate::ChainVerifier`] delegate. Carries the
/// delegate's own message; the validator wraps it into
/// [`TrustError::ChainInvalid`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ChainVerifyError(pub String);

impl ChainVerifyError {
    pub fn new(reason: impl Into<String>) -> Self {
        ChainVerifyError(reason.into())
    }
}

/// Errors loading or interpreting a [`crate::PinningConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read pinning config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse pinning config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Pins(#[from] TrustError),
}
