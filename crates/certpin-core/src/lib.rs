//! Certpin Core - Certificate Pinning Validator
//!
//! Pure pin-validation logic: SPKI SHA-256 pins, host-scoped pin sets and
//! the trust decision itself. No TLS stack types and no I/O live here;
//! adapters (rustls, JNI) map their callback shapes onto [`PinnedTrustValidator`].

pub mod chain;
pub mod config;
pub mod error;
pub mod pin;
pub mod registry;
pub mod validator;

pub use chain::CertificateChain;
pub use config::{HostPins, PinningConfig};
pub use error::{ChainVerifyError, ConfigError, TrustError};
pub use pin::TrustPin;
pub use registry::{PinRegistry, PinRegistryBuilder, PinSet};
pub use validator::{check_pins, ChainVerifier, PinPolicy, PinnedTrustValidator, ValidationMode};
