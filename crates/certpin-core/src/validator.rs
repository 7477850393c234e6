//! The trust decision: delegate chain validation, then enforce SPKI pins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::CertificateChain;
use crate::error::{ChainVerifyError, TrustError};
use crate::pin::TrustPin;
use crate::registry::PinRegistry;

/// Whether pin enforcement runs at all.
///
/// `Bypass` exists only for controlled interception demos (mitmproxy and the
/// like). It is never the default and every use is logged at warn level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Enforce,
    Bypass,
}

/// What to do for a host that has no registered pin set. There is no safe
/// universal answer, so the call site chooses explicitly when the validator
/// is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinPolicy {
    /// Fail closed: an unpinned host is a configuration gap.
    #[default]
    Required,
    /// Pinning is opt-in per host; unpinned hosts pass on chain validation
    /// alone.
    AllowUnpinned,
}

/// Full chain validation delegate: path building, expiry, revocation where
/// available, hostname checks. Implementations adapt whatever the platform
/// TLS stack provides; the pin check never substitutes for this step.
pub trait ChainVerifier: Send + Sync {
    fn verify_chain(
        &self,
        chain: &CertificateChain,
        hostname: &str,
    ) -> Result<(), ChainVerifyError>;
}

/// Decides whether a presented certificate chain should be trusted for a
/// host. Holds no mutable state; a single instance may be shared across any
/// number of concurrent handshakes.
pub struct PinnedTrustValidator {
    verifier: Arc<dyn ChainVerifier>,
    registry: Arc<PinRegistry>,
    policy: PinPolicy,
}

impl PinnedTrustValidator {
    pub fn new(
        verifier: Arc<dyn ChainVerifier>,
        registry: Arc<PinRegistry>,
        policy: PinPolicy,
    ) -> Self {
        PinnedTrustValidator {
            verifier,
            registry,
            policy,
        }
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn policy(&self) -> PinPolicy {
        self.policy
    }

    /// Validate a chain for `hostname`.
    ///
    /// Order matters: the delegate runs first and its rejection is final —
    /// a matching pin must never rescue an invalid chain. Only a valid chain
    /// proceeds to the leaf SPKI pin check.
    pub fn validate(
        &self,
        chain: &CertificateChain,
        hostname: &str,
        mode: ValidationMode,
    ) -> Result<(), TrustError> {
        if mode == ValidationMode::Bypass {
            tracing::warn!(
                host = hostname,
                "pin enforcement BYPASSED: accepting any chain (interception demo mode)"
            );
            return Ok(());
        }

        self.verifier
            .verify_chain(chain, hostname)
            .map_err(|e| TrustError::ChainInvalid {
                reason: e.to_string(),
            })?;

        let Some(leaf) = chain.leaf() else {
            return Err(TrustError::EmptyChain);
        };

        let computed = TrustPin::from_leaf_der(leaf)?;
        check_pins(&computed, hostname, &self.registry, self.policy)
    }
}

/// Membership check for an already-computed leaf pin. Split out so adapters
/// whose TLS stack has already chain-validated (rustls callback, Android
/// TrustManager) can reuse the exact same decision.
pub fn check_pins(
    computed: &TrustPin,
    hostname: &str,
    registry: &PinRegistry,
    policy: PinPolicy,
) -> Result<(), TrustError> {
    let Some(set) = registry.pins_for(hostname) else {
        return match policy {
            PinPolicy::Required => Err(TrustError::NoPinsConfigured {
                host: hostname.to_string(),
            }),
            PinPolicy::AllowUnpinned => {
                tracing::debug!(host = hostname, "no pins registered, policy allows");
                Ok(())
            }
        };
    };

    if set.contains(computed) {
        tracing::debug!(host = hostname, pin = %computed, "leaf pin accepted");
        Ok(())
    } else {
        tracing::error!(host = hostname, pin = %computed, "leaf pin not in configured set");
        Err(TrustError::PinMismatch {
            host: hostname.to_string(),
            computed_pin: *computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PinRegistry;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegate that accepts everything and counts invocations.
    struct AcceptAll {
        calls: AtomicUsize,
    }

    impl AcceptAll {
        fn new() -> Arc<Self> {
            Arc::new(AcceptAll {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ChainVerifier for AcceptAll {
        fn verify_chain(
            &self,
            _chain: &CertificateChain,
            _hostname: &str,
        ) -> Result<(), ChainVerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Delegate that rejects everything, like a platform validator facing an
    /// expired or untrusted chain.
    struct RejectAll;

    impl ChainVerifier for RejectAll {
        fn verify_chain(
            &self,
            _chain: &CertificateChain,
            _hostname: &str,
        ) -> Result<(), ChainVerifyError> {
            Err(ChainVerifyError::new("certificate has expired"))
        }
    }

    fn leaf_and_pin(name: &str) -> (Vec<u8>, TrustPin) {
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec![name.to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let der = cert.der().to_vec();
        let pin = TrustPin::from_spki_der(&key.public_key_der());
        (der, pin)
    }

    fn registry_with(host: &str, pins: &[TrustPin]) -> Arc<PinRegistry> {
        Arc::new(
            PinRegistry::builder()
                .add(host, pins.iter().copied())
                .unwrap()
                .build(),
        )
    }

    #[test]
    fn test_matching_pin_accepted() {
        let (leaf, pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        );

        let chain = CertificateChain::new(vec![leaf]);
        assert!(validator
            .validate(&chain, "api.example.com", ValidationMode::Enforce)
            .is_ok());
    }

    #[test]
    fn test_unknown_leaf_key_is_pin_mismatch() {
        let (leaf, _) = leaf_and_pin("api.example.com");
        let (_, other_pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[other_pin]),
            PinPolicy::Required,
        );

        let chain = CertificateChain::new(vec![leaf]);
        assert_matches!(
            validator.validate(&chain, "api.example.com", ValidationMode::Enforce),
            Err(TrustError::PinMismatch { host, .. }) if host == "api.example.com"
        );
    }

    #[test]
    fn test_chain_failure_wins_even_with_matching_pin() {
        let (leaf, pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            Arc::new(RejectAll),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        );

        let chain = CertificateChain::new(vec![leaf]);
        assert_matches!(
            validator.validate(&chain, "api.example.com", ValidationMode::Enforce),
            Err(TrustError::ChainInvalid { reason }) if reason.contains("expired")
        );
    }

    #[test]
    fn test_pins_are_host_scoped() {
        let (leaf, pin) = leaf_and_pin("a.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("a.example.com", &[pin]),
            PinPolicy::Required,
        );

        let chain = CertificateChain::new(vec![leaf]);
        assert!(validator
            .validate(&chain, "a.example.com", ValidationMode::Enforce)
            .is_ok());
        // Same key, different host: the a.example.com pins must not apply.
        assert_matches!(
            validator.validate(&chain, "b.example.com", ValidationMode::Enforce),
            Err(TrustError::NoPinsConfigured { host }) if host == "b.example.com"
        );
    }

    #[test]
    fn test_rotation_accepts_current_and_backup() {
        let (current_leaf, current_pin) = leaf_and_pin("api.example.com");
        let (backup_leaf, backup_pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[current_pin, backup_pin]),
            PinPolicy::Required,
        );

        for leaf in [current_leaf, backup_leaf] {
            let chain = CertificateChain::new(vec![leaf]);
            assert!(validator
                .validate(&chain, "api.example.com", ValidationMode::Enforce)
                .is_ok());
        }
    }

    #[test]
    fn test_unpinned_host_policy() {
        let (leaf, pin) = leaf_and_pin("api.example.com");
        let registry = registry_with("api.example.com", &[pin]);
        let chain = CertificateChain::new(vec![leaf]);

        let required = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry.clone(),
            PinPolicy::Required,
        );
        assert_matches!(
            required.validate(&chain, "other.example.com", ValidationMode::Enforce),
            Err(TrustError::NoPinsConfigured { .. })
        );

        let lenient = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry,
            PinPolicy::AllowUnpinned,
        );
        assert!(lenient
            .validate(&chain, "other.example.com", ValidationMode::Enforce)
            .is_ok());
    }

    #[test]
    fn test_bypass_skips_delegate_and_pins() {
        let delegate = AcceptAll::new();
        let (_, pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            delegate.clone(),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        );

        // Empty chain, unknown host: bypass accepts anything without even
        // consulting the delegate.
        let chain = CertificateChain::default();
        assert!(validator
            .validate(&chain, "whatever.invalid", ValidationMode::Bypass)
            .is_ok());
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_chain_after_valid_delegate() {
        let (_, pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        );

        let chain = CertificateChain::default();
        assert_matches!(
            validator.validate(&chain, "api.example.com", ValidationMode::Enforce),
            Err(TrustError::EmptyChain)
        );
    }

    /// Captures warn-level records arriving through the tracing→log bridge,
    /// the same path android_logger/env_logger consume in the FFI crate.
    struct WarnCapture;

    static WARN_LINES: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());

    impl log::Log for WarnCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if record.level() == log::Level::Warn {
                WARN_LINES.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    #[test]
    fn test_bypass_emits_warning_on_every_use() {
        static LOGGER: WarnCapture = WarnCapture;
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Warn);

        let (_, pin) = leaf_and_pin("api.example.com");
        let validator = PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        );

        // Host unique to this test so records from parallel tests cannot
        // interfere with the count.
        let host = "intercepted.demo.example";
        let warnings = || {
            WARN_LINES
                .lock()
                .unwrap()
                .iter()
                .filter(|line| line.contains("BYPASSED") && line.contains(host))
                .count()
        };

        let chain = CertificateChain::default();
        assert!(validator.validate(&chain, host, ValidationMode::Bypass).is_ok());
        assert_eq!(warnings(), 1);

        // Not just once per session: every bypassed validation is loud.
        assert!(validator.validate(&chain, host, ValidationMode::Bypass).is_ok());
        assert_eq!(warnings(), 2);
    }

    #[test]
    fn test_validator_is_shareable_across_threads() {
        let (leaf, pin) = leaf_and_pin("api.example.com");
        let validator = Arc::new(PinnedTrustValidator::new(
            AcceptAll::new(),
            registry_with("api.example.com", &[pin]),
            PinPolicy::Required,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let validator = validator.clone();
                let leaf = leaf.clone();
                std::thread::spawn(move || {
                    let chain = CertificateChain::new(vec![leaf]);
                    validator
                        .validate(&chain, "api.example.com", ValidationMode::Enforce)
                        .is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
