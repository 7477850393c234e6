//! Certpin FFI - JNI Bindings
//!
//! Exposes the pin validator to Android/Kotlin. The platform TrustManager
//! (Conscrypt) performs full chain validation before Kotlin hands the
//! cleaned chain to native code, so the native side only runs the leaf SPKI
//! pin check — the same split the X509TrustManagerExtensions flow uses.
//!
//! Transport is JSON strings in both directions, chain certificates as
//! base64 DER, leaf first.

use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use certpin_core::{
    CertificateChain, ChainVerifier, ChainVerifyError, PinPolicy, PinningConfig,
    PinnedTrustValidator, TrustError, ValidationMode,
};

/// Chain verifier for the pre-validated path: the platform already did path
/// building, expiry, and hostname checks before this layer runs.
struct PlatformPreValidated;

impl ChainVerifier for PlatformPreValidated {
    fn verify_chain(
        &self,
        _chain: &CertificateChain,
        _hostname: &str,
    ) -> Result<(), ChainVerifyError> {
        Ok(())
    }
}

/// One configured session: validator plus its session mode.
struct Session {
    validator: PinnedTrustValidator,
    mode: ValidationMode,
}

/// Current session snapshot. Reconfiguration swaps the whole `Arc` so
/// in-flight validations keep the view they started with.
static SESSION: Lazy<RwLock<Option<Arc<Session>>>> = Lazy::new(|| RwLock::new(None));

/// Result of a configure call.
#[derive(Debug, Serialize)]
struct ConfigureResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    hosts: usize,
}

/// Result of a pin check.
#[derive(Debug, Serialize, Deserialize)]
pub struct Verdict {
    pub trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    fn trusted() -> Self {
        Verdict {
            trusted: true,
            error: None,
        }
    }

    fn rejected(err: &TrustError) -> Self {
        Verdict {
            trusted: false,
            error: Some(err.to_string()),
        }
    }
}

/// Parse config JSON and publish a fresh session snapshot.
pub fn configure_from_json(config_json: &str) -> Result<usize, String> {
    let config = PinningConfig::from_json(config_json).map_err(|e| e.to_string())?;
    let registry = config.build_registry().map_err(|e| e.to_string())?;
    let hosts = registry.host_count();

    if config.policy == PinPolicy::AllowUnpinned && hosts == 0 {
        log::warn!("pinning configured with no hosts and allow-unpinned policy: nothing is pinned");
    }

    let session = Session {
        validator: PinnedTrustValidator::new(
            Arc::new(PlatformPreValidated),
            registry,
            config.policy,
        ),
        mode: config.mode,
    };

    let mut slot = SESSION.write().map_err(|_| "session lock poisoned".to_string())?;
    *slot = Some(Arc::new(session));
    Ok(hosts)
}

/// Run the pin check for a pre-validated chain.
pub fn check_chain(chain: &CertificateChain, hostname: &str) -> Verdict {
    let session = {
        let slot = match SESSION.read() {
            Ok(slot) => slot,
            Err(_) => {
                return Verdict {
                    trusted: false,
                    error: Some("session lock poisoned".to_string()),
                }
            }
        };
        slot.clone()
    };

    let Some(session) = session else {
        return Verdict {
            trusted: false,
            error: Some("pin validator not configured".to_string()),
        };
    };

    match session.validator.validate(chain, hostname, session.mode) {
        Ok(()) => Verdict::trusted(),
        Err(e) => {
            log::warn!("pin check failed for {hostname}: {e}");
            Verdict::rejected(&e)
        }
    }
}

/// Decode a JSON array of base64 DER certificates (leaf first).
pub fn parse_chain_json(chain_json: &str) -> Result<CertificateChain, String> {
    let encoded: Vec<String> = serde_json::from_str(chain_json).map_err(|e| e.to_string())?;
    let mut certs = Vec::with_capacity(encoded.len());
    for entry in &encoded {
        let der = BASE64_STANDARD
            .decode(entry)
            .map_err(|e| format!("invalid base64 certificate: {e}"))?;
        certs.push(der);
    }
    Ok(CertificateChain::new(certs))
}

// ============================================================================
// JNI Bindings
// ============================================================================

/// Initialize logging for Android
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "C" fn Java_com_certpin_RustPinValidator_nativeInit(_env: JNIEnv, _class: JClass) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("RustPinValidator"),
    );
}

#[cfg(not(target_os = "android"))]
#[no_mangle]
pub extern "C" fn Java_com_certpin_RustPinValidator_nativeInit(_env: JNIEnv, _class: JClass) {
    let _ = env_logger::try_init();
}

/// Configure pins - JNI entry point
///
/// # Arguments
/// * `config` - JSON `PinningConfig` (mode, policy, hosts)
///
/// # Returns
/// JSON `ConfigureResult`
#[no_mangle]
pub extern "C" fn Java_com_certpin_RustPinValidator_nativeConfigure(
    mut env: JNIEnv,
    _class: JClass,
    config: JString,
) -> jstring {
    let fallback = r#"{"ok":false,"error":"jni failure","hosts":0}"#;

    let config_str: String = match env.get_string(&config) {
        Ok(s) => s.into(),
        Err(_) => {
            return match env.new_string(fallback) {
                Ok(jstr) => jstr.into_raw(),
                Err(_) => std::ptr::null_mut(),
            };
        }
    };

    let result = match configure_from_json(&config_str) {
        Ok(hosts) => ConfigureResult {
            ok: true,
            error: None,
            hosts,
        },
        Err(e) => ConfigureResult {
            ok: false,
            error: Some(e),
            hosts: 0,
        },
    };

    let json = serde_json::to_string(&result).unwrap_or_else(|_| fallback.to_string());
    match env.new_string(&json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Check pins - JNI entry point
///
/// # Arguments
/// * `chain` - JSON array of base64 DER certificates, leaf first, already
///   chain-validated by the platform TrustManager
/// * `hostname` - peer host the connection is for
///
/// # Returns
/// JSON `Verdict`
#[no_mangle]
pub extern "C" fn Java_com_certpin_RustPinValidator_nativeCheckPins(
    mut env: JNIEnv,
    _class: JClass,
    chain: JString,
    hostname: JString,
) -> jstring {
    let fallback = r#"{"trusted":false,"error":"jni failure"}"#;

    let chain_str: String = match env.get_string(&chain) {
        Ok(s) => s.into(),
        Err(_) => {
            return match env.new_string(fallback) {
                Ok(jstr) => jstr.into_raw(),
                Err(_) => std::ptr::null_mut(),
            };
        }
    };

    let hostname_str: String = match env.get_string(&hostname) {
        Ok(s) => s.into(),
        Err(_) => {
            return match env.new_string(fallback) {
                Ok(jstr) => jstr.into_raw(),
                Err(_) => std::ptr::null_mut(),
            };
        }
    };

    let verdict = match parse_chain_json(&chain_str) {
        Ok(parsed) => check_chain(&parsed, &hostname_str),
        Err(e) => Verdict {
            trusted: false,
            error: Some(e),
        },
    };

    let json = serde_json::to_string(&verdict).unwrap_or_else(|_| fallback.to_string());
    match env.new_string(&json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}
