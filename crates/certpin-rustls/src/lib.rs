//! Certpin Rustls Adapter
//!
//! Binds the pure pin validator to rustls' `ServerCertVerifier` callback
//! shape. Chain validation stays with rustls' own webpki verifier; this
//! layer only adds the leaf SPKI pin check on top.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use thiserror::Error;

use certpin_core::{check_pins, PinPolicy, PinRegistry, TrustPin, ValidationMode};

/// Setup-time failures (building the webpki verifier, loading roots).
/// Handshake-time failures surface as `rustls::Error` through the callback.
#[derive(Debug, Error)]
pub enum PinnedTlsError {
    #[error("failed to build webpki verifier: {0}")]
    VerifierBuild(#[from] rustls::client::VerifierBuilderError),

    #[error("failed to load PEM roots: {0}")]
    RootsPem(#[from] std::io::Error),

    #[error("failed to add root certificate: {0}")]
    RootsAdd(#[from] rustls::Error),

    #[error("no certificates found in PEM input")]
    NoRoots,
}

/// A `ServerCertVerifier` that runs rustls' full webpki chain validation
/// first and then enforces SPKI pins on the end-entity certificate.
///
/// Holds only immutable state; one instance serves all connections of a
/// client config.
#[derive(Debug)]
pub struct PinnedServerCertVerifier {
    inner: Arc<WebPkiServerVerifier>,
    registry: Arc<PinRegistry>,
    policy: PinPolicy,
    mode: ValidationMode,
}

impl PinnedServerCertVerifier {
    pub fn new(
        inner: Arc<WebPkiServerVerifier>,
        registry: Arc<PinRegistry>,
        policy: PinPolicy,
        mode: ValidationMode,
    ) -> Self {
        PinnedServerCertVerifier {
            inner,
            registry,
            policy,
            mode,
        }
    }

    /// Build a verifier over the Mozilla root program (webpki-roots), the
    /// common case for public endpoints.
    pub fn with_webpki_roots(
        registry: Arc<PinRegistry>,
        policy: PinPolicy,
        mode: ValidationMode,
    ) -> Result<Arc<Self>, PinnedTlsError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(roots, registry, policy, mode)
    }

    /// Build a verifier over a caller-supplied root store (private CAs,
    /// test fixtures).
    pub fn with_roots(
        roots: RootCertStore,
        registry: Arc<PinRegistry>,
        policy: PinPolicy,
        mode: ValidationMode,
    ) -> Result<Arc<Self>, PinnedTlsError> {
        let inner = WebPkiServerVerifier::builder(Arc::new(roots)).build()?;
        Ok(Arc::new(Self::new(inner, registry, policy, mode)))
    }
}

impl ServerCertVerifier for PinnedServerCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.mode == ValidationMode::Bypass {
            tracing::warn!(
                server = ?server_name,
                "pin enforcement BYPASSED: accepting any chain (interception demo mode)"
            );
            return Ok(ServerCertVerified::assertion());
        }

        // Chain validation first; a matching pin must never rescue an
        // invalid chain.
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        let computed = TrustPin::from_leaf_der(end_entity.as_ref())
            .map_err(|e| rustls::Error::General(e.to_string()))?;

        let verdict = match server_name {
            ServerName::DnsName(dns) => {
                check_pins(&computed, dns.as_ref(), &self.registry, self.policy)
            }
            other => {
                // IP-literal SNI carries no DNS name to scope pins to, so it
                // counts as an unpinned host and the policy decides.
                match self.policy {
                    PinPolicy::AllowUnpinned => Ok(()),
                    PinPolicy::Required => {
                        let host = match other {
                            ServerName::IpAddress(ip) => std::net::IpAddr::from(*ip).to_string(),
                            other => format!("{other:?}"),
                        };
                        Err(certpin_core::TrustError::NoPinsConfigured { host })
                    }
                }
            }
        };

        verdict.map_err(|e| rustls::Error::General(e.to_string()))?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Parse concatenated PEM certificates into a root store.
pub fn root_store_from_pem(pem: &[u8]) -> Result<RootCertStore, PinnedTlsError> {
    let mut cursor = std::io::Cursor::new(pem);
    let mut roots = RootCertStore::empty();
    let mut found = false;
    for cert in rustls_pemfile::certs(&mut cursor) {
        roots.add(cert?)?;
        found = true;
    }
    if !found {
        return Err(PinnedTlsError::NoRoots);
    }
    Ok(roots)
}

/// Client config with the pinning verifier installed.
pub fn pinned_client_config(verifier: Arc<PinnedServerCertVerifier>) -> Arc<ClientConfig> {
    let mut config = ClientConfig::builder()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();

    tracing::info!("installing pinned certificate verifier");
    config.dangerous().set_certificate_verifier(verifier);

    Arc::new(config)
}
