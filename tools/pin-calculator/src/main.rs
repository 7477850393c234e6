//! Pin Calculator
//!
//! Computes SPKI SHA-256 pins from certificate files. This is the offline
//! step that produces the `sha256/<base64>` strings for a pinning config:
//!
//! ```text
//! pin-calculator server.pem
//! pin-calculator --hex chain.pem
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use certpin_core::TrustPin;

#[derive(Parser, Debug)]
#[command(name = "pin-calculator", about = "Compute SPKI SHA-256 pins from certificates")]
struct Args {
    /// Certificate file: PEM (one or more certificates) or a single raw DER
    cert: PathBuf,

    /// Also print each digest as hex
    #[arg(long)]
    hex: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let raw = std::fs::read(&args.cert)
        .with_context(|| format!("failed to read {}", args.cert.display()))?;
    let certs = load_certs(&raw)?;

    for (index, der) in certs.iter().enumerate() {
        let pin = TrustPin::from_leaf_der(der)
            .with_context(|| format!("certificate #{index} is not valid DER X.509"))?;
        println!("cert #{index}: {pin}");
        if args.hex {
            println!("cert #{index}: {}", hex::encode(pin.as_bytes()));
        }
    }

    Ok(())
}

/// PEM input may hold a whole chain; anything else is treated as one DER
/// certificate.
fn load_certs(raw: &[u8]) -> anyhow::Result<Vec<Vec<u8>>> {
    if raw.windows(10).any(|w| w == b"-----BEGIN") {
        let mut cursor = std::io::Cursor::new(raw);
        let certs = rustls_pemfile::certs(&mut cursor)
            .map(|c| c.map(|der| der.as_ref().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to parse PEM input")?;
        anyhow::ensure!(!certs.is_empty(), "no certificates found in PEM input");
        Ok(certs)
    } else {
        Ok(vec![raw.to_vec()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated() -> (String, Vec<u8>, TrustPin) {
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["api.example.com".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        (
            cert.pem(),
            cert.der().to_vec(),
            TrustPin::from_spki_der(&key.public_key_der()),
        )
    }

    #[test]
    fn test_pem_input_yields_expected_pin() {
        let (pem, _, expected) = generated();
        let certs = load_certs(pem.as_bytes()).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(TrustPin::from_leaf_der(&certs[0]).unwrap(), expected);
    }

    #[test]
    fn test_der_input_passes_through() {
        let (_, der, expected) = generated();
        let certs = load_certs(&der).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(TrustPin::from_leaf_der(&certs[0]).unwrap(), expected);
    }

    #[test]
    fn test_empty_pem_rejected() {
        assert!(load_certs(b"-----BEGIN NOTHING-----").is_err());
    }
}
