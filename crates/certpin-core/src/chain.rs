//! Certificate chains as presented by a TLS peer.

/// An ordered certificate chain, leaf first, each entry DER-encoded.
///
/// Only the leaf is ever pin-checked; intermediates and the root are the
/// delegate verifier's business.
#[derive(Debug, Clone, Default)]
pub struct CertificateChain {
    certs: Vec<Vec<u8>>,
}

impl CertificateChain {
    pub fn new(certs: Vec<Vec<u8>>) -> Self {
        CertificateChain { certs }
    }

    /// The end-entity certificate (index 0), if any.
    pub fn leaf(&self) -> Option<&[u8]> {
        self.certs.first().map(Vec::as_slice)
    }

    /// Certificates after the leaf, in presented order.
    pub fn intermediates(&self) -> impl Iterator<Item = &[u8]> {
        self.certs.iter().skip(1).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

impl From<Vec<Vec<u8>>> for CertificateChain {
    fn from(certs: Vec<Vec<u8>>) -> Self {
        CertificateChain::new(certs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_is_first_entry() {
        let chain = CertificateChain::new(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(chain.leaf(), Some(&[1u8, 2][..]));
        assert_eq!(chain.intermediates().count(), 1);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_empty_chain() {
        let chain = CertificateChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.leaf(), None);
    }
}
