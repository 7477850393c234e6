//! Host-scoped pin sets and the read-only registry that holds them.

use std::collections::{HashMap, HashSet};

use crate::error::TrustError;
use crate::pin::TrustPin;

/// Pins accepted for exactly one host. Always non-empty; rotation is handled
/// by listing the current and backup key pins side by side.
#[derive(Debug, Clone)]
pub struct PinSet {
    host: String,
    pins: HashSet<TrustPin>,
}

impl PinSet {
    pub fn new(
        host: impl Into<String>,
        pins: impl IntoIterator<Item = TrustPin>,
    ) -> Result<Self, TrustError> {
        let host = normalize_host(&host.into());
        let pins: HashSet<TrustPin> = pins.into_iter().collect();
        if pins.is_empty() {
            return Err(TrustError::EmptyPinSet { host });
        }
        Ok(PinSet { host, pins })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn contains(&self, pin: &TrustPin) -> bool {
        self.pins.contains(pin)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

/// Immutable host → [`PinSet`] map. Lookup is exact-match only; a pin
/// registered for `a.example.com` never applies to `b.example.com` or to
/// subdomains. Build once, share behind an `Arc`; reconfiguration means
/// swapping in a freshly built registry, never mutating this one.
#[derive(Debug, Clone, Default)]
pub struct PinRegistry {
    hosts: HashMap<String, PinSet>,
}

impl PinRegistry {
    pub fn builder() -> PinRegistryBuilder {
        PinRegistryBuilder::default()
    }

    /// Exact-match lookup. DNS names compare case-insensitively.
    pub fn pins_for(&self, host: &str) -> Option<&PinSet> {
        self.hosts.get(&normalize_host(host))
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }
}

#[derive(Debug, Default)]
pub struct PinRegistryBuilder {
    hosts: HashMap<String, PinSet>,
}

impl PinRegistryBuilder {
    /// Register pins for a host. Registering the same host twice replaces
    /// the earlier set.
    pub fn add(
        mut self,
        host: impl Into<String>,
        pins: impl IntoIterator<Item = TrustPin>,
    ) -> Result<Self, TrustError> {
        let set = PinSet::new(host, pins)?;
        self.hosts.insert(set.host().to_string(), set);
        Ok(self)
    }

    pub fn build(self) -> PinRegistry {
        PinRegistry { hosts: self.hosts }
    }
}

fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}
