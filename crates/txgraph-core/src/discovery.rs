use crate::NodeId;
use std::collections::HashSet;

/// Addresses flagged by the external discovery subsystem.
///
/// Lookups are case-insensitive for hex addresses, since the discovery feed
/// and the graph API do not agree on checksum casing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredWalletSet {
    addresses: HashSet<String>,
}

impl DiscoveredWalletSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: impl AsRef<str>) -> bool {
        self.addresses.insert(normalize(address.as_ref()))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.addresses.contains(&normalize(id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DiscoveredWalletSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

fn normalize(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        trimmed.to_ascii_lowercase()
    } else {
        trimmed.to_string()
    }
}
