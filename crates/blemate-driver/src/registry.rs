//! Addresses discovered by the last scan.

use blemate_protocol::MAX_SCAN_ADDRESSES;

use crate::error::{DriverError, DriverResult};

/// Insertion-ordered, deduplicated, fixed-capacity list of device addresses.
///
/// Entries are never overwritten: once full, further offers are refused until
/// the next [`reset`](AddressRegistry::reset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRegistry {
    addresses: heapless::Vec<String, MAX_SCAN_ADDRESSES>,
}

impl AddressRegistry {
    /// Maximum number of addresses held.
    pub const CAPACITY: usize = MAX_SCAN_ADDRESSES;

    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every address.
    pub fn reset(&mut self) {
        self.addresses.clear();
    }

    /// Add `address` unless it is already known or the registry is full.
    ///
    /// Returns whether the address was added.
    pub fn offer(&mut self, address: &str) -> bool {
        if self.contains(address) {
            return false;
        }
        self.addresses.push(address.to_string()).is_ok()
    }

    /// Whether `address` is already held.
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a == address)
    }

    /// Number of addresses held.
    pub fn count(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.addresses.is_full()
    }

    /// The address at `index`, in discovery order.
    pub fn get(&self, index: usize) -> DriverResult<&str> {
        self.addresses
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                DriverError::InvalidParameter(format!(
                    "address index {} out of range ({} known)",
                    index,
                    self.count()
                ))
            })
    }

    /// Addresses in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }
}
