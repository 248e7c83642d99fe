//! Physical item descriptions and their ledger identifiers.

use crate::hash::{hash, hash_concat, Hash};
use serde::{Deserialize, Serialize};

/// Identifier of an item known only by its physical id (serial number, tag).
pub fn item_hash_from_id(physical_id: &str) -> Hash {
    hash(physical_id.as_bytes())
}

/// A full item description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub physical_id: String,
    pub brand: String,
    pub category: String,
    pub base_price: u64,
}

impl Item {
    /// Hash of the descriptive fields in order, followed by the little-endian price.
    pub fn hash(&self) -> Hash {
        hash_concat(&[
            self.name.as_bytes(),
            self.physical_id.as_bytes(),
            self.brand.as_bytes(),
            self.category.as_bytes(),
            &self.base_price.to_le_bytes(),
        ])
    }

    pub fn verify_hash(&self, provided: &Hash) -> bool {
        self.hash() == *provided
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch() -> Item {
        Item {
            name: "Submariner".into(),
            physical_id: "SN-0001".into(),
            brand: "Rolex".into(),
            category: "watch".into(),
            base_price: 9_000,
        }
    }

    #[test]
    fn test_item_hash_from_id() {
        assert_eq!(item_hash_from_id("SN-0001"), hash(b"SN-0001"));
        assert_ne!(item_hash_from_id("SN-0001"), item_hash_from_id("SN-0002"));
    }

    #[test]
    fn test_item_hash_covers_price() {
        let item = watch();
        let mut cheaper = item.clone();
        cheaper.base_price = 8_000;
        assert_ne!(item.hash(), cheaper.hash());
        assert!(item.verify_hash(&item.hash()));
        assert!(!item.verify_hash(&cheaper.hash()));
    }
}
