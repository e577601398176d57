//! Transaction identifier type shared across StrataDB components.

use serde::{Deserialize, Serialize};

/// Unique identifier for a transaction.
///
/// The buffer layer records the transaction that last modified each
/// cached block so that commit and rollback can flush exactly the
/// blocks that transaction touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxnId(pub u32);

impl TxnId {
    /// Creates a new transaction ID.
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id_display() {
        let txn = TxnId::new(42);
        assert_eq!(txn.to_string(), "txn:42");
    }

    #[test]
    fn test_txn_id_equality() {
        assert_eq!(TxnId::new(1), TxnId(1));
        assert_ne!(TxnId::new(1), TxnId::new(2));
    }

    #[test]
    fn test_txn_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(TxnId::new(1));
        set.insert(TxnId::new(2));
        set.insert(TxnId::new(1)); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_txn_id_ordering() {
        assert!(TxnId::new(1) < TxnId::new(2));
    }

    #[test]
    fn test_txn_id_serde_roundtrip() {
        let original = TxnId::new(7);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: TxnId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
