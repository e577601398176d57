//! Block identifiers for StrataDB storage.

use serde::{Deserialize, Serialize};

/// Identity of one block of one data file.
///
/// A `BlockId` is an immutable value: equality and hashing consider both
/// the file name and the block number. Real blocks are numbered from 0;
/// negative block numbers are reserved for synthetic placeholder
/// identities that mark buffer pool slots which have never held a real
/// block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    file_name: String,
    block_num: i64,
}

impl BlockId {
    /// Creates the identity of a real disk block.
    ///
    /// Panics if `block_num` is negative; negative numbers are reserved
    /// for placeholders created through [`BlockId::placeholder`].
    pub fn new(file_name: impl Into<String>, block_num: i64) -> Self {
        assert!(
            block_num >= 0,
            "negative block numbers are reserved for placeholder identities"
        );
        Self {
            file_name: file_name.into(),
            block_num,
        }
    }

    /// Creates the synthetic placeholder identity for a pool slot.
    ///
    /// Placeholders are distinct per slot (slot `i` maps to block number
    /// `-(i + 1)`) so that a pool can key every slot in one map before
    /// any slot has held real content.
    pub fn placeholder(slot: usize) -> Self {
        Self {
            file_name: String::new(),
            block_num: -(slot as i64) - 1,
        }
    }

    /// Returns true if this identity is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.block_num < 0
    }

    /// Returns the name of the file this block belongs to.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the block number within the file.
    pub fn block_num(&self) -> i64 {
        self.block_num
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_name, self.block_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_new() {
        let blk = BlockId::new("users.tbl", 7);
        assert_eq!(blk.file_name(), "users.tbl");
        assert_eq!(blk.block_num(), 7);
        assert!(!blk.is_placeholder());
    }

    #[test]
    #[should_panic(expected = "reserved for placeholder")]
    fn test_block_id_new_rejects_negative() {
        let _ = BlockId::new("users.tbl", -1);
    }

    #[test]
    fn test_block_id_value_equality() {
        assert_eq!(BlockId::new("a", 1), BlockId::new("a", 1));
        assert_ne!(BlockId::new("a", 1), BlockId::new("a", 2));
        assert_ne!(BlockId::new("a", 1), BlockId::new("b", 1));
    }

    #[test]
    fn test_block_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(BlockId::new("a", 1));
        set.insert(BlockId::new("a", 2));
        set.insert(BlockId::new("a", 1)); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_placeholder_is_negative_and_distinct() {
        let p0 = BlockId::placeholder(0);
        let p1 = BlockId::placeholder(1);
        let p2 = BlockId::placeholder(2);

        assert!(p0.is_placeholder());
        assert_eq!(p0.block_num(), -1);
        assert_eq!(p1.block_num(), -2);
        assert_eq!(p2.block_num(), -3);

        // Distinct across slots
        assert_ne!(p0, p1);
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_placeholder_never_collides_with_real_block() {
        let real = BlockId::new("", 0);
        let placeholder = BlockId::placeholder(0);
        assert_ne!(real, placeholder);
    }

    #[test]
    fn test_block_id_display() {
        assert_eq!(BlockId::new("log.dat", 3).to_string(), "log.dat:3");
        assert_eq!(BlockId::placeholder(0).to_string(), ":-1");
    }

    #[test]
    fn test_block_id_serde_roundtrip() {
        let original = BlockId::new("users.tbl", 500);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: BlockId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
