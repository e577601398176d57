//! Configuration structures for StrataDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the database engine.
///
/// Component-level configs (`FileManagerConfig`, `LogManagerConfig`,
/// `BufferPoolConfig`) can each be derived from this umbrella config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data files.
    pub data_dir: PathBuf,
    /// Directory for WAL files.
    pub wal_dir: PathBuf,
    /// Buffer pool size in number of buffers.
    pub buffer_pool_buffers: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            wal_dir: PathBuf::from("./data/wal"),
            buffer_pool_buffers: 1024,
            fsync_enabled: true,
        }
    }
}
