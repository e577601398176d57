//! Write-Ahead Log (WAL) for StrataDB.
//!
//! Provides durability ordering for the buffer layer: a modified page's
//! log record must be durable before the page itself is written back or
//! its buffer reused.

pub mod record;
pub mod writer;

pub use record::{LogRecord, Lsn};
pub use writer::{LogIterator, LogManager, LogManagerConfig};
