//! Buffer management for StrataDB.
//!
//! This crate mediates access to a fixed number of in-memory buffers
//! that cache disk blocks:
//! - Block-to-buffer mapping with pin counting for concurrent use
//! - Replacement policy that fills empty slots before evicting and
//!   reuses the slot with the oldest outstanding write
//! - Write-ahead ordering on every write-back (log record durable
//!   before the data page)

mod buffer;
mod formatter;
mod pool;
mod replacer;

pub use buffer::Buffer;
pub use formatter::{PageFormatter, ZeroFormatter};
pub use pool::{BufferManager, BufferPoolConfig, SlotId};
pub use replacer::{Candidate, OldestWriteFirst, ReplacementPolicy};
