//! Buffer pool manager.

use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use sysinfo::System;

use strata_common::{Result, StorageConfig, StrataError, TxnId};
use strata_storage::{BlockId, FileManager, BLOCK_SIZE};
use strata_wal::LogManager;

use crate::buffer::Buffer;
use crate::formatter::PageFormatter;
use crate::replacer::{Candidate, OldestWriteFirst, ReplacementPolicy};

/// Unique identifier for a slot in the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

impl SlotId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of buffers in the pool.
    pub num_buffers: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_buffers: 1024 }
    }
}

impl From<&StorageConfig> for BufferPoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            num_buffers: config.buffer_pool_buffers,
        }
    }
}

impl BufferPoolConfig {
    /// Creates a pool config sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 buffers to ensure useful caching even on
    /// low-memory systems.
    pub fn auto_sized() -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_buffers = (target_bytes / BLOCK_SIZE).max(1_000);

        Self { num_buffers }
    }
}

/// Buffer pool manager.
///
/// Owns a fixed number of buffer slots and the mapping from block
/// identity to slot. The mapping always holds exactly one entry per
/// slot: slots that have never held a real block are keyed by a
/// distinct placeholder identity, so every slot is addressable and
/// replaceable from construction on.
///
/// All operations are serialized through a single mutex. `pin` and
/// `pin_new` never wait for a slot to become free; they fail with
/// [`StrataError::BufferPoolFull`] and leave retry policy to the
/// caller.
pub struct BufferManager {
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    /// Buffer slots, indexed by SlotId.
    slots: Vec<Arc<Buffer>>,
    /// Block identity to slot mapping; exactly one entry per slot.
    block_table: HashMap<BlockId, SlotId>,
    /// Number of slots with pin count zero, maintained incrementally.
    available: usize,
    /// Policy choosing which unpinned slot to reuse.
    policy: Box<dyn ReplacementPolicy>,
}

impl BufferManager {
    /// Creates a buffer manager with the configured number of slots.
    pub fn new(
        file_mgr: Arc<FileManager>,
        log_mgr: Arc<LogManager>,
        config: BufferPoolConfig,
    ) -> Self {
        let num_buffers = config.num_buffers;
        let mut slots = Vec::with_capacity(num_buffers);
        let mut block_table = HashMap::with_capacity(num_buffers);
        for i in 0..num_buffers {
            let placeholder = BlockId::placeholder(i);
            slots.push(Arc::new(Buffer::new(
                Arc::clone(&file_mgr),
                Arc::clone(&log_mgr),
                placeholder.clone(),
            )));
            block_table.insert(placeholder, SlotId(i as u32));
        }

        Self {
            inner: Mutex::new(PoolInner {
                slots,
                block_table,
                available: num_buffers,
                policy: Box::new(OldestWriteFirst),
            }),
        }
    }

    /// Returns the number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Returns the number of unpinned slots.
    pub fn available(&self) -> usize {
        self.inner.lock().available
    }

    /// Checks whether a block is resident, without pinning it.
    pub fn contains(&self, blk: &BlockId) -> bool {
        self.inner.lock().block_table.contains_key(blk)
    }

    /// Returns the buffer caching a block, if resident, without
    /// pinning it.
    ///
    /// The handle does not protect the buffer from reassignment; pin
    /// the block before relying on its contents.
    pub fn lookup(&self, blk: &BlockId) -> Option<Arc<Buffer>> {
        let inner = self.inner.lock();
        inner
            .block_table
            .get(blk)
            .map(|&slot| Arc::clone(&inner.slots[slot.index()]))
    }

    /// Pins a buffer to the given block.
    ///
    /// If a buffer is already assigned to the block, that buffer is
    /// shared: pin counts stack, they are not exclusive locks.
    /// Otherwise an unpinned buffer is chosen by the replacement
    /// policy and reassigned, flushing its outstanding modification
    /// and loading the requested block. Fails with `BufferPoolFull`
    /// when every slot is pinned; never waits.
    pub fn pin(&self, blk: &BlockId) -> Result<Arc<Buffer>> {
        assert!(!blk.is_placeholder(), "cannot pin a placeholder identity");
        let mut inner = self.inner.lock();

        if let Some(&slot) = inner.block_table.get(blk) {
            trace!("pin hit for {} at {}", blk, slot);
            return Ok(inner.grab(slot));
        }

        let slot = inner.choose_unpinned().ok_or(StrataError::BufferPoolFull)?;
        let buffer = Arc::clone(&inner.slots[slot.index()]);
        let old = buffer.block();
        // The old mapping is removed only once the slot holds the new
        // block, so a failed reassignment leaves the pool unchanged.
        buffer.assign_to_block(blk)?;
        inner.block_table.remove(&old);
        inner.block_table.insert(blk.clone(), slot);
        debug!("reassigned {} from {} to {}", slot, old, blk);

        Ok(inner.grab(slot))
    }

    /// Allocates a new block in the given file and pins a buffer to it.
    ///
    /// The formatter writes the block's initial structure before it
    /// reaches disk. Fails with `BufferPoolFull` when every slot is
    /// pinned, without allocating the block.
    pub fn pin_new(&self, file_name: &str, fmtr: &dyn PageFormatter) -> Result<Arc<Buffer>> {
        let mut inner = self.inner.lock();

        let slot = inner.choose_unpinned().ok_or(StrataError::BufferPoolFull)?;
        let buffer = Arc::clone(&inner.slots[slot.index()]);
        let old = buffer.block();
        let blk = buffer.assign_to_new(file_name, fmtr)?;
        inner.block_table.remove(&old);
        inner.block_table.insert(blk.clone(), slot);
        debug!("allocated {} at {}", blk, slot);

        Ok(inner.grab(slot))
    }

    /// Unpins a buffer previously returned by `pin` or `pin_new`.
    ///
    /// Panics if the buffer is not pinned.
    pub fn unpin(&self, buffer: &Buffer) {
        let mut inner = self.inner.lock();
        buffer.unpin();
        if !buffer.is_pinned() {
            inner.available += 1;
        }
    }

    /// Flushes every buffer modified by the given transaction.
    ///
    /// Used at commit and rollback boundaries. Pin counts and the
    /// block mapping are unaffected.
    pub fn flush_all(&self, txn_id: TxnId) -> Result<()> {
        let inner = self.inner.lock();
        for buffer in &inner.slots {
            if buffer.modifying_txn() == Some(txn_id) {
                buffer.flush()?;
            }
        }
        Ok(())
    }
}

impl PoolInner {
    /// Pins the buffer in `slot` and returns a shared handle,
    /// maintaining the available count.
    fn grab(&mut self, slot: SlotId) -> Arc<Buffer> {
        let buffer = Arc::clone(&self.slots[slot.index()]);
        if !buffer.is_pinned() {
            self.available -= 1;
        }
        buffer.pin();
        buffer
    }

    /// Runs the replacement policy over the unpinned slots.
    fn choose_unpinned(&self) -> Option<SlotId> {
        let mut candidates = Vec::new();
        for (blk, &slot) in &self.block_table {
            let buffer = &self.slots[slot.index()];
            if buffer.is_pinned() {
                continue;
            }
            candidates.push(Candidate {
                slot,
                never_assigned: blk.is_placeholder(),
                modified: buffer.is_modified(),
                lsn: buffer.lsn(),
            });
        }
        self.policy.choose(&candidates)
    }
}
