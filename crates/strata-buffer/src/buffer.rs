//! Buffer slots caching the contents of disk blocks.

use log::debug;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use strata_common::{Result, TxnId};
use strata_storage::{BlockId, FileManager, Page};
use strata_wal::{LogManager, Lsn};

use crate::formatter::PageFormatter;

/// One buffer pool slot caching the contents of one disk block.
///
/// A buffer tracks how many callers are currently using it (the pin
/// count), which transaction last modified it, and the LSN of that
/// modification. Writing the page back goes through [`Buffer::flush`],
/// which makes the modification's log record durable before the data
/// write (write-ahead ordering).
///
/// Buffers are shared as `Arc<Buffer>` handles while pinned; the pool
/// retains ownership of every slot for its whole life. Pin count and
/// block binding are mutated only under the pool's lock.
pub struct Buffer {
    file_mgr: Arc<FileManager>,
    log_mgr: Arc<LogManager>,
    /// Number of callers currently using this buffer.
    pin_count: AtomicU32,
    /// Block binding, page image, and modification metadata.
    state: RwLock<BufferState>,
}

struct BufferState {
    page: Page,
    block: BlockId,
    /// Transaction that last modified the page, or None if clean.
    txn: Option<TxnId>,
    /// LSN of the last logged modification.
    lsn: Option<Lsn>,
}

impl Buffer {
    /// Creates a buffer bound to the given (placeholder) identity.
    pub(crate) fn new(
        file_mgr: Arc<FileManager>,
        log_mgr: Arc<LogManager>,
        initial: BlockId,
    ) -> Self {
        Self {
            file_mgr,
            log_mgr,
            pin_count: AtomicU32::new(0),
            state: RwLock::new(BufferState {
                page: Page::new(),
                block: initial,
                txn: None,
                lsn: None,
            }),
        }
    }

    /// Returns the identity of the block this buffer is bound to.
    pub fn block(&self) -> BlockId {
        self.state.read().block.clone()
    }

    /// Returns the current pin count.
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Returns true if this buffer is in use.
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Increments the pin count.
    pub(crate) fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the pin count.
    ///
    /// Panics if the buffer is not pinned; unpinning a buffer that was
    /// never pinned is a programming error, not a recoverable condition.
    pub(crate) fn unpin(&self) {
        let prev = self.pin_count.load(Ordering::Acquire);
        assert!(prev > 0, "unpin on a buffer that is not pinned");
        self.pin_count.store(prev - 1, Ordering::Release);
    }

    /// Returns true if the page holds a modification that has not been
    /// written back.
    pub fn is_modified(&self) -> bool {
        self.state.read().txn.is_some()
    }

    /// Returns the transaction that last modified this buffer, if the
    /// modification is still outstanding.
    pub fn modifying_txn(&self) -> Option<TxnId> {
        self.state.read().txn
    }

    /// Returns the LSN of the last logged modification.
    pub fn lsn(&self) -> Option<Lsn> {
        self.state.read().lsn
    }

    /// Records that `txn` modified this buffer.
    ///
    /// `lsn` is the log record covering the modification; pass None for
    /// an unlogged change, which keeps any previously recorded LSN.
    pub fn set_modified(&self, txn: TxnId, lsn: Option<Lsn>) {
        let mut state = self.state.write();
        state.txn = Some(txn);
        if let Some(lsn) = lsn {
            state.lsn = Some(lsn);
        }
    }

    /// Reads the page contents.
    pub fn contents(&self) -> MappedRwLockReadGuard<'_, Page> {
        RwLockReadGuard::map(self.state.read(), |s| &s.page)
    }

    /// Writes to the page contents.
    pub fn contents_mut(&self) -> MappedRwLockWriteGuard<'_, Page> {
        RwLockWriteGuard::map(self.state.write(), |s| &mut s.page)
    }

    /// Writes the page back to disk if it holds an outstanding
    /// modification, making the modification's log record durable
    /// first.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.write();
        self.flush_locked(&mut state)
    }

    fn flush_locked(&self, state: &mut BufferState) -> Result<()> {
        if state.txn.is_some() {
            debug_assert!(!state.block.is_placeholder());
            // Log record first, data page second
            if let Some(lsn) = state.lsn {
                self.log_mgr.flush(lsn)?;
            }
            self.file_mgr.write(&state.block, &state.page)?;
            state.txn = None;
            debug!("flushed buffer for {}", state.block);
        }
        Ok(())
    }

    /// Rebinds this buffer to an existing block, flushing any
    /// outstanding modification of the old block and reading the new
    /// block's contents.
    ///
    /// The binding is updated only after the read succeeds.
    pub(crate) fn assign_to_block(&self, blk: &BlockId) -> Result<()> {
        let mut state = self.state.write();
        self.flush_locked(&mut state)?;
        self.file_mgr.read(blk, &mut state.page)?;
        state.block = blk.clone();
        state.lsn = None;
        Ok(())
    }

    /// Rebinds this buffer to a freshly allocated block of `file_name`,
    /// formatted by `fmtr`.
    ///
    /// Flushes any outstanding modification of the old block first.
    /// Returns the identity of the new block.
    pub(crate) fn assign_to_new(
        &self,
        file_name: &str,
        fmtr: &dyn PageFormatter,
    ) -> Result<BlockId> {
        let mut state = self.state.write();
        self.flush_locked(&mut state)?;
        fmtr.format(&mut state.page);
        let blk = self.file_mgr.append(file_name, &state.page)?;
        state.block = blk.clone();
        state.lsn = None;
        Ok(blk)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Buffer")
            .field("block", &state.block)
            .field("pin_count", &self.pin_count())
            .field("txn", &state.txn)
            .field("lsn", &state.lsn)
            .finish()
    }
}
