//! File manager for block-level file I/O.

use log::debug;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use strata_common::{Result, StorageConfig};

use crate::block::BlockId;
use crate::page::{Page, BLOCK_SIZE};

/// Configuration for the file manager.
#[derive(Debug, Clone)]
pub struct FileManagerConfig {
    /// Base directory for data files.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

impl From<&StorageConfig> for FileManagerConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            fsync_enabled: config.fsync_enabled,
        }
    }
}

/// Manages reading and writing blocks to disk files.
///
/// Each file name maps to a separate data file under the data directory.
/// Blocks come into existence through [`FileManager::append`]; reading a
/// block past the current end of its file yields a zeroed page rather
/// than an error, so a block that was allocated but never written reads
/// back as empty content.
pub struct FileManager {
    /// Configuration.
    config: FileManagerConfig,
    /// Open file handles keyed by file name.
    files: Mutex<HashMap<String, FileHandle>>,
}

/// Handle for an open data file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Number of blocks in the file.
    num_blocks: i64,
}

impl FileManager {
    /// Creates a new file manager.
    pub fn new(config: FileManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Generates the path for a given file name.
    fn file_path(&self, file_name: &str) -> PathBuf {
        self.config.data_dir.join(file_name)
    }

    /// Opens or creates a data file.
    ///
    /// The handle map lock must be held by the caller.
    fn open_file<'a>(
        &self,
        files: &'a mut HashMap<String, FileHandle>,
        file_name: &str,
    ) -> Result<&'a mut FileHandle> {
        match files.entry(file_name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.file_path(file_name);
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&path)?;

                let file_size = file.metadata()?.len();
                let num_blocks = (file_size / BLOCK_SIZE as u64) as i64;
                debug!("opened data file {:?} ({} blocks)", path, num_blocks);

                Ok(entry.insert(FileHandle { file, num_blocks }))
            }
        }
    }

    /// Reads a block from disk into the given page.
    ///
    /// A block beyond the current end of the file reads back as a zeroed
    /// page. Panics if `blk` is a placeholder identity.
    pub fn read(&self, blk: &BlockId, page: &mut Page) -> Result<()> {
        assert!(!blk.is_placeholder(), "cannot read a placeholder block");

        let mut files = self.files.lock();
        let handle = self.open_file(&mut files, blk.file_name())?;

        if blk.block_num() >= handle.num_blocks {
            page.clear();
            return Ok(());
        }

        let offset = (blk.block_num() as u64) * (BLOCK_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.read_exact(page.as_mut_slice())?;

        Ok(())
    }

    /// Writes a page to the given block on disk.
    ///
    /// Panics if `blk` is a placeholder identity.
    pub fn write(&self, blk: &BlockId, page: &Page) -> Result<()> {
        assert!(!blk.is_placeholder(), "cannot write a placeholder block");

        let mut files = self.files.lock();
        let handle = self.open_file(&mut files, blk.file_name())?;

        let offset = (blk.block_num() as u64) * (BLOCK_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(page.as_slice())?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        // Update block count if we extended the file
        if blk.block_num() >= handle.num_blocks {
            handle.num_blocks = blk.block_num() + 1;
        }

        Ok(())
    }

    /// Appends a new block to the given file, initialized from `page`.
    ///
    /// Returns the identity of the newly allocated block.
    pub fn append(&self, file_name: &str, page: &Page) -> Result<BlockId> {
        let mut files = self.files.lock();
        let handle = self.open_file(&mut files, file_name)?;

        let block_num = handle.num_blocks;
        let blk = BlockId::new(file_name, block_num);

        let offset = (block_num as u64) * (BLOCK_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(page.as_slice())?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        handle.num_blocks = block_num + 1;

        Ok(blk)
    }

    /// Returns the number of blocks in a file.
    pub fn block_count(&self, file_name: &str) -> Result<i64> {
        let mut files = self.files.lock();
        let handle = self.open_file(&mut files, file_name)?;
        Ok(handle.num_blocks)
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        let files = self.files.lock();
        for handle in files.values() {
            handle.file.sync_all()?;
        }
        Ok(())
    }
}
