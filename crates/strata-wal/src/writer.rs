//! Log manager for appending and flushing WAL records.

use bytes::Bytes;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use strata_common::{Result, StorageConfig, TxnId};

use crate::record::{LogRecord, Lsn};

/// Name of the log file within the WAL directory.
pub const LOG_FILE_NAME: &str = "strata.wal";

/// Configuration for the log manager.
#[derive(Debug, Clone)]
pub struct LogManagerConfig {
    /// Directory for the WAL file.
    pub wal_dir: PathBuf,
    /// Enable fsync on flush.
    pub fsync_enabled: bool,
}

impl Default for LogManagerConfig {
    fn default() -> Self {
        Self {
            wal_dir: PathBuf::from("./data/wal"),
            fsync_enabled: true,
        }
    }
}

impl From<&StorageConfig> for LogManagerConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_dir: config.wal_dir.clone(),
            fsync_enabled: config.fsync_enabled,
        }
    }
}

/// Thread-safe log manager over a single append-only log file.
///
/// Assigns LSNs in append order and tracks the highest LSN known to be
/// durable. `flush(lsn)` is the ordering primitive the buffer layer
/// relies on: after it returns, every record with an LSN up to and
/// including `lsn` has reached disk.
pub struct LogManager {
    /// Configuration.
    config: LogManagerConfig,
    /// Serialized mutable state.
    inner: Mutex<LogInner>,
}

struct LogInner {
    /// The open log file, positioned at its end.
    file: File,
    /// Next LSN to assign.
    next_lsn: u64,
    /// Highest LSN known to be durable.
    flushed_lsn: u64,
}

impl LogManager {
    /// Creates a new log manager, recovering LSN state from an existing
    /// log file if one is present.
    ///
    /// A torn tail (an incomplete record at the end of the file, e.g.
    /// after a crash mid-append) is truncated away.
    pub fn new(config: LogManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.wal_dir)?;

        let path = config.wal_dir.join(LOG_FILE_NAME);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        // Scan the existing log to find the last assigned LSN.
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let mut buf = Bytes::from(data);

        let mut last_lsn = 0u64;
        let mut valid_len = 0u64;
        let mut records = 0usize;
        while !buf.is_empty() {
            match LogRecord::decode(&mut buf) {
                Ok(record) => {
                    last_lsn = record.lsn.0;
                    valid_len += record.encoded_len() as u64;
                    records += 1;
                }
                Err(_) => {
                    warn!(
                        "dropping torn tail of {:?} after {} valid records",
                        path, records
                    );
                    break;
                }
            }
        }

        file.set_len(valid_len)?;
        file.seek(SeekFrom::End(0))?;
        if records > 0 {
            info!("recovered {} log records, next LSN {}", records, last_lsn + 1);
        }

        Ok(Self {
            config,
            inner: Mutex::new(LogInner {
                file,
                next_lsn: last_lsn + 1,
                flushed_lsn: last_lsn,
            }),
        })
    }

    /// Appends a record to the log and returns its LSN.
    ///
    /// The record is written to the OS but not necessarily durable;
    /// call [`LogManager::flush`] to guarantee durability.
    pub fn append(&self, txn_id: TxnId, payload: Bytes) -> Result<Lsn> {
        let mut inner = self.inner.lock();

        let lsn = Lsn(inner.next_lsn);
        let record = LogRecord::new(lsn, txn_id, payload);
        inner.file.write_all(&record.encode())?;
        inner.next_lsn += 1;

        trace!("appended log record {}", lsn);
        Ok(lsn)
    }

    /// Ensures every record with an LSN up to and including `lsn` is
    /// durable. A no-op when those records are already flushed.
    pub fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut inner = self.inner.lock();

        if lsn.0 <= inner.flushed_lsn {
            return Ok(());
        }

        if self.config.fsync_enabled {
            inner.file.sync_data()?;
        } else {
            inner.file.flush()?;
        }
        inner.flushed_lsn = inner.next_lsn - 1;
        debug!("flushed log through LSN {}", inner.flushed_lsn);

        Ok(())
    }

    /// Returns the highest LSN known to be durable.
    pub fn flushed_lsn(&self) -> Lsn {
        Lsn(self.inner.lock().flushed_lsn)
    }

    /// Returns the next LSN that will be assigned.
    pub fn next_lsn(&self) -> Lsn {
        Lsn(self.inner.lock().next_lsn)
    }

    /// Returns an iterator replaying the log from the beginning.
    ///
    /// Records are checksum-verified; the iterator yields one error and
    /// stops if it encounters corruption.
    pub fn iter(&self) -> Result<LogIterator> {
        let path = self.config.wal_dir.join(LOG_FILE_NAME);
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Ok(LogIterator {
            buf: Bytes::from(data),
            failed: false,
        })
    }
}

/// Iterator over the records of a log file, in append order.
pub struct LogIterator {
    buf: Bytes,
    failed: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        match LogRecord::decode(&mut self.buf) {
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_manager(dir: &Path) -> LogManager {
        LogManager::new(LogManagerConfig {
            wal_dir: dir.to_path_buf(),
            fsync_enabled: false,
        })
        .unwrap()
    }

    #[test]
    fn test_append_assigns_sequential_lsns() {
        let dir = tempdir().unwrap();
        let lm = create_test_manager(dir.path());

        let l1 = lm.append(TxnId(1), Bytes::from_static(b"a")).unwrap();
        let l2 = lm.append(TxnId(1), Bytes::from_static(b"b")).unwrap();
        let l3 = lm.append(TxnId(2), Bytes::from_static(b"c")).unwrap();

        assert_eq!(l1, Lsn::FIRST);
        assert_eq!(l2, Lsn(2));
        assert_eq!(l3, Lsn(3));
        assert_eq!(lm.next_lsn(), Lsn(4));
    }

    #[test]
    fn test_flush_advances_flushed_lsn() {
        let dir = tempdir().unwrap();
        let lm = create_test_manager(dir.path());

        assert_eq!(lm.flushed_lsn(), Lsn::INVALID);

        let l1 = lm.append(TxnId(1), Bytes::from_static(b"a")).unwrap();
        let l2 = lm.append(TxnId(1), Bytes::from_static(b"b")).unwrap();
        assert_eq!(lm.flushed_lsn(), Lsn::INVALID);

        lm.flush(l1).unwrap();
        // Flushing syncs the whole file, so later records become durable too
        assert_eq!(lm.flushed_lsn(), l2);

        // Already durable: no-op
        lm.flush(l2).unwrap();
        assert_eq!(lm.flushed_lsn(), l2);
    }

    #[test]
    fn test_iter_replays_in_order() {
        let dir = tempdir().unwrap();
        let lm = create_test_manager(dir.path());

        for i in 0..5u8 {
            lm.append(TxnId(1), Bytes::copy_from_slice(&[i])).unwrap();
        }

        let records: Vec<_> = lm.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.lsn, Lsn(i as u64 + 1));
            assert_eq!(record.payload.as_ref(), &[i as u8]);
        }
    }

    #[test]
    fn test_reopen_recovers_next_lsn() {
        let dir = tempdir().unwrap();

        {
            let lm = create_test_manager(dir.path());
            lm.append(TxnId(1), Bytes::from_static(b"a")).unwrap();
            lm.append(TxnId(1), Bytes::from_static(b"b")).unwrap();
            lm.append(TxnId(1), Bytes::from_static(b"c")).unwrap();
            lm.flush(Lsn(3)).unwrap();
        }

        let lm = create_test_manager(dir.path());
        assert_eq!(lm.flushed_lsn(), Lsn(3));

        let l4 = lm.append(TxnId(2), Bytes::from_static(b"d")).unwrap();
        assert_eq!(l4, Lsn(4));
    }

    #[test]
    fn test_reopen_truncates_torn_tail() {
        let dir = tempdir().unwrap();

        {
            let lm = create_test_manager(dir.path());
            lm.append(TxnId(1), Bytes::from_static(b"good")).unwrap();
            lm.flush(Lsn(1)).unwrap();
        }

        // Simulate a crash mid-append: garbage at the end of the file
        let path = dir.path().join(LOG_FILE_NAME);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xDE, 0xAD, 0xBE]).unwrap();
        drop(file);

        let lm = create_test_manager(dir.path());
        let records: Vec<_> = lm.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.as_ref(), b"good");

        // The torn bytes are gone and appends continue cleanly
        let l2 = lm.append(TxnId(1), Bytes::from_static(b"next")).unwrap();
        assert_eq!(l2, Lsn(2));
        let records: Vec<_> = lm.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_iter_stops_on_corruption() {
        let dir = tempdir().unwrap();
        let lm = create_test_manager(dir.path());

        lm.append(TxnId(1), Bytes::from_static(b"one")).unwrap();
        lm.append(TxnId(1), Bytes::from_static(b"two")).unwrap();

        // Corrupt the second record's payload in place
        let path = dir.path().join(LOG_FILE_NAME);
        let first_len = LogRecord::new(Lsn(1), TxnId(1), Bytes::from_static(b"one")).encoded_len();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[first_len + LogRecord::HEADER_SIZE] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut iter = lm.iter().unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
