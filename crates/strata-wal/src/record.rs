//! WAL log record format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use strata_common::{Result, StrataError, TxnId};

/// Log Sequence Number - unique identifier for each log record.
///
/// LSNs are monotonically increasing 64-bit values assigned by the log
/// manager in append order; comparing two LSNs orders the writes they
/// tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Lsn(pub u64);

impl Lsn {
    /// Invalid/uninitialized LSN.
    pub const INVALID: Lsn = Lsn(0);

    /// First valid LSN.
    pub const FIRST: Lsn = Lsn(1);

    /// Returns true if this is a valid LSN.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Lsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single log record in the WAL.
///
/// Record format on disk:
/// - header (16 bytes):
///   - lsn: 8 bytes
///   - txn_id: 4 bytes
///   - payload_len: 4 bytes
/// - payload: variable length
/// - checksum: 4 bytes (CRC32 of header + payload)
///
/// All integers are little-endian. The payload is opaque to the log
/// manager; higher layers define its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// LSN of this record.
    pub lsn: Lsn,
    /// Transaction that produced this record.
    pub txn_id: TxnId,
    /// Record payload.
    pub payload: Bytes,
}

impl LogRecord {
    /// Size of the record header in bytes.
    pub const HEADER_SIZE: usize = 16;
    /// Size of the checksum in bytes.
    pub const CHECKSUM_SIZE: usize = 4;
    /// Maximum payload size (64 KB).
    pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

    /// Creates a new log record.
    ///
    /// Panics if the payload exceeds [`LogRecord::MAX_PAYLOAD_SIZE`].
    pub fn new(lsn: Lsn, txn_id: TxnId, payload: Bytes) -> Self {
        assert!(
            payload.len() <= Self::MAX_PAYLOAD_SIZE,
            "log record payload exceeds maximum size"
        );
        Self {
            lsn,
            txn_id,
            payload,
        }
    }

    /// Returns the total encoded size of this record.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }

    /// Serializes the record to bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u64_le(self.lsn.0);
        buf.put_u32_le(self.txn_id.0);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);

        // Compute and write checksum
        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);
        buf.freeze()
    }

    /// Deserializes one record from the front of `buf`, advancing it.
    ///
    /// Returns `WalCorrupted` on truncation or checksum mismatch; in
    /// that case `buf` is left unchanged.
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE + Self::CHECKSUM_SIZE {
            return Err(StrataError::WalCorrupted {
                lsn: 0,
                reason: "truncated record header".to_string(),
            });
        }

        let mut header = &buf[..Self::HEADER_SIZE];
        let lsn = header.get_u64_le();
        let txn_id = header.get_u32_le();
        let payload_len = header.get_u32_le() as usize;

        if payload_len > Self::MAX_PAYLOAD_SIZE {
            return Err(StrataError::WalCorrupted {
                lsn,
                reason: format!("payload length {} exceeds maximum", payload_len),
            });
        }

        let total = Self::HEADER_SIZE + payload_len + Self::CHECKSUM_SIZE;
        if buf.len() < total {
            return Err(StrataError::WalCorrupted {
                lsn,
                reason: "truncated record payload".to_string(),
            });
        }

        // Read and verify checksum
        let computed = crc32fast::hash(&buf[..Self::HEADER_SIZE + payload_len]);
        let mut trailer = &buf[Self::HEADER_SIZE + payload_len..total];
        let stored = trailer.get_u32_le();
        if stored != computed {
            return Err(StrataError::WalCorrupted {
                lsn,
                reason: format!("checksum mismatch: stored={}, computed={}", stored, computed),
            });
        }

        let payload = buf.slice(Self::HEADER_SIZE..Self::HEADER_SIZE + payload_len);
        buf.advance(total);

        Ok(Self {
            lsn: Lsn(lsn),
            txn_id: TxnId(txn_id),
            payload,
        })
    }
}
