//! File-backed record store: an append-only log of put/delete operations.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use stash_types::{Record, Value};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// A single logged mutation.
///
/// On-disk format of each entry:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogOp)]
/// ```
/// Values are carried as JSON text inside the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum LogOp {
    Put { key: String, json: String },
    Delete { key: String },
}

impl LogOp {
    fn apply(self, live: &mut BTreeMap<String, String>) {
        match self {
            Self::Put { key, json } => {
                live.insert(key, json);
            }
            Self::Delete { key } => {
                live.remove(&key);
            }
        }
    }
}

/// Flush/sync strategy for the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Hand writes to the OS and rely on its page cache (fastest, least durable).
    #[default]
    OsDefault,
}

/// Configuration for a [`LogRecordStore`].
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
    /// Rewrite the log down to its live records when it is opened.
    pub compact_on_open: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            compact_on_open: true,
        }
    }
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// The writable end of the log.
trait LogSink: Write + Send {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

struct LogWriter {
    sink: Box<dyn LogSink>,
    /// End of the last fully written entry.
    offset: u64,
}

impl LogWriter {
    fn new(file: File, offset: u64) -> Self {
        Self {
            sink: Box::new(file),
            offset,
        }
    }

    /// Write one entry. On failure the file is cut back to `offset`, so a
    /// rejected write never reaches a later replay.
    fn append(&mut self, entry: &[u8], sync: bool) -> io::Result<()> {
        let written = self
            .sink
            .write_all(entry)
            .and_then(|()| self.sink.flush())
            .and_then(|()| if sync { self.sink.sync() } else { Ok(()) });

        if let Err(e) = written {
            if let Err(rollback) = self.sink.truncate_to(self.offset) {
                warn!(
                    offset = self.offset,
                    error = %rollback,
                    "failed to discard partial log entry"
                );
            }
            return Err(e);
        }

        self.offset += entry.len() as u64;
        Ok(())
    }
}

/// Durable record store backed by a single append-only log file.
///
/// Every `put` and `delete` appends one framed entry. `list_all` replays
/// the file front-to-back; the last entry for a key wins. Entries that fail
/// their CRC check are skipped, and a torn entry at the tail (from a crash
/// mid-write) ends the replay. `delete_all` truncates the file and
/// [`compact`](LogRecordStore::compact) rewrites it to one entry per live
/// key.
pub struct LogRecordStore {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    config: LogConfig,
}

impl LogRecordStore {
    /// Open (or create) the log file at `path`.
    pub fn open(path: &Path, config: LogConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(path, true)?;
        let offset = file.metadata()?.len();

        let store = Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter::new(file, offset)),
            config,
        };

        if store.config.compact_on_open && offset > 0 {
            store.compact()?;
        }

        info!(path = %path.display(), bytes = store.offset(), "record log opened");
        Ok(store)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes.
    pub fn offset(&self) -> u64 {
        self.lock().map(|w| w.offset).unwrap_or(0)
    }

    /// Rewrite the log so that it holds exactly one entry per live key.
    ///
    /// The new log is written to a temporary file next to the old one and
    /// renamed over it, so a crash mid-compaction leaves the old log intact.
    pub fn compact(&self) -> StoreResult<()> {
        let mut w = self.lock()?;

        let live = self.replay()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            for (key, json) in &live {
                let entry = frame(&LogOp::Put {
                    key: key.clone(),
                    json: json.clone(),
                })?;
                out.write_all(&entry)?;
            }
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        let file = open_append(&self.path, false)?;
        let len = file.metadata()?.len();
        let before = w.offset;
        *w = LogWriter::new(file, len);

        info!(
            records = live.len(),
            before_bytes = before,
            after_bytes = w.offset,
            "record log compacted"
        );
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, LogWriter>> {
        self.writer.lock().map_err(|_| StoreError::Poisoned)
    }

    fn append(&self, op: &LogOp) -> StoreResult<()> {
        let entry = frame(op)?;
        let sync = matches!(self.config.sync_mode, SyncMode::EveryWrite);

        let mut w = self.lock()?;
        let entry_offset = w.offset;
        w.append(&entry, sync)?;

        debug!(offset = entry_offset, len = entry.len(), "record log append");
        Ok(())
    }

    /// Fold the log into its live `key → json` view.
    ///
    /// The whole file is read at once; compaction keeps it close to the
    /// size of the live data.
    fn replay(&self) -> StoreResult<BTreeMap<String, String>> {
        let bytes = fs::read(&self.path)?;
        let mut live = BTreeMap::new();
        let mut rest = bytes.as_slice();
        let mut entries = 0usize;

        while !rest.is_empty() {
            let offset = bytes.len() - rest.len();
            let Some((parsed, next)) = split_frame(rest) else {
                warn!(offset, remaining = rest.len(), "torn log tail; stopping replay");
                break;
            };
            match parsed {
                Ok(op) => op.apply(&mut live),
                Err(reason) => warn!(offset, reason, "skipping damaged log entry"),
            }
            entries += 1;
            rest = next;
        }

        debug!(entries, live = live.len(), "record log replayed");
        Ok(live)
    }
}

fn open_append(path: &Path, create: bool) -> io::Result<File> {
    OpenOptions::new()
        .create(create)
        .read(true)
        .append(true)
        .open(path)
}

/// Encode one operation as a framed log entry.
fn frame(op: &LogOp) -> StoreResult<Vec<u8>> {
    let payload = bincode::serialize(op).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("log entry exceeds 4 GiB".to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut entry = Vec::with_capacity(HEADER_SIZE + payload.len());
    entry.extend_from_slice(&length.to_le_bytes());
    entry.extend_from_slice(&crc.to_le_bytes());
    entry.extend_from_slice(&payload);
    Ok(entry)
}

/// Split the first entry off `buf`.
///
/// Returns `None` when `buf` does not hold a whole entry. A whole entry
/// whose payload is damaged comes back as `Err` with the reason, so the
/// caller can step over it.
fn split_frame(buf: &[u8]) -> Option<(Result<LogOp, &'static str>, &[u8])> {
    let (header, body) = buf.split_at_checked(HEADER_SIZE)?;
    let (length, crc) = header.split_at(4);
    let length = u32::from_le_bytes(length.try_into().ok()?) as usize;
    let crc = u32::from_le_bytes(crc.try_into().ok()?);
    if length == 0 {
        return None;
    }

    let (payload, rest) = body.split_at_checked(length)?;
    let op = if crc32fast::hash(payload) != crc {
        Err("CRC mismatch")
    } else {
        bincode::deserialize::<LogOp>(payload).map_err(|_| "undecodable payload")
    };
    Some((op, rest))
}

impl RecordStore for LogRecordStore {
    fn list_all(&self) -> StoreResult<Vec<Record>> {
        let live = self.replay()?;
        let mut records = Vec::with_capacity(live.len());
        for (key, json) in live {
            match serde_json::from_str::<Value>(&json) {
                Ok(value) => records.push(Record::new(key, value)),
                Err(e) => warn!(key = %key, error = %e, "stored value is not valid JSON; skipping"),
            }
        }
        Ok(records)
    }

    fn put(&self, key: &str, value: &Value) -> StoreResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.append(&LogOp::Put {
            key: key.to_string(),
            json,
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.append(&LogOp::Delete {
            key: key.to_string(),
        })
    }

    fn delete_all(&self) -> StoreResult<()> {
        let mut w = self.lock()?;

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        if matches!(self.config.sync_mode, SyncMode::EveryWrite) {
            file.sync_all()?;
        }
        drop(file);

        *w = LogWriter::new(open_append(&self.path, false)?, 0);

        debug!("record log truncated");
        Ok(())
    }
}

impl std::fmt::Debug for LogRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRecordStore")
            .field("path", &self.path)
            .field("bytes", &self.offset())
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}
