//! Resumable, keyed cache of completed-job records.
//!
//! The cache keeps one record per key in memory and mirrors inserts to an append-only,
//! tab-delimited file so that a later run can skip work that already finished.
//!
//! # Locking
//!
//! Two independent locks are used:
//!
//! - `records` (an `RwLock`) guards the in-memory map. The set of known keys is the map's key set,
//!   so membership and mapping cannot disagree. Lookups take the read lock and never wait on disk.
//! - `file_lock` (a `Mutex`) serializes every write to disk, so rows from concurrent appends never
//!   interleave. Appends take it without touching `records`; only `initialize` holds both, always
//!   file lock first.
//!
//! # Recovery
//!
//! A file whose last row is incomplete, or which fails to parse anywhere, is treated as empty:
//! every dataset in it is simply reprocessed. When the same key appears on several rows the last
//! row wins.

use anyhow::{Context, Result};
use fgsweep_metrics::{Metric, TransientSearchMetrics, write_metrics_auto};
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// A record that can be stored in a [`ResultCache`].
pub trait CacheRecord: Metric + Send + Sync {
    /// The record's unique key.
    fn cache_key(&self) -> &str;
}

impl CacheRecord for TransientSearchMetrics {
    fn cache_key(&self) -> &str {
        &self.dataset_id
    }
}

/// Thread-safe record cache backed by an incremental file.
pub struct ResultCache<T: CacheRecord> {
    path: PathBuf,
    records: RwLock<BTreeMap<String, T>>,
    file_lock: Mutex<()>,
}

impl<T: CacheRecord> ResultCache<T> {
    /// Creates an empty cache persisted to `path`. Nothing is read until
    /// [`initialize`](Self::initialize) is called.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), records: RwLock::new(BTreeMap::new()), file_lock: Mutex::new(()) }
    }

    /// Path of the incremental file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the incremental file, replacing the in-memory records. Returns the number of records
    /// loaded.
    ///
    /// A missing file leaves the cache empty. A file that cannot be read or parsed is logged,
    /// moved to [`set_aside_path`](Self::set_aside_path), and also leaves the cache empty; this
    /// never returns an error.
    pub fn initialize(&self) -> usize {
        let _guard = self.file_lock.lock();
        if !self.path.exists() {
            return 0;
        }
        let loaded = match read_records::<T>(&self.path) {
            Ok(loaded) => loaded,
            Err(e) => {
                let aside = self.set_aside_path();
                warn!(
                    "Ignoring unreadable results file {} and starting fresh (moved to {}): {e:#}",
                    self.path.display(),
                    aside.display()
                );
                // New rows must not be appended after a partial row.
                if let Err(e) = fs::rename(&self.path, &aside) {
                    warn!("Failed to move {}: {e}", self.path.display());
                }
                BTreeMap::new()
            }
        };
        let count = loaded.len();
        *self.records.write() = loaded;
        if count > 0 {
            info!("Loaded {count} completed results from {}", self.path.display());
        }
        count
    }

    /// Where an unreadable incremental file is moved so that a fresh one can be started.
    #[must_use]
    pub fn set_aside_path(&self) -> PathBuf {
        let mut aside = self.path.as_os_str().to_owned();
        aside.push(".corrupt");
        PathBuf::from(aside)
    }

    /// True if a record with `key` exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.read().contains_key(key)
    }

    /// A copy of the record with `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.records.read().get(key).cloned()
    }

    /// Inserts `record` unless its key is already present. Returns true if it was inserted.
    pub fn add(&self, record: T) -> bool {
        let mut records = self.records.write();
        if records.contains_key(record.cache_key()) {
            return false;
        }
        records.insert(record.cache_key().to_string(), record);
        true
    }

    /// Removes the record with `key`. Returns true if a record was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.records.write().remove(key).is_some()
    }

    /// Removes the record with `key` and rewrites the incremental file without it. Returns true if
    /// a record was removed.
    ///
    /// If the rewrite fails the record is restored so that memory and disk agree.
    ///
    /// # Errors
    /// Returns an error if the incremental file could not be rewritten.
    pub fn remove_and_write(&self, key: &str) -> Result<bool> {
        let Some(removed) = self.records.write().remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.compact() {
            self.records.write().entry(key.to_string()).or_insert(removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Inserts `record` and, only if it was inserted, appends it to the incremental file.
    ///
    /// If the append fails the insert is rolled back so that memory and disk agree.
    ///
    /// # Errors
    /// Returns an error if the record could not be written.
    pub fn add_and_write(&self, record: T) -> Result<bool> {
        // Insert and append happen under one file lock, as compact reads memory under it.
        let _guard = self.file_lock.lock();
        let key = record.cache_key().to_string();
        if !self.add(record.clone()) {
            return Ok(false);
        }
        if let Err(e) = self.write_row(&record) {
            self.remove(&key);
            return Err(e);
        }
        Ok(true)
    }

    /// Appends one row for `record` to the incremental file, writing a header first if the file is
    /// new or empty, and flushes before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub fn append_to_file(&self, record: &T) -> Result<()> {
        let _guard = self.file_lock.lock();
        self.write_row(record)
    }

    /// Appends one row. The caller holds `file_lock`.
    fn write_row(&self, record: &T) -> Result<()> {
        let needs_header = !fs::metadata(&self.path).is_ok_and(|m| m.len() > 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open results file: {}", self.path.display()))?;
        let mut writer =
            csv::WriterBuilder::new().delimiter(b'\t').has_headers(needs_header).from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        writer.flush().with_context(|| format!("Failed to flush {}", self.path.display()))?;
        Ok(())
    }

    /// Writes every record, ordered by key, to `path` as a full dump.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_all_to_file(&self, path: &Path) -> Result<()> {
        let values = self.values();
        let _guard = self.file_lock.lock();
        write_metrics_auto(path, &values)
    }

    /// Rewrites the incremental file from memory, dropping superseded rows.
    ///
    /// The new contents are written to a temporary file that then replaces the original.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or replaced.
    pub fn compact(&self) -> Result<()> {
        let _guard = self.file_lock.lock();
        let values = self.values();
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_path(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            for value in &values {
                writer.serialize(value)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True if the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Every key, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Every record, ordered by key.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }
}

/// Parses the incremental file. A non-empty file must end in a newline; anything else means the
/// last append was interrupted.
fn read_records<T: CacheRecord>(path: &Path) -> Result<BTreeMap<String, T>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if bytes.last().is_some_and(|&b| b != b'\n') {
        anyhow::bail!("last row is incomplete");
    }

    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(bytes.as_slice());
    let mut records = BTreeMap::new();
    for (row, result) in reader.deserialize::<T>().enumerate() {
        let record = result.with_context(|| format!("Malformed row {}", row + 1))?;
        records.insert(record.cache_key().to_string(), record);
    }
    Ok(records)
}
