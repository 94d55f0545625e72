//! Optional gzip compression of finished output directories.
//!
//! Files may still be held open briefly by other processes (indexers, virus scanners, network
//! file systems), so every file operation is retried a bounded number of times when it fails with
//! a sharing or locking error. Any other error, or running out of attempts, is returned to the
//! caller, which logs it and moves on.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Windows `ERROR_SHARING_VIOLATION`.
const ERROR_SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`.
const ERROR_LOCK_VIOLATION: i32 = 33;

/// Bounded retry settings for sharing-violation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, delay: Duration::from_millis(200) }
    }
}

/// True for errors caused by another process holding the file.
#[must_use]
pub fn is_sharing_violation(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::ResourceBusy | ErrorKind::WouldBlock)
        || matches!(error.raw_os_error(), Some(ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION))
}

/// Runs `op`, retrying sharing violations according to `policy`.
///
/// # Errors
/// Returns the first non-sharing error, or the last sharing error once attempts are exhausted.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    label: &str,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if is_sharing_violation(&e) && attempt < attempts => {
                debug!("{label}: attempt {attempt}/{attempts} failed ({e}), retrying");
                thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Gzip-compresses `path` to `<path>.gz` and removes the original.
///
/// # Errors
/// Returns an error if the file cannot be read, written, or removed.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut reader = BufReader::new(File::open(path)?);
    let mut encoder =
        GzEncoder::new(BufWriter::new(File::create(&gz_path)?), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    drop(reader);
    fs::remove_file(path)?;
    Ok(gz_path)
}

/// Compresses every regular file in `dir` that is not already gzipped. Returns the number of
/// files compressed.
///
/// # Errors
/// Returns an error if the directory cannot be listed or a file cannot be compressed.
pub fn compress_output_dir(dir: &Path, policy: &RetryPolicy) -> Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list output directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_none_or(|ext| ext != "gz"))
        .collect();
    files.sort();

    for file in &files {
        let label = file.display().to_string();
        with_retry(policy, &label, || compress_file(file))
            .with_context(|| format!("Failed to compress {label}"))?;
    }
    Ok(files.len())
}

/// Compresses `dir`, logging instead of returning any failure.
pub fn compress_output_dir_or_warn(dir: &Path, policy: &RetryPolicy) {
    match compress_output_dir(dir, policy) {
        Ok(count) => debug!("Compressed {count} files in {}", dir.display()),
        Err(e) => warn!("Skipping compression of {}: {e:#}", dir.display()),
    }
}
