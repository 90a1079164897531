//! Guarded access to files in the state directory.
//!
//! Every record `<name>.json` has a sibling `<name>.json.lock` that writers
//! and readers hold with an exclusive `fs2` lock. Writes land in a temp file
//! first and are renamed over the record, so a reader never sees a torn file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive hold on a record's lock file, released on drop.
#[derive(Debug)]
pub struct RecordLock {
    file: File,
    lock_path: PathBuf,
}

impl RecordLock {
    /// Lock `record`, polling until `timeout_ms` elapses.
    pub fn acquire(record: &Path, timeout_ms: u64) -> Result<Self> {
        let lock_path = lock_path_for(record);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file, lock_path }),
                Err(err) if is_contended(&err) => {
                    if Instant::now() >= deadline {
                        return Err(Error::LockFailed(lock_path));
                    }
                    trace!(path = %lock_path.display(), "waiting for record lock");
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_contended(err: &io::Error) -> bool {
    // Windows reports sharing and lock violations as raw OS errors 32 and 33.
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)))
}

/// `<record>.lock`
pub fn lock_path_for(record: &Path) -> PathBuf {
    let mut name = record.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Replace `path` with `data` through a temp file and rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let stem = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    let temp = path.with_file_name(format!(".{stem}.{}.tmp", Uuid::new_v4().simple()));

    let written = File::create(&temp).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    let renamed = written.and_then(|()| fs::rename(&temp, path));
    if let Err(err) = renamed {
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(err));
    }
    Ok(())
}

/// Replace a record while holding its lock.
pub fn write_record(path: &Path, data: &[u8], timeout_ms: u64) -> Result<()> {
    let _guard = RecordLock::acquire(path, timeout_ms)?;
    write_atomic(path, data)
}

/// Read a record while holding its lock; `None` when it does not exist.
pub fn read_record(path: &Path, timeout_ms: u64) -> Result<Option<String>> {
    let _guard = RecordLock::acquire(path, timeout_ms)?;
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::Io(err)),
    }
}
