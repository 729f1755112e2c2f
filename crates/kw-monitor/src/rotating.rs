//! Size-capped rotating log
//!
//! Records are appended one per line. Before a write that would bring the
//! active file to `max_bytes` or beyond, the file is rolled:
//! `log.N-1 -> log.N`, ..., `log -> log.1`, and the oldest rotation is
//! discarded. With no backups the active file is truncated instead.
//! An empty file is never rolled, so a single oversized record is written
//! rather than producing an empty rotation.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::MonitorError;

/// Append-only log rotated by size
#[derive(Debug)]
pub struct RotatingLog {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    file: File,
    size: u64,
}

impl RotatingLog {
    /// Open (or create) the log at `path`, continuing after any existing
    /// content
    ///
    /// A `max_bytes` of zero disables rotation.
    pub fn open(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        backup_count: u32,
    ) -> Result<Self, MonitorError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| MonitorError::Log {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = open_append(&path).map_err(|source| MonitorError::Log {
            path: path.clone(),
            source,
        })?;
        let size = file
            .metadata()
            .map_err(|source| MonitorError::Log {
                path: path.clone(),
                source,
            })?
            .len();

        Ok(Self {
            path,
            max_bytes,
            backup_count,
            file,
            size,
        })
    }

    /// Active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of rotation `index` (1 is the most recent)
    pub fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// Append `record` followed by a newline, rotating first if needed
    pub fn write_record(&mut self, record: &str) -> Result<(), MonitorError> {
        let len = record.len() as u64 + 1;

        if self.should_roll(len) {
            self.roll().map_err(|source| MonitorError::Log {
                path: self.path.clone(),
                source,
            })?;
        }

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record.as_bytes());
        line.push(b'\n');

        self.file
            .write_all(&line)
            .and_then(|()| self.file.flush())
            .map_err(|source| MonitorError::Log {
                path: self.path.clone(),
                source,
            })?;
        self.size += len;
        Ok(())
    }

    fn should_roll(&self, incoming: u64) -> bool {
        self.max_bytes > 0 && self.size > 0 && self.size + incoming >= self.max_bytes
    }

    fn roll(&mut self) -> io::Result<()> {
        if self.backup_count == 0 {
            self.file.set_len(0)?;
            self.size = 0;
            tracing::debug!("Truncated {:?}", self.path);
            return Ok(());
        }

        for index in (1..self.backup_count).rev() {
            let src = self.backup_path(index);
            if src.exists() {
                replace(&src, &self.backup_path(index + 1))?;
            }
        }
        replace(&self.path, &self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.size = 0;
        tracing::debug!("Rotated {:?}", self.path);
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Rename `src` over `dst`, removing `dst` first where rename won't replace
fn replace(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::remove_file(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(src, dst)
}
