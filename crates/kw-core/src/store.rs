//! Session artifact persistence
//!
//! After a session is created, the kernel ID and the full creation response
//! are written to fixed paths so that other processes on the host can find
//! the warmed kernel. There is a single writer per run; each run overwrites
//! the previous artifacts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WarmupError;
use crate::types::KernelId;

/// File holding the raw kernel identifier
pub const KERNEL_ID_FILE: &str = "kernel_id";

/// File holding the full session-creation response
pub const SESSION_INFO_FILE: &str = ".session_info";

/// Writes and reads session artifacts under one directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the artifacts live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the kernel ID file
    pub fn kernel_id_path(&self) -> PathBuf {
        self.dir.join(KERNEL_ID_FILE)
    }

    /// Path of the session info file
    pub fn session_info_path(&self) -> PathBuf {
        self.dir.join(SESSION_INFO_FILE)
    }

    /// Write both artifacts
    ///
    /// Creates the directory if it doesn't exist.
    pub fn persist(&self, kernel_id: &KernelId, session_info: &str) -> Result<(), WarmupError> {
        fs::create_dir_all(&self.dir).map_err(|source| WarmupError::Persist {
            path: self.dir.clone(),
            source,
        })?;

        let kernel_id_path = self.kernel_id_path();
        fs::write(&kernel_id_path, kernel_id.as_str()).map_err(|source| {
            WarmupError::Persist {
                path: kernel_id_path,
                source,
            }
        })?;

        let session_info_path = self.session_info_path();
        fs::write(&session_info_path, session_info).map_err(|source| WarmupError::Persist {
            path: session_info_path,
            source,
        })?;

        tracing::debug!("Persisted session artifacts to {:?}", self.dir);
        Ok(())
    }

    /// Read the persisted kernel ID
    ///
    /// Returns `Ok(None)` if no kernel ID has been written.
    pub fn read_kernel_id(&self) -> io::Result<Option<KernelId>> {
        match fs::read_to_string(self.kernel_id_path()) {
            Ok(contents) => Ok(Some(KernelId::new(contents.trim()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read the persisted session info
    pub fn read_session_info(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.session_info_path()) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
