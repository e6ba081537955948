//! Whole-file snapshot persistence for the directories.
//!
//! A directory serializes itself and hands the bytes to a [`SnapshotStore`];
//! every write replaces the previous snapshot in full.
use log::debug;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::error::StorageError;

pub trait SnapshotStore: Send + Sync {
    /// Read the last snapshot, `None` if nothing was ever written.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the snapshot. Returns only once the bytes are durable.
    fn store(&self, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Snapshot kept in a single file, replaced atomically through a sibling
/// temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn store(&self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).map_err(|e| self.io_error(e))?;
        file.write_all(bytes).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!("Saved {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}

/// In-memory snapshot that counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Vec<u8>>>,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails, as if the medium disappeared.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default())
    }

    fn store(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io {
                path: "<memory>".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "write refused"),
            });
        }
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = Some(bytes.to_vec());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
