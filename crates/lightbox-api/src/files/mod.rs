//! Per-user image folders.
//!
//! Callers hold an `Arc<dyn FileStore>`; [`DiskFileStore`] is the real thing.
//! The folder is always derived from the username of the resolved session,
//! which is what keeps one user out of another's images.

mod disk;
pub mod upload;

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

pub use disk::DiskFileStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid file name: {0:?}")]
    InvalidFilename(String),
}

impl StorageError {
    /// Text shown to the user. Paths and OS errors stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageUnavailable { .. } => "Storage is unavailable. Please try again later.".into(),
            Self::NotFound(name) => format!("File not found: {}", name),
            Self::InvalidFilename(name) => format!("Invalid file name: {}", name),
        }
    }

    /// [`user_message`](Self::user_message), logging disk failures first.
    pub fn surface(&self, action: &str) -> String {
        if let Self::StorageUnavailable { .. } = self {
            error!("{} failed: {}", action, self);
        }
        self.user_message()
    }
}

/// Storage seam for everything that touches user folders.
pub trait FileStore: Send + Sync {
    /// Create the user's folder if it is missing. Idempotent.
    fn ensure_user_folder(&self, username: &str) -> Result<PathBuf, StorageError>;

    /// Filenames in the user's folder, sorted. A missing folder is empty.
    fn list_user_files(&self, username: &str) -> Result<Vec<String>, StorageError>;

    /// Write `bytes` under the final component of `filename` and return the
    /// stored name. An existing file with that name is replaced.
    fn save_file(&self, username: &str, filename: &str, bytes: &[u8]) -> Result<String, StorageError>;

    fn read_file(&self, username: &str, filename: &str) -> Result<Vec<u8>, StorageError>;
}
