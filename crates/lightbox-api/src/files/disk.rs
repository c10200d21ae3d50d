use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use super::{FileStore, StorageError};

const IMAGES_SUBFOLDER: &str = "images";

/// Stores uploads at `{root}/{username}/images/{filename}`.
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).map_err(|source| StorageError::StorageUnavailable {
            path: root.clone(),
            source,
        })?;
        info!("User data directory: {}", root.display());
        Ok(Self { root })
    }

    /// Path to the folder holding a user's images.
    pub fn images_dir(&self, username: &str) -> Result<PathBuf, StorageError> {
        let username = single_component(username)?;
        Ok(self.root.join(username).join(IMAGES_SUBFOLDER))
    }
}

impl FileStore for DiskFileStore {
    fn ensure_user_folder(&self, username: &str) -> Result<PathBuf, StorageError> {
        let dir = self.images_dir(username)?;
        fs::create_dir_all(&dir).map_err(|source| unavailable(&dir, source))?;
        Ok(dir)
    }

    fn list_user_files(&self, username: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.images_dir(username)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| unavailable(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| unavailable(&dir, e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn save_file(&self, username: &str, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let name = final_component(filename)?;
        let dir = self.ensure_user_folder(username)?;
        let path = dir.join(&name);

        fs::write(&path, bytes).map_err(|source| unavailable(&path, source))?;
        debug!("Saved {} ({} bytes) for {}", name, bytes.len(), username);
        Ok(name)
    }

    fn read_file(&self, username: &str, filename: &str) -> Result<Vec<u8>, StorageError> {
        let name = single_component(filename)?;
        let path = self.images_dir(username)?.join(name);

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

fn unavailable(path: &Path, source: io::Error) -> StorageError {
    StorageError::StorageUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// Accept `value` only if it is exactly one normal path component.
fn single_component(value: &str) -> Result<&str, StorageError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains(['/', '\\']) => Ok(value),
        _ => Err(StorageError::InvalidFilename(value.to_string())),
    }
}

/// Reduce an uploaded name to its last component, the way browsers report
/// `C:\fakepath\x.png` or `dir/x.png`.
fn final_component(filename: &str) -> Result<String, StorageError> {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match last {
        "" | "." | ".." => Err(StorageError::InvalidFilename(filename.to_string())),
        name => Ok(name.to_string()),
    }
}
