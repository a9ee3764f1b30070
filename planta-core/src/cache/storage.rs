//! File storage for the plant cache snapshot.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::models::Plant;

/// Well-known file holding the serialized plant list.
pub const CACHE_FILENAME: &str = "plants.json";

/// Reads and writes the complete plant snapshot as a single JSON document.
///
/// There is no schema version and no incremental writes: every save replaces
/// the whole file.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    data_dir: PathBuf,
}

impl CacheStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Loads the last persisted snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.
    pub fn load(&self) -> Result<Option<Vec<Plant>>, CacheError> {
        let path = self.path();

        match fs::read(&path) {
            Ok(bytes) => {
                let plants = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::ParseError(path, e))?;
                Ok(Some(plants))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::IoError(path, e)),
        }
    }

    /// Overwrites the snapshot, creating the data directory if needed.
    pub fn save(&self, plants: &[Plant]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| CacheError::IoError(self.data_dir.clone(), e))?;

        let path = self.path();
        let bytes =
            serde_json::to_vec_pretty(plants).map_err(|e| CacheError::ParseError(path.clone(), e))?;

        fs::write(&path, bytes).map_err(|e| CacheError::IoError(path, e))?;

        Ok(())
    }
}

/// Errors that can occur while reading or writing the cache.
#[derive(Debug)]
pub enum CacheError {
    /// I/O error reading or writing the snapshot.
    IoError(PathBuf, io::Error),
    /// The snapshot could not be encoded or decoded.
    ParseError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            CacheError::ParseError(path, e) => {
                write!(f, "Invalid plant cache {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::IoError(_, e) => Some(e),
            CacheError::ParseError(_, e) => Some(e),
        }
    }
}
