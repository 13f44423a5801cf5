//! Output writing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Write access to the output tree. All paths are relative to the output root.
pub trait Saver {
    /// Write a UTF-8 text file, creating parent directories.
    fn save(&self, path: &str, content: &str) -> Result<(), SaveError>;

    /// Write raw bytes, creating parent directories.
    fn save_binary(&self, path: &str, content: &[u8]) -> Result<(), SaveError>;

    /// Remove the output root and create it again, empty.
    fn recreate_folder(&self) -> Result<(), SaveError>;
}

/// Saver backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsSaver {
    root: PathBuf,
}

impl FsSaver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<(), SaveError> {
        let target = self.root.join(path);
        let io_err = |source| SaveError::Io {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&target, content).map_err(io_err)
    }
}

impl Saver for FsSaver {
    fn save(&self, path: &str, content: &str) -> Result<(), SaveError> {
        self.write(path, content.as_bytes())
    }

    fn save_binary(&self, path: &str, content: &[u8]) -> Result<(), SaveError> {
        self.write(path, content)
    }

    fn recreate_folder(&self) -> Result<(), SaveError> {
        let io_err = |source| SaveError::Io {
            path: self.root.display().to_string(),
            source,
        };

        if self.root.exists() {
            tracing::debug!("Removing output folder {:?}", self.root);
            fs::remove_dir_all(&self.root).map_err(io_err)?;
        }
        fs::create_dir_all(&self.root).map_err(io_err)
    }
}
