use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileWriterError {
    #[error("path too long: {len} bytes (max {max})")]
    PathTooLong { len: usize, max: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writer for '{}' lost data to an earlier I/O error", .path.display())]
    Poisoned { path: PathBuf },
}

impl FileWriterError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        FileWriterError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The underlying OS error kind, if this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            FileWriterError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type FileWriterResult<T> = std::result::Result<T, FileWriterError>;
