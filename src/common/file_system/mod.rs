pub mod static_fs;

#[cfg(test)]
pub(crate) mod limited_fs;

use bitflags::bitflags;

pub use static_fs::{LocalFileHandle, LocalFileSystem, SFileHandle, SFileSystem};

/// Longest path accepted, excluding the trailing NUL handed to the OS.
pub const MAX_PATH_LEN: usize = 1023;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u16 {
        const WRITE = 1 << 0;
        const APPEND = 1 << 1;
        const CREATE = 1 << 2;
    }
}

impl FileFlags {
    /// Write-only, positioned at end of file, created when missing.
    pub const fn append_create() -> Self {
        FileFlags::WRITE.union(FileFlags::APPEND).union(FileFlags::CREATE)
    }
}
