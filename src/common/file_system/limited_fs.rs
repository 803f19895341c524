use std::io::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{FileFlags, LocalFileHandle, LocalFileSystem, SFileSystem};

/// Local file system that stops accepting writes once a byte budget is spent,
/// failing with ENOSPC like a full disk. Clones share the budget.
#[derive(Debug, Clone)]
pub struct LimitedFileSystem {
    budget: Arc<AtomicU64>,
}

impl LimitedFileSystem {
    pub fn with_budget(budget: u64) -> Self {
        Self {
            budget: Arc::new(AtomicU64::new(budget)),
        }
    }

    pub fn unlimited() -> Self {
        Self::with_budget(u64::MAX)
    }

    pub fn set_budget(&self, budget: u64) {
        self.budget.store(budget, Ordering::SeqCst);
    }
}

impl SFileSystem for LimitedFileSystem {
    type Handle = LocalFileHandle;

    fn open_file(&self, path: &Path, flags: FileFlags) -> Result<Self::Handle> {
        LocalFileSystem.open_file(path, flags)
    }

    fn write(&self, handle: &Self::Handle, buffer: &[u8]) -> Result<u64> {
        let left = self.budget.load(Ordering::SeqCst);
        if left == 0 {
            return Err(Error::from_raw_os_error(libc::ENOSPC));
        }
        let allowed = buffer.len().min(usize::try_from(left).unwrap_or(usize::MAX));
        let written = LocalFileSystem.write(handle, &buffer[..allowed])?;
        if left != u64::MAX {
            self.budget.fetch_sub(written, Ordering::SeqCst);
        }
        Ok(written)
    }

    fn fsync(&self, handle: &Self::Handle) -> Result<()> {
        LocalFileSystem.fsync(handle)
    }

    fn stat_size(&self, path: &Path) -> Result<Option<u64>> {
        LocalFileSystem.stat_size(path)
    }
}
