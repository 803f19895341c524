use std::path::Path;
use std::sync::Arc;

use super::config::{FileWriterConfig, LiveConfig};
use crate::common::error::FileWriterResult;
use crate::common::file_system::{LocalFileSystem, SFileSystem};
use crate::storage::deferred_file_writer::DeferredFileWriter;
use crate::storage::writer_stats::{WriterCounters, WriterStats};

/// State every writer keeps a reference to after it was opened.
#[derive(Debug)]
pub struct WriterShared {
    pub config: LiveConfig,
    pub counters: WriterCounters,
}

/// Opens deferred writers and tracks how many are open, on disk and closed.
///
/// Configure it during start-up, before handing it (or clones of it) to the
/// code that opens files. Clones share configuration and counters.
#[derive(Debug, Clone)]
pub struct FileWriterManager<FS: SFileSystem = LocalFileSystem> {
    fs: FS,
    shared: Arc<WriterShared>,
}

impl FileWriterManager<LocalFileSystem> {
    pub fn new(config: FileWriterConfig) -> Self {
        Self::with_file_system(LocalFileSystem, config)
    }
}

impl Default for FileWriterManager<LocalFileSystem> {
    fn default() -> Self {
        Self::new(FileWriterConfig::default())
    }
}

impl<FS: SFileSystem> FileWriterManager<FS> {
    pub fn with_file_system(fs: FS, config: FileWriterConfig) -> Self {
        Self {
            fs,
            shared: Arc::new(WriterShared {
                config: LiveConfig::new(config),
                counters: WriterCounters::default(),
            }),
        }
    }

    pub fn open(&self, path: impl AsRef<Path>) -> FileWriterResult<DeferredFileWriter<FS>> {
        DeferredFileWriter::open(self.fs.clone(), path.as_ref(), self.shared.clone())
    }

    /// Staging capacity for writers opened from now on. Writers that are
    /// already open keep their capacity but use the new close threshold.
    pub fn set_min_file_size(&self, min_file_size: usize) {
        info!("minimum file size set to {} bytes", min_file_size);
        self.shared.config.set_min_file_size(min_file_size);
    }

    pub fn enable_force_flush(&self) {
        info!("force flush enabled");
        self.shared.config.enable_force_flush();
    }

    pub fn config(&self) -> FileWriterConfig {
        self.shared.config.snapshot()
    }

    pub fn stats(&self) -> WriterStats {
        self.shared.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stats_follow_writer_lifecycle() {
        let dir = tempdir().unwrap();
        let manager = FileWriterManager::new(FileWriterConfig::default().with_min_file_size(8));

        let mut quiet = manager.open(dir.path().join("quiet")).unwrap();
        let mut loud = manager.open(dir.path().join("loud")).unwrap();
        quiet.write(b"abc", true).unwrap();
        loud.write(b"0123456789", false).unwrap();
        assert_eq!(
            manager.stats(),
            WriterStats {
                opened: 2,
                active: 1,
                closed: 0
            }
        );

        quiet.close().unwrap();
        loud.close().unwrap();
        assert_eq!(
            manager.stats(),
            WriterStats {
                opened: 2,
                active: 0,
                closed: 2
            }
        );
    }

    #[test]
    fn test_clones_share_settings() {
        let manager: FileWriterManager = FileWriterManager::default();
        let other = manager.clone();

        other.set_min_file_size(64);
        other.enable_force_flush();
        assert_eq!(
            manager.config(),
            FileWriterConfig {
                min_file_size: 64,
                force_flush: true
            }
        );
    }

    #[test]
    fn test_new_capacity_only_for_later_writers() {
        let dir = tempdir().unwrap();
        let manager: FileWriterManager = FileWriterManager::default();

        let before = manager.open(dir.path().join("before")).unwrap();
        manager.set_min_file_size(32);
        let after = manager.open(dir.path().join("after")).unwrap();

        assert_eq!(before.capacity(), 128);
        assert_eq!(after.capacity(), 32);
    }
}
