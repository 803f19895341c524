use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Files whose payload never exceeds this many bytes are not created.
pub const DEFAULT_MIN_FILE_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileWriterConfig {
    /// Staging buffer capacity for newly opened writers, and the payload
    /// threshold checked when a still-buffering writer is closed.
    pub min_file_size: usize,
    /// Flush every direct-to-disk write to the OS as soon as it is made.
    pub force_flush: bool,
}

impl Default for FileWriterConfig {
    fn default() -> Self {
        FileWriterConfig {
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            force_flush: false,
        }
    }
}

impl FileWriterConfig {
    pub fn with_min_file_size(mut self, min_file_size: usize) -> Self {
        self.min_file_size = min_file_size;
        self
    }

    pub fn with_force_flush(mut self) -> Self {
        self.force_flush = true;
        self
    }
}

/// The settings a manager shares with the writers it opened.
///
/// Capacity is read once when a writer opens; the threshold and force flush
/// are read on every use.
#[derive(Debug)]
pub struct LiveConfig {
    min_file_size: AtomicUsize,
    force_flush: AtomicBool,
}

impl LiveConfig {
    pub fn new(config: FileWriterConfig) -> Self {
        Self {
            min_file_size: AtomicUsize::new(config.min_file_size),
            force_flush: AtomicBool::new(config.force_flush),
        }
    }

    pub fn min_file_size(&self) -> usize {
        self.min_file_size.load(Ordering::Relaxed)
    }

    pub fn force_flush(&self) -> bool {
        self.force_flush.load(Ordering::Relaxed)
    }

    pub fn set_min_file_size(&self, min_file_size: usize) {
        self.min_file_size.store(min_file_size, Ordering::Relaxed);
    }

    /// One-way; there is no way to turn force flush back off.
    pub fn enable_force_flush(&self) {
        self.force_flush.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FileWriterConfig {
        FileWriterConfig {
            min_file_size: self.min_file_size(),
            force_flush: self.force_flush(),
        }
    }
}
