//! Append-only file writers that defer creating their file until enough data
//! has been written.
//!
//! Writers are opened from a [`FileWriterManager`]. Each one stages up to the
//! configured minimum file size in memory; the file is created only when a
//! write would overflow that buffer, or at close when the payload written
//! exceeds the threshold. Speculatively opened files that never receive real
//! content therefore never appear on disk.
//!
//! ```no_run
//! use deferfile::{CloseOutcome, FileWriterConfig, FileWriterManager};
//!
//! let manager = FileWriterManager::new(FileWriterConfig::default().with_min_file_size(256));
//! let mut writer = manager.open("/tmp/flow-0001.pcap")?;
//! writer.write(b"pcap header", false)?;
//! writer.write(&[0u8; 64], true)?;
//! assert!(matches!(writer.close()?, CloseOutcome::Discarded { .. }));
//! # Ok::<(), deferfile::FileWriterError>(())
//! ```

#[macro_use]
extern crate log;

pub mod common;
pub mod core;
pub mod storage;

pub use crate::common::error::{FileWriterError, FileWriterResult};
pub use crate::common::file_system::{FileFlags, LocalFileSystem, SFileHandle, SFileSystem, MAX_PATH_LEN};
pub use crate::core::config::{FileWriterConfig, DEFAULT_MIN_FILE_SIZE};
pub use crate::core::file_writer_manager::FileWriterManager;
pub use crate::storage::deferred_file_writer::{CloseOutcome, DeferredFileWriter, WriterMode};
pub use crate::storage::writer_stats::WriterStats;
