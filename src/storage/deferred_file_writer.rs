use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::buffered_file_writer::BufferedFileWriter;
use crate::common::error::{FileWriterError, FileWriterResult};
use crate::common::file_system::{MAX_PATH_LEN, SFileSystem};
use crate::core::file_writer_manager::WriterShared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterMode {
    /// Everything written so far lives in the staging buffer.
    Buffering,
    /// The file exists and writes go straight to it.
    OnDisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Nothing was staged and no file was ever opened.
    Empty,
    /// Staged bytes were dropped: the payload never exceeded the threshold.
    Discarded { bytes: usize },
    /// The file holds the data. Includes any size it had before open.
    Persisted { total_bytes: u64 },
}

/// Append-only writer that only creates its file once there is enough data.
///
/// Writes are staged in a buffer sized to the minimum file size in effect at
/// open. The first write that would overflow it opens the file in append mode,
/// drains the staged bytes and switches to writing through. A writer that
/// never overflows is persisted on close only if its payload exceeds the
/// threshold; otherwise the file is never created.
///
/// Once the file exists, an I/O error that leaves bytes in an unknown state
/// poisons the writer: further writes fail with `Poisoned`, while `flush` and
/// `close` still drain whatever was accepted. Bytes that reached the OS are
/// never sent twice, and the totals count exactly the bytes accepted.
///
/// `close` consumes the writer. Dropping it without `close` finalizes it the
/// same way and logs any error.
pub struct DeferredFileWriter<FS: SFileSystem> {
    fs: FS,
    path: PathBuf,
    shared: Arc<WriterShared>,

    staging: Box<[u8]>,
    position: usize,
    file: Option<BufferedFileWriter<FS>>,

    total_bytes_written: u64,
    total_payload_bytes: u64,
    poisoned: bool,
    finished: bool,
}

fn validate_path(path: &Path) -> FileWriterResult<()> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err(FileWriterError::InvalidPath("empty path".to_string()));
    }
    if bytes.contains(&0) {
        return Err(FileWriterError::InvalidPath(format!(
            "NUL byte in '{}'",
            path.display()
        )));
    }
    if bytes.len() > MAX_PATH_LEN {
        return Err(FileWriterError::PathTooLong {
            len: bytes.len(),
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

impl<FS: SFileSystem> DeferredFileWriter<FS> {
    pub(crate) fn open(fs: FS, path: &Path, shared: Arc<WriterShared>) -> FileWriterResult<Self> {
        validate_path(path)?;

        // size of a previous file only seeds the counter, its content is never read
        let baseline = match fs.stat_size(path) {
            Ok(size) => size.unwrap_or(0),
            Err(e) => {
                debug!("stat '{}' failed, assuming new file: {}", path.display(), e);
                0
            }
        };

        let capacity = shared.config.min_file_size();
        shared.counters.on_open();

        Ok(Self {
            fs,
            path: path.to_path_buf(),
            shared,
            staging: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
            file: None,
            total_bytes_written: baseline,
            total_payload_bytes: 0,
            poisoned: false,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WriterMode {
        if self.file.is_some() {
            WriterMode::OnDisk
        } else {
            WriterMode::Buffering
        }
    }

    pub fn is_on_disk(&self) -> bool {
        self.mode() == WriterMode::OnDisk
    }

    /// Staging buffer size, fixed at open.
    pub fn capacity(&self) -> usize {
        self.staging.len()
    }

    /// Bytes currently staged and not yet on disk.
    pub fn buffered_len(&self) -> usize {
        self.position
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn total_payload_bytes(&self) -> u64 {
        self.total_payload_bytes
    }

    /// Appends `data`. `is_payload` marks it as content that counts towards
    /// the close threshold, as opposed to framing.
    ///
    /// If the file cannot be created, nothing from `data` is applied and the
    /// writer keeps buffering. A failed force flush leaves `data` accepted and
    /// counted; the bytes stay queued for the next flush.
    pub fn write(&mut self, data: &[u8], is_payload: bool) -> FileWriterResult<()> {
        if self.poisoned {
            return Err(FileWriterError::Poisoned {
                path: self.path.clone(),
            });
        }
        if self.file.is_none() && self.position + data.len() > self.staging.len() {
            self.spill()?;
        }

        match self.file.as_mut() {
            None => {
                let end = self.position + data.len();
                assert!(
                    end <= self.staging.len(),
                    "staging overflow: {} > {}",
                    end,
                    self.staging.len()
                );
                self.staging[self.position..end].copy_from_slice(data);
                self.position = end;
                if is_payload {
                    self.total_payload_bytes += data.len() as u64;
                }
            }
            Some(file) => {
                let before = file.total_written();
                let result = file.write_data(data);
                let accepted = file.total_written() - before;
                self.total_bytes_written += accepted;
                if is_payload {
                    self.total_payload_bytes += accepted;
                }
                if let Err(e) = result {
                    self.poisoned = true;
                    warn!(
                        "'{}': write failed after {} of {} bytes, refusing further writes",
                        self.path.display(),
                        accepted,
                        data.len()
                    );
                    return Err(FileWriterError::io(&self.path, e));
                }
                if self.shared.config.force_flush() {
                    file.flush().map_err(|e| FileWriterError::io(&self.path, e))?;
                }
            }
        }
        Ok(())
    }

    /// Pushes everything written so far to the OS. No-op while buffering.
    pub fn flush(&mut self) -> FileWriterResult<()> {
        match self.file.as_mut() {
            Some(file) => file.flush().map_err(|e| FileWriterError::io(&self.path, e)),
            None => Ok(()),
        }
    }

    /// Like `flush`, then fsyncs the file. No-op while buffering.
    pub fn sync(&mut self) -> FileWriterResult<()> {
        match self.file.as_mut() {
            Some(file) => file.sync().map_err(|e| FileWriterError::io(&self.path, e)),
            None => Ok(()),
        }
    }

    pub fn close(mut self) -> FileWriterResult<CloseOutcome> {
        self.finish()
    }

    /// Creates the file and drains the staging buffer into it.
    ///
    /// Once the file is open the writer is on disk for good. If draining
    /// fails, the staged bytes the file did not take are dropped and the
    /// writer is poisoned rather than retried.
    fn spill(&mut self) -> FileWriterResult<()> {
        let file = BufferedFileWriter::open(self.fs.clone(), &self.path)
            .map_err(|e| FileWriterError::io(&self.path, e))?;
        self.shared.counters.on_activate();

        let staged = std::mem::take(&mut self.position);
        let file = self.file.insert(file);
        let result = file.write_data(&self.staging[..staged]);
        let accepted = file.total_written();
        self.total_bytes_written += accepted;

        match result {
            Ok(()) => {
                debug!(
                    "'{}': {} staged bytes outgrew {} byte buffer, writing to disk",
                    self.path.display(),
                    staged,
                    self.staging.len()
                );
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                warn!(
                    "'{}': spilling staged bytes failed, {} of {} dropped",
                    self.path.display(),
                    staged as u64 - accepted,
                    staged
                );
                Err(FileWriterError::io(&self.path, e))
            }
        }
    }

    /// Writes still-staged bytes to a new file handle and closes it.
    fn persist_staged(&mut self) -> FileWriterResult<()> {
        let mut file = BufferedFileWriter::open(self.fs.clone(), &self.path)
            .map_err(|e| FileWriterError::io(&self.path, e))?;
        let staged = std::mem::take(&mut self.position);
        let result = file
            .write_data(&self.staging[..staged])
            .and_then(|_| file.flush());
        self.total_bytes_written += file.total_written() - file.pending() as u64;
        result.map_err(|e| FileWriterError::io(&self.path, e))?;
        file.close().map_err(|e| FileWriterError::io(&self.path, e))
    }

    fn finish(&mut self) -> FileWriterResult<CloseOutcome> {
        if self.finished {
            return Ok(CloseOutcome::Empty);
        }
        self.finished = true;
        self.shared.counters.on_close();

        let result = match self.file.take() {
            Some(file) => {
                debug!(
                    "'{}': closing with {} bytes still buffered",
                    self.path.display(),
                    file.pending()
                );
                let closed = file.close();
                self.shared.counters.on_deactivate();
                closed
                    .map(|_| CloseOutcome::Persisted {
                        total_bytes: self.total_bytes_written,
                    })
                    .map_err(|e| FileWriterError::io(&self.path, e))
            }
            None if self.position == 0 => Ok(CloseOutcome::Empty),
            None if self.total_payload_bytes > self.shared.config.min_file_size() as u64 => {
                self.persist_staged().map(|_| CloseOutcome::Persisted {
                    total_bytes: self.total_bytes_written,
                })
            }
            None => {
                let bytes = std::mem::take(&mut self.position);
                Ok(CloseOutcome::Discarded { bytes })
            }
        };

        self.staging = Box::default();

        match &result {
            Ok(outcome) => debug!("'{}' closed: {:?}", self.path.display(), outcome),
            Err(e) => warn!("'{}' close failed: {}", self.path.display(), e),
        }
        result
    }
}

impl<FS: SFileSystem> Drop for DeferredFileWriter<FS> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!("dropping writer for '{}': {}", self.path.display(), e);
        }
    }
}
