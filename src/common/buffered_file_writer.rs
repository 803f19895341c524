use std::io::{Error, ErrorKind, Result};
use std::path::Path;

use crate::common::file_system::{FileFlags, SFileHandle, SFileSystem};

pub const FILE_BUFFER_SIZE: usize = 4096;

/// User-space write buffer in front of an append-mode handle.
///
/// Bytes accepted by `write_data` sit here until the buffer fills, `flush` is
/// called, or the writer is closed. Dropping the writer flushes and closes the
/// handle, logging instead of returning any failure.
pub struct BufferedFileWriter<FS: SFileSystem> {
    fs: FS,
    buffer: Box<[u8]>,
    offset: usize,
    total_written: u64,
    handle: FS::Handle,
}

/// Writes until `data` is exhausted or the file system fails. Returns the
/// bytes the OS accepted along with the outcome, so callers never resend them.
fn write_all<FS: SFileSystem>(fs: &FS, handle: &FS::Handle, data: &[u8]) -> (usize, Result<()>) {
    let mut done = 0;
    while done < data.len() {
        match fs.write(handle, &data[done..]) {
            Ok(0) => {
                return (
                    done,
                    Err(Error::new(ErrorKind::WriteZero, "failed to write buffered data")),
                );
            }
            Ok(written) => done += (written as usize).min(data.len() - done),
            Err(e) => return (done, Err(e)),
        }
    }
    (done, Ok(()))
}

impl<FS: SFileSystem> BufferedFileWriter<FS> {
    /// Opens `path` in append-create mode.
    pub fn open(fs: FS, path: &Path) -> Result<Self> {
        let handle = fs.open_file(path, FileFlags::append_create())?;
        Ok(Self {
            fs,
            buffer: vec![0u8; FILE_BUFFER_SIZE].into_boxed_slice(),
            offset: 0,
            total_written: 0,
            handle,
        })
    }

    /// Bytes accepted so far, whether or not they reached the OS yet. After a
    /// failed write this counts exactly the part that was taken.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn pending(&self) -> usize {
        self.offset
    }

    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.offset + data.len() > self.buffer.len() {
            self.flush()?;
        }

        if data.len() >= self.buffer.len() {
            let (written, result) = write_all(&self.fs, &self.handle, data);
            self.total_written += written as u64;
            return result;
        }

        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        self.total_written += data.len() as u64;
        Ok(())
    }

    /// Hands every buffered byte to the OS. On failure only the bytes the OS
    /// did not take stay buffered, so retrying never duplicates data.
    pub fn flush(&mut self) -> Result<()> {
        if self.offset == 0 {
            return Ok(());
        }
        let (written, result) = write_all(&self.fs, &self.handle, &self.buffer[..self.offset]);
        if written > 0 {
            self.buffer.copy_within(written..self.offset, 0);
            self.offset -= written;
        }
        result
    }

    /// Flushes, then waits for the OS to persist the file.
    pub fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.fs.fsync(&self.handle)
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.handle.close()
    }
}

impl<FS: SFileSystem> Drop for BufferedFileWriter<FS> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!(
                "dropping writer for '{}' lost {} buffered bytes: {}",
                self.handle.path().display(),
                self.offset,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::file_system::LocalFileSystem;
    use crate::common::file_system::limited_fs::LimitedFileSystem;
    use tempfile::tempdir;

    #[test]
    fn test_small_writes_stay_buffered_until_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffered");

        let mut writer = BufferedFileWriter::open(LocalFileSystem, &path).unwrap();
        writer.write_data(b"hello").unwrap();
        writer.write_data(b" world").unwrap();
        assert_eq!(writer.pending(), 11);
        assert_eq!(std::fs::read(&path).unwrap(), b"");

        writer.flush().unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert_eq!(writer.total_written(), 11);
        writer.close().unwrap();
    }

    #[test]
    fn test_large_write_goes_straight_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large");

        let mut writer = BufferedFileWriter::open(LocalFileSystem, &path).unwrap();
        writer.write_data(b"ab").unwrap();
        let big = vec![9u8; FILE_BUFFER_SIZE + 10];
        writer.write_data(&big).unwrap();

        // the pending prefix is drained first so ordering is preserved
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), FILE_BUFFER_SIZE + 12);
        assert_eq!(&on_disk[..2], b"ab");
        assert_eq!(writer.pending(), 0);
        writer.close().unwrap();
    }

    #[test]
    fn test_filling_buffer_drains_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fill");

        let mut writer = BufferedFileWriter::open(LocalFileSystem, &path).unwrap();
        let chunk = vec![1u8; 1000];
        for _ in 0..5 {
            writer.write_data(&chunk).unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap().len(), 4000);
        assert_eq!(writer.pending(), 1000);

        writer.sync().unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 5000);
        writer.close().unwrap();
    }

    #[test]
    fn test_drop_flushes_pending_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped");

        {
            let mut writer = BufferedFileWriter::open(LocalFileSystem, &path).unwrap();
            writer.write_data(b"kept").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"kept");
    }

    #[test]
    fn test_partial_flush_keeps_only_unwritten_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial");
        let fs = LimitedFileSystem::unlimited();

        let mut writer = BufferedFileWriter::open(fs.clone(), &path).unwrap();
        writer.write_data(b"0123456789").unwrap();
        fs.set_budget(4);
        assert!(writer.flush().is_err());
        assert_eq!(writer.pending(), 6);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123");

        fs.set_budget(u64::MAX);
        writer.flush().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
        writer.close().unwrap();
    }

    #[test]
    fn test_failed_write_through_counts_accepted_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short");
        let fs = LimitedFileSystem::with_budget(100);

        let mut writer = BufferedFileWriter::open(fs, &path).unwrap();
        let big = vec![3u8; FILE_BUFFER_SIZE * 2];
        assert!(writer.write_data(&big).is_err());
        assert_eq!(writer.total_written(), 100);
        assert_eq!(writer.pending(), 0);
        assert_eq!(std::fs::read(&path).unwrap().len(), 100);
    }
}
