use std::ffi::CString;
use std::io::{Error, ErrorKind, Result};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use super::FileFlags;

const CLOSED_FD: RawFd = -1;

pub trait SFileHandle: Send {
    fn path(&self) -> &Path;

    /// Releases the descriptor. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
}

pub trait SFileSystem: Clone + Send + Sync {
    type Handle: SFileHandle;

    fn open_file(&self, path: &Path, flags: FileFlags) -> Result<Self::Handle>;

    /// Single write call; may be short. Returns the bytes accepted by the OS.
    fn write(&self, handle: &Self::Handle, buffer: &[u8]) -> Result<u64>;

    fn fsync(&self, handle: &Self::Handle) -> Result<()>;

    /// Size of the file at `path`, or `None` when nothing exists there.
    fn stat_size(&self, path: &Path) -> Result<Option<u64>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[derive(Debug)]
pub struct LocalFileHandle {
    pub path: PathBuf,
    pub fd: RawFd,
}

impl LocalFileHandle {
    pub fn is_open(&self) -> bool {
        self.fd != CLOSED_FD
    }
}

impl SFileHandle for LocalFileHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        let fd = std::mem::replace(&mut self.fd, CLOSED_FD);
        let ret = unsafe { libc::close(fd) };
        if ret < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for LocalFileHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to close handle for '{}': {}", self.path.display(), e);
        }
    }
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|e| Error::new(ErrorKind::InvalidInput, e))
}

#[cfg(unix)]
impl SFileSystem for LocalFileSystem {
    type Handle = LocalFileHandle;

    fn open_file(&self, path: &Path, flags: FileFlags) -> Result<Self::Handle> {
        let mut open_flags = if flags.contains(FileFlags::WRITE) {
            libc::O_WRONLY
        } else {
            libc::O_RDONLY
        };
        open_flags |= libc::O_CLOEXEC;

        if flags.contains(FileFlags::APPEND) {
            open_flags |= libc::O_APPEND;
        }
        if flags.contains(FileFlags::CREATE) {
            open_flags |= libc::O_CREAT;
        }

        let c_path = c_path(path)?;
        let fd = unsafe { libc::open(c_path.as_ptr(), open_flags, 0o666 as libc::c_uint) };

        if fd == -1 {
            return Err(Error::last_os_error());
        }

        Ok(LocalFileHandle {
            path: path.to_path_buf(),
            fd,
        })
    }

    fn write(&self, handle: &Self::Handle, buffer: &[u8]) -> Result<u64> {
        if !handle.is_open() {
            return Err(Error::new(ErrorKind::BrokenPipe, "write on closed handle"));
        }
        loop {
            let result = unsafe {
                libc::write(
                    handle.fd,
                    buffer.as_ptr() as *const libc::c_void,
                    buffer.len(),
                )
            };

            if result == -1 {
                let err = Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            return Ok(result as u64);
        }
    }

    fn fsync(&self, handle: &Self::Handle) -> Result<()> {
        let result = unsafe { libc::fsync(handle.fd) };

        if result == -1 {
            Err(Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn stat_size(&self, path: &Path) -> Result<Option<u64>> {
        if path.as_os_str().is_empty() {
            return Ok(None);
        }

        let c_path = c_path(path)?;
        let mut status = std::mem::MaybeUninit::<libc::stat>::uninit();
        if unsafe { libc::stat(c_path.as_ptr(), status.as_mut_ptr()) } != 0 {
            let err = Error::last_os_error();
            if err.kind() == ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(err);
        }

        let status = unsafe { status.assume_init() };
        Ok(Some(status.st_size as u64))
    }
}
