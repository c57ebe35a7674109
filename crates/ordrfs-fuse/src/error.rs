use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

/// Failure of a single filesystem call, carrying its error class.
#[derive(Debug, Error)]
pub enum FsError {
    /// A read-only or restricted-write rule of the synthetic namespace.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("bad file handle: {0}")]
    BadHandle(u64),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Backing-store failure, propagated unchanged.
    #[error("backing store: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// The errno reported to the kernel for this failure.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::PermissionDenied(_) => libc::EACCES,
            FsError::NotFound(_) => libc::ENOENT,
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::IsADirectory(_) => libc::EISDIR,
            FsError::BadHandle(_) => libc::EBADF,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
