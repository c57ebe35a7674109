//! Passthrough to the real backing directory.
//!
//! Every method maps one filesystem operation onto the equivalent call on
//! `{root}/{relative path}` with no added semantics. Blocking syscalls without
//! a `tokio::fs` counterpart run on the blocking pool.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::warn;

use crate::attr::{FileAttributes, FileKind};
use crate::error::{FsError, FsResult};
use crate::synth::DirEntry;

/// Filesystem statistics of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

pub(crate) async fn blocking<T, F>(f: F) -> FsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
        .map_err(FsError::from)
}

fn c_path(path: &Path) -> FsResult<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| FsError::InvalidPath(path.display().to_string()))
}

fn cvt(rc: libc::c_int) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// `None` leaves the timestamp untouched.
fn timespec(time: Option<SystemTime>) -> libc::timespec {
    let Some(time) = time else {
        return libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        };
    };
    let (sec, nsec) = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            match d.subsec_nanos() {
                0 => (-(d.as_secs() as i64), 0),
                n => (-(d.as_secs() as i64) - 1, 1_000_000_000 - n),
            }
        }
    };
    libc::timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as _,
    }
}

pub struct Backing {
    root: PathBuf,
}

impl Backing {
    pub fn new(root: PathBuf) -> Self {
        Backing { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a namespace-relative path onto the backing store.
    ///
    /// Only plain components are accepted, so a path can never escape the
    /// backing root.
    pub fn resolve(&self, rel: &str) -> FsResult<PathBuf> {
        let rel = rel.trim_start_matches('/');
        let mut full = self.root.clone();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                _ => return Err(FsError::InvalidPath(rel.to_string())),
            }
        }
        if rel.contains('\0') {
            return Err(FsError::InvalidPath(rel.to_string()));
        }
        Ok(full)
    }

    pub async fn lstat(&self, path: &Path) -> FsResult<FileAttributes> {
        let meta = fs::symlink_metadata(path).await?;
        Ok(FileAttributes::from_metadata(&meta))
    }

    /// List a real directory. Entries whose names are not UTF-8 are skipped.
    pub async fn read_dir(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let kind = FileKind::from_file_type(entry.file_type().await?);
            match entry.file_name().into_string() {
                Ok(name) => entries.push(DirEntry { name, kind }),
                Err(raw) => warn!(dir = %path.display(), name = ?raw, "skipping non UTF-8 entry"),
            }
        }
        Ok(entries)
    }

    /// Like [`read_dir`](Self::read_dir), but a missing directory (or a
    /// non-directory in its place) lists as empty.
    pub async fn read_dir_if_exists(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        match self.read_dir(path).await {
            Err(FsError::Io(e))
                if e.kind() == io::ErrorKind::NotFound
                    || e.raw_os_error() == Some(libc::ENOTDIR) =>
            {
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub async fn access(&self, path: &Path, mask: u32) -> FsResult<()> {
        let c = c_path(path)?;
        blocking(move || cvt(unsafe { libc::access(c.as_ptr(), mask as libc::c_int) })).await
    }

    /// Open an existing file with `open(2)`-style flags.
    pub async fn open(&self, path: &Path, flags: i32) -> FsResult<File> {
        let opts = open_options(flags);
        let path = path.to_path_buf();
        blocking(move || opts.open(path)).await
    }

    /// Create (or open, without `O_EXCL`) a file with the given mode.
    pub async fn create(&self, path: &Path, mode: u32, flags: i32) -> FsResult<File> {
        let mut opts = open_options(flags);
        opts.create(true).mode(mode);
        if flags & libc::O_EXCL != 0 {
            opts.create_new(true);
        }
        if flags & libc::O_ACCMODE == libc::O_RDONLY {
            opts.write(true);
        }
        let path = path.to_path_buf();
        blocking(move || opts.open(path)).await
    }

    pub async fn mkdir(&self, path: &Path, mode: u32) -> FsResult<()> {
        fs::DirBuilder::new().mode(mode).create(path).await?;
        Ok(())
    }

    /// Create the mirrored parent directories of `path` if they are missing.
    pub async fn ensure_parent(&self, path: &Path) -> FsResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    pub async fn rmdir(&self, path: &Path) -> FsResult<()> {
        fs::remove_dir(path).await?;
        Ok(())
    }

    pub async fn unlink(&self, path: &Path) -> FsResult<()> {
        fs::remove_file(path).await?;
        Ok(())
    }

    pub async fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        fs::rename(from, to).await?;
        Ok(())
    }

    pub async fn link(&self, target: &Path, link: &Path) -> FsResult<()> {
        fs::hard_link(target, link).await?;
        Ok(())
    }

    pub async fn symlink(&self, target: &Path, link: &Path) -> FsResult<()> {
        fs::symlink(target, link).await?;
        Ok(())
    }

    /// Read a symlink. Absolute targets inside the backing root come back
    /// relative to the root.
    pub async fn readlink(&self, path: &Path) -> FsResult<PathBuf> {
        let target = fs::read_link(path).await?;
        if target.is_absolute() {
            if let Ok(inside) = target.strip_prefix(&self.root) {
                return Ok(inside.to_path_buf());
            }
        }
        Ok(target)
    }

    pub async fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> FsResult<()> {
        let c = c_path(path)?;
        blocking(move || {
            cvt(unsafe { libc::mknod(c.as_ptr(), mode as libc::mode_t, rdev as libc::dev_t) })
        })
        .await
    }

    pub async fn chmod(&self, path: &Path, mode: u32) -> FsResult<()> {
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777)).await?;
        Ok(())
    }

    pub async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> FsResult<()> {
        let path = path.to_path_buf();
        blocking(move || std::os::unix::fs::lchown(path, uid, gid)).await
    }

    pub async fn truncate(&self, path: &Path, size: u64) -> FsResult<()> {
        let path = path.to_path_buf();
        blocking(move || OpenOptions::new().write(true).open(path)?.set_len(size)).await
    }

    /// Set timestamps on the entry itself; symlinks are not followed and
    /// nothing is opened, so FIFOs and write-only files behave like `utime(2)`.
    pub async fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> FsResult<()> {
        let c = c_path(path)?;
        blocking(move || {
            let times = [timespec(atime), timespec(mtime)];
            cvt(unsafe {
                libc::utimensat(
                    libc::AT_FDCWD,
                    c.as_ptr(),
                    times.as_ptr(),
                    libc::AT_SYMLINK_NOFOLLOW,
                )
            })
        })
        .await
    }

    pub async fn statfs(&self, path: &Path) -> FsResult<StatFs> {
        let c = c_path(path)?;
        blocking(move || {
            let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
            cvt(unsafe { libc::statvfs(c.as_ptr(), &mut st) })?;
            Ok(StatFs {
                blocks: st.f_blocks as u64,
                bfree: st.f_bfree as u64,
                bavail: st.f_bavail as u64,
                files: st.f_files as u64,
                ffree: st.f_ffree as u64,
                bsize: st.f_bsize as u32,
                namelen: st.f_namemax as u32,
                frsize: st.f_frsize as u32,
            })
        })
        .await
    }
}

/// Translate `open(2)` flags into `OpenOptions`.
fn open_options(flags: i32) -> OpenOptions {
    let accmode = flags & libc::O_ACCMODE;
    let mut opts = OpenOptions::new();
    opts.read(accmode == libc::O_RDONLY || accmode == libc::O_RDWR)
        .write(accmode == libc::O_WRONLY || accmode == libc::O_RDWR)
        .append(flags & libc::O_APPEND != 0)
        .custom_flags(flags & !(libc::O_ACCMODE | libc::O_CREAT | libc::O_EXCL | libc::O_APPEND));
    opts
}
