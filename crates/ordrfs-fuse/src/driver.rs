//! FUSE driver: mounts an [`OrdrFs`](crate::fs::OrdrFs) projection.
//!
//! ```text
//! backing dir ~/food:                 mountpoint /mnt/food:
//!   Italian/Luigi's/menu  (once read)   /Italian/
//!   Italian/Luigi's/order.txt             Luigi's/
//!   notes.txt                               menu
//!                                           order.txt
//!                                       /Mexican/...
//!                                       /notes.txt
//! ```
//!
//! The driver only translates between fuse3 types and the engine; every
//! decision lives in `OrdrFs`.

#[cfg(feature = "fuse")]
mod inner {
    use std::ffi::{OsStr, OsString};
    use std::num::NonZeroU32;
    use std::os::unix::ffi::OsStrExt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use bytes::Bytes;
    use fuse3::path::prelude::*;
    use fuse3::{Errno, FileType, MountOptions, Timestamp};
    use futures_util::stream;
    use ordrfs_core::CatalogSnapshot;
    use tracing::{debug, info, warn};

    use crate::attr::{FileAttributes, FileKind};
    use crate::classify::{join_path, split_parent};
    use crate::error::FsError;
    use crate::fs::{OrdrFs, SetAttributes};

    const MAX_WRITE: u32 = 128 * 1024;

    fn errno(err: FsError) -> Errno {
        match &err {
            FsError::Io(_) => warn!("backing store error: {err}"),
            _ => debug!("{err}"),
        }
        Errno::from(err.errno())
    }

    fn utf8(path: &OsStr) -> fuse3::Result<&str> {
        path.to_str().ok_or_else(|| Errno::from(libc::EINVAL))
    }

    fn child(parent: &OsStr, name: &OsStr) -> fuse3::Result<String> {
        Ok(join_path(utf8(parent)?, utf8(name)?))
    }

    fn file_type(kind: FileKind) -> FileType {
        match kind {
            FileKind::Directory => FileType::Directory,
            FileKind::RegularFile => FileType::RegularFile,
            FileKind::Symlink => FileType::Symlink,
            FileKind::NamedPipe => FileType::NamedPipe,
            FileKind::CharDevice => FileType::CharDevice,
            FileKind::BlockDevice => FileType::BlockDevice,
            FileKind::Socket => FileType::Socket,
        }
    }

    fn file_attr(attr: &FileAttributes) -> FileAttr {
        FileAttr {
            size: attr.size,
            blocks: attr.blocks,
            atime: attr.atime.into(),
            mtime: attr.mtime.into(),
            ctime: attr.ctime.into(),
            #[cfg(target_os = "macos")]
            crtime: attr.ctime.into(),
            kind: file_type(attr.kind),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: attr.rdev,
            blksize: attr.blksize,
            #[cfg(target_os = "macos")]
            flags: 0,
        }
    }

    fn system_time(ts: Timestamp) -> SystemTime {
        let nsec = Duration::from_nanos(u64::from(ts.nsec));
        if ts.sec >= 0 {
            UNIX_EPOCH + Duration::from_secs(ts.sec as u64) + nsec
        } else {
            UNIX_EPOCH - Duration::from_secs(ts.sec.unsigned_abs()) + nsec
        }
    }

    /// fuse3 adapter around the engine.
    pub struct OrdrFuse {
        fs: OrdrFs,
        ttl: Duration,
    }

    impl OrdrFuse {
        pub fn new(fs: OrdrFs, ttl: Duration) -> Self {
            OrdrFuse { fs, ttl }
        }

        fn entry(&self, attr: &FileAttributes) -> ReplyEntry {
            ReplyEntry {
                ttl: self.ttl,
                attr: file_attr(attr),
            }
        }

        async fn listing(&self, path: &str) -> fuse3::Result<Vec<crate::synth::DirEntry>> {
            self.fs.readdir(path).await.map_err(errno)
        }
    }

    impl PathFilesystem for OrdrFuse {
        async fn init(&self, _req: Request) -> fuse3::Result<ReplyInit> {
            debug!(backing = %self.fs.backing_root().display(), "ordrfs init");
            Ok(ReplyInit {
                max_write: NonZeroU32::new(MAX_WRITE).unwrap_or(NonZeroU32::MIN),
            })
        }

        async fn destroy(&self, _req: Request) {
            info!("ordrfs unmounted");
        }

        async fn lookup(
            &self,
            _req: Request,
            parent: &OsStr,
            name: &OsStr,
        ) -> fuse3::Result<ReplyEntry> {
            let path = child(parent, name)?;
            let attr = self.fs.getattr(&path).await.map_err(errno)?;
            Ok(self.entry(&attr))
        }

        async fn getattr(
            &self,
            _req: Request,
            path: Option<&OsStr>,
            _fh: Option<u64>,
            _flags: u32,
        ) -> fuse3::Result<ReplyAttr> {
            let path = utf8(path.ok_or_else(|| Errno::from(libc::ENOENT))?)?;
            let attr = self.fs.getattr(path).await.map_err(errno)?;
            Ok(ReplyAttr {
                ttl: self.ttl,
                attr: file_attr(&attr),
            })
        }

        async fn setattr(
            &self,
            _req: Request,
            path: Option<&OsStr>,
            _fh: Option<u64>,
            set_attr: SetAttr,
        ) -> fuse3::Result<ReplyAttr> {
            let path = utf8(path.ok_or_else(|| Errno::from(libc::ENOENT))?)?;
            let set = SetAttributes {
                mode: set_attr.mode,
                uid: set_attr.uid,
                gid: set_attr.gid,
                size: set_attr.size,
                atime: set_attr.atime.map(system_time),
                mtime: set_attr.mtime.map(system_time),
            };
            let attr = self.fs.setattr(path, set).await.map_err(errno)?;
            Ok(ReplyAttr {
                ttl: self.ttl,
                attr: file_attr(&attr),
            })
        }

        async fn readlink(&self, _req: Request, path: &OsStr) -> fuse3::Result<ReplyData> {
            let target = self.fs.readlink(utf8(path)?).await.map_err(errno)?;
            Ok(ReplyData {
                data: Bytes::copy_from_slice(target.as_os_str().as_bytes()),
            })
        }

        async fn symlink(
            &self,
            _req: Request,
            parent: &OsStr,
            name: &OsStr,
            link_path: &OsStr,
        ) -> fuse3::Result<ReplyEntry> {
            let path = child(parent, name)?;
            let attr = self
                .fs
                .symlink(&path, Path::new(link_path))
                .await
                .map_err(errno)?;
            Ok(self.entry(&attr))
        }

        async fn mknod(
            &self,
            _req: Request,
            parent: &OsStr,
            name: &OsStr,
            mode: u32,
            rdev: u32,
        ) -> fuse3::Result<ReplyEntry> {
            let path = child(parent, name)?;
            let attr = self.fs.mknod(&path, mode, rdev).await.map_err(errno)?;
            Ok(self.entry(&attr))
        }

        async fn mkdir(
            &self,
            _req: Request,
            parent: &OsStr,
            name: &OsStr,
            mode: u32,
            umask: u32,
        ) -> fuse3::Result<ReplyEntry> {
            let path = child(parent, name)?;
            let attr = self
                .fs
                .mkdir(&path, mode & !umask)
                .await
                .map_err(errno)?;
            Ok(self.entry(&attr))
        }

        async fn unlink(&self, _req: Request, parent: &OsStr, name: &OsStr) -> fuse3::Result<()> {
            self.fs.unlink(&child(parent, name)?).await.map_err(errno)
        }

        async fn rmdir(&self, _req: Request, parent: &OsStr, name: &OsStr) -> fuse3::Result<()> {
            self.fs.rmdir(&child(parent, name)?).await.map_err(errno)
        }

        async fn rename(
            &self,
            _req: Request,
            origin_parent: &OsStr,
            origin_name: &OsStr,
            parent: &OsStr,
            name: &OsStr,
        ) -> fuse3::Result<()> {
            let from = child(origin_parent, origin_name)?;
            let to = child(parent, name)?;
            self.fs.rename(&from, &to).await.map_err(errno)
        }

        async fn link(
            &self,
            _req: Request,
            path: &OsStr,
            new_parent: &OsStr,
            new_name: &OsStr,
        ) -> fuse3::Result<ReplyEntry> {
            let new_path = child(new_parent, new_name)?;
            let attr = self
                .fs
                .link(utf8(path)?, &new_path)
                .await
                .map_err(errno)?;
            Ok(self.entry(&attr))
        }

        async fn open(&self, _req: Request, path: &OsStr, flags: u32) -> fuse3::Result<ReplyOpen> {
            let fh = self
                .fs
                .open(utf8(path)?, flags as i32)
                .await
                .map_err(errno)?;
            Ok(ReplyOpen { fh, flags: 0 })
        }

        async fn read(
            &self,
            _req: Request,
            _path: Option<&OsStr>,
            fh: u64,
            offset: u64,
            size: u32,
        ) -> fuse3::Result<ReplyData> {
            let data = self.fs.read(fh, offset, size).await.map_err(errno)?;
            Ok(ReplyData {
                data: Bytes::from(data),
            })
        }

        async fn write(
            &self,
            _req: Request,
            _path: Option<&OsStr>,
            fh: u64,
            offset: u64,
            data: &[u8],
            _write_flags: u32,
            _flags: u32,
        ) -> fuse3::Result<ReplyWrite> {
            let written = self.fs.write(fh, offset, data).await.map_err(errno)?;
            Ok(ReplyWrite { written })
        }

        async fn statfs(&self, _req: Request, _path: &OsStr) -> fuse3::Result<ReplyStatFs> {
            let st = self.fs.statfs().await.map_err(errno)?;
            Ok(ReplyStatFs {
                blocks: st.blocks,
                bfree: st.bfree,
                bavail: st.bavail,
                files: st.files,
                ffree: st.ffree,
                bsize: st.bsize,
                namelen: st.namelen,
                frsize: st.frsize,
            })
        }

        async fn release(
            &self,
            _req: Request,
            _path: Option<&OsStr>,
            fh: u64,
            _flags: u32,
            _lock_owner: u64,
            _flush: bool,
        ) -> fuse3::Result<()> {
            self.fs.release(fh).await.map_err(errno)
        }

        async fn fsync(
            &self,
            _req: Request,
            _path: Option<&OsStr>,
            fh: u64,
            datasync: bool,
        ) -> fuse3::Result<()> {
            self.fs.fsync(fh, datasync).await.map_err(errno)
        }

        async fn flush(
            &self,
            _req: Request,
            _path: Option<&OsStr>,
            fh: u64,
            _lock_owner: u64,
        ) -> fuse3::Result<()> {
            self.fs.flush(fh).await.map_err(errno)
        }

        async fn access(&self, _req: Request, path: &OsStr, mask: u32) -> fuse3::Result<()> {
            self.fs.access(utf8(path)?, mask).await.map_err(errno)
        }

        async fn create(
            &self,
            _req: Request,
            parent: &OsStr,
            name: &OsStr,
            mode: u32,
            flags: u32,
        ) -> fuse3::Result<ReplyCreated> {
            let path = child(parent, name)?;
            let (fh, attr) = self
                .fs
                .create(&path, mode, flags as i32)
                .await
                .map_err(errno)?;
            Ok(ReplyCreated {
                ttl: self.ttl,
                attr: file_attr(&attr),
                generation: 0,
                fh,
                flags: 0,
            })
        }

        async fn opendir(
            &self,
            _req: Request,
            _path: &OsStr,
            _flags: u32,
        ) -> fuse3::Result<ReplyOpen> {
            Ok(ReplyOpen { fh: 0, flags: 0 })
        }

        type DirEntryStream<'a>
            = stream::Iter<std::vec::IntoIter<fuse3::Result<DirectoryEntry>>>
        where
            Self: 'a;

        type DirEntryPlusStream<'a>
            = stream::Iter<std::vec::IntoIter<fuse3::Result<DirectoryEntryPlus>>>
        where
            Self: 'a;

        async fn readdir<'a>(
            &'a self,
            _req: Request,
            path: &'a OsStr,
            _fh: u64,
            offset: i64,
        ) -> fuse3::Result<ReplyDirectory<Self::DirEntryStream<'a>>> {
            let listing = self.listing(utf8(path)?).await?;
            let entries: Vec<_> = listing
                .into_iter()
                .enumerate()
                .map(|(i, e)| (i as i64 + 1, e))
                .filter(|(next, _)| *next > offset)
                .map(|(next, e)| {
                    Ok(DirectoryEntry {
                        kind: file_type(e.kind),
                        name: OsString::from(e.name),
                        offset: next,
                    })
                })
                .collect();
            Ok(ReplyDirectory {
                entries: stream::iter(entries),
            })
        }

        async fn readdirplus<'a>(
            &'a self,
            _req: Request,
            path: &'a OsStr,
            _fh: u64,
            offset: u64,
            _lock_owner: u64,
        ) -> fuse3::Result<ReplyDirectoryPlus<Self::DirEntryPlusStream<'a>>> {
            let dir = utf8(path)?;
            let listing = self.listing(dir).await?;
            let parent = split_parent(dir).map_or("/", |(p, _)| p);

            let mut entries = Vec::with_capacity(listing.len());
            for (i, e) in listing.into_iter().enumerate() {
                let next = i as u64 + 1;
                if next <= offset {
                    continue;
                }
                let target = match e.name.as_str() {
                    "." => dir.to_string(),
                    ".." => parent.to_string(),
                    name => join_path(dir, name),
                };
                // Entries can vanish between listing and stat
                let attr = match self.fs.getattr(&target).await {
                    Ok(attr) => attr,
                    Err(err) => {
                        debug!(path = %target, "skipping entry: {err}");
                        continue;
                    }
                };
                entries.push(Ok(DirectoryEntryPlus {
                    kind: file_type(e.kind),
                    name: OsString::from(e.name),
                    offset: next as i64,
                    attr: file_attr(&attr),
                    entry_ttl: self.ttl,
                    attr_ttl: self.ttl,
                }));
            }
            Ok(ReplyDirectoryPlus {
                entries: stream::iter(entries),
            })
        }
    }

    /// Mount configuration
    pub struct MountConfig {
        pub snapshot: Arc<CatalogSnapshot>,
        pub backing_dir: PathBuf,
        pub mountpoint: PathBuf,
        pub allow_other: bool,
        pub attr_ttl: Duration,
    }

    /// Mount the projection and block until unmounted
    /// (e.g. via `fusermount3 -u <mountpoint>`).
    pub async fn mount(cfg: MountConfig) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&cfg.backing_dir).await?;

        let fs = OrdrFs::new(cfg.snapshot, cfg.backing_dir);
        let driver = OrdrFuse::new(fs, cfg.attr_ttl);

        let mut opts = MountOptions::default();
        opts.fs_name("ordrfs");
        opts.force_readdir_plus(true);
        if cfg.allow_other {
            opts.allow_other(true);
        }

        info!(mountpoint = %cfg.mountpoint.display(), "mounting ordrfs (unprivileged via fusermount3)");

        let handle = Session::new(opts)
            .mount_with_unprivileged(driver, &cfg.mountpoint)
            .await?;

        handle.await
    }
}

#[cfg(feature = "fuse")]
pub use inner::{mount, MountConfig, OrdrFuse};
