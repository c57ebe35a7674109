//! The ordrfs engine: every filesystem operation, independent of the FUSE
//! transport.
//!
//! Each call classifies its path against the catalog snapshot and then either
//! answers from the synthesizer, materializes a generated file first, or
//! passes straight through to the backing directory. Paths are namespace
//! paths (`/Italian/Luigi's/menu`); the backing store mirrors the same layout.

use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use ordrfs_core::{CatalogSnapshot, MENU_FILE_NAME};
use tracing::debug;

use crate::access::{
    access_decision, ensure_creatable, ensure_mutable, ensure_removable, wants_write,
    AccessDecision, NewEntry,
};
use crate::attr::{FileAttributes, FileKind};
use crate::classify::{classify, split_parent, PathClass};
use crate::error::{FsError, FsResult};
use crate::handles::HandleTable;
use crate::materialize::{staging_name, Materializer};
use crate::passthrough::{blocking, Backing, StatFs};
use crate::synth::{merge_listing, AttrSource, DirEntry, Synthesizer};

/// Attribute changes requested by a `setattr` call. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetAttributes {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: Option<SystemTime>,
    pub mtime: Option<SystemTime>,
}

impl SetAttributes {
    pub fn is_empty(&self) -> bool {
        *self == SetAttributes::default()
    }
}

pub struct OrdrFs {
    snapshot: Arc<CatalogSnapshot>,
    backing: Backing,
    synth: Synthesizer,
    materializer: Materializer,
    handles: HandleTable,
}

impl OrdrFs {
    /// Project `snapshot` over the backing directory `root`, owned by the
    /// calling process.
    pub fn new(snapshot: Arc<CatalogSnapshot>, root: PathBuf) -> Self {
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self::with_owner(snapshot, root, uid, gid)
    }

    pub fn with_owner(snapshot: Arc<CatalogSnapshot>, root: PathBuf, uid: u32, gid: u32) -> Self {
        OrdrFs {
            snapshot,
            backing: Backing::new(root),
            synth: Synthesizer::new(uid, gid),
            materializer: Materializer::new(),
            handles: HandleTable::new(),
        }
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    pub fn backing_root(&self) -> &Path {
        self.backing.root()
    }

    pub fn classify(&self, path: &str) -> PathClass {
        classify(path, &self.snapshot)
    }

    /// Number of currently open file handles.
    pub async fn open_handles(&self) -> usize {
        self.handles.len().await
    }

    /// Render a generated file into the backing store if it is not there yet.
    async fn materialize(&self, class: &PathClass, real: &Path) -> FsResult<()> {
        if let PathClass::SyntheticFile {
            category,
            restaurant,
            ..
        } = class
        {
            let record = self
                .snapshot
                .restaurant_in(category, restaurant)
                .ok_or_else(|| FsError::NotFound(format!("{category}/{restaurant}")))?;
            self.materializer.ensure_materialized(record, real).await?;
        }
        Ok(())
    }

    /// Classify the parent and the entry itself for a creation at `path`.
    fn creation_target(&self, path: &str, entry: NewEntry) -> FsResult<(PathClass, PathBuf)> {
        let (parent, _) =
            split_parent(path).ok_or_else(|| FsError::PermissionDenied(path.to_string()))?;
        let parent_class = self.classify(parent);
        ensure_creatable(&parent_class, &self.classify(path), entry, path)?;
        Ok((parent_class, self.backing.resolve(path)?))
    }

    /// Restaurant directories only exist on storage once something is put in
    /// them.
    async fn prepare_parent(&self, parent: &PathClass, real: &Path) -> FsResult<()> {
        if matches!(parent, PathClass::Restaurant { .. }) {
            self.backing.ensure_parent(real).await?;
        }
        Ok(())
    }

    pub async fn getattr(&self, path: &str) -> FsResult<FileAttributes> {
        let class = self.classify(path);
        debug!(path, ?class, "getattr");
        match self.synth.attributes_for(&class) {
            AttrSource::Synthetic(attr) => Ok(attr),
            AttrSource::Materialize => {
                let real = self.backing.resolve(path)?;
                self.materialize(&class, &real).await?;
                let mut attr = self.backing.lstat(&real).await?;
                attr.perm &= !0o222;
                Ok(attr)
            }
            AttrSource::Real => self.backing.lstat(&self.backing.resolve(path)?).await,
        }
    }

    /// Full listing of a directory, `.` and `..` first.
    pub async fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let class = self.classify(path);
        debug!(path, ?class, "readdir");
        let real = self.backing.resolve(path)?;
        let real_entries = match &class {
            PathClass::SyntheticFile { .. } => return Err(FsError::NotADirectory(path.to_string())),
            PathClass::Other(_) => self.backing.read_dir(&real).await?,
            PathClass::Restaurant { .. } => {
                let staging = staging_name(MENU_FILE_NAME);
                let mut entries = self.backing.read_dir_if_exists(&real).await?;
                entries.retain(|e| e.name != staging);
                entries
            }
            PathClass::Root | PathClass::Category(_) => {
                self.backing.read_dir_if_exists(&real).await?
            }
        };
        let synthetic = self.synth.synthetic_entries(&class, &self.snapshot);
        Ok(merge_listing(synthetic, real_entries))
    }

    pub async fn access(&self, path: &str, mask: u32) -> FsResult<()> {
        let class = self.classify(path);
        debug!(path, mask, "access");
        match access_decision(&class, mask) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny => Err(FsError::PermissionDenied(path.to_string())),
            AccessDecision::Delegate => {
                self.backing
                    .access(&self.backing.resolve(path)?, mask)
                    .await
            }
        }
    }

    /// Open an existing file and return its handle.
    pub async fn open(&self, path: &str, flags: i32) -> FsResult<u64> {
        let class = self.classify(path);
        debug!(path, flags, "open");
        if class.is_synthetic() && wants_write(flags) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        if class.is_synthetic_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        let real = self.backing.resolve(path)?;
        self.materialize(&class, &real).await?;
        let file = self.backing.open(&real, flags).await?;
        Ok(self.handles.insert(file).await)
    }

    /// Create a file and open it.
    pub async fn create(&self, path: &str, mode: u32, flags: i32) -> FsResult<(u64, FileAttributes)> {
        debug!(path, mode, flags, "create");
        let (parent, real) = self.creation_target(path, NewEntry::File)?;
        self.prepare_parent(&parent, &real).await?;
        let file = self.backing.create(&real, mode, flags).await?;
        let attr = self.backing.lstat(&real).await?;
        Ok((self.handles.insert(file).await, attr))
    }

    pub async fn read(&self, fh: u64, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let file = self.handles.get(fh).await?;
        blocking(move || {
            let mut buf = vec![0u8; size as usize];
            let mut filled = 0;
            while filled < buf.len() {
                match file.read_at(&mut buf[filled..], offset + filled as u64) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }
            buf.truncate(filled);
            Ok(buf)
        })
        .await
    }

    /// Write `data` at `offset`; returns the number of bytes written.
    pub async fn write(&self, fh: u64, offset: u64, data: &[u8]) -> FsResult<u32> {
        let file = self.handles.get(fh).await?;
        let data = data.to_vec();
        blocking(move || {
            file.write_all_at(&data, offset)?;
            Ok(data.len() as u32)
        })
        .await
    }

    pub async fn flush(&self, fh: u64) -> FsResult<()> {
        let file = self.handles.get(fh).await?;
        blocking(move || file.sync_all()).await
    }

    pub async fn fsync(&self, fh: u64, datasync: bool) -> FsResult<()> {
        let file = self.handles.get(fh).await?;
        blocking(move || {
            if datasync {
                file.sync_data()
            } else {
                file.sync_all()
            }
        })
        .await
    }

    pub async fn release(&self, fh: u64) -> FsResult<()> {
        debug!(fh, "release");
        self.handles.remove(fh).await.map(drop)
    }

    /// Directories may only be made directly inside a restaurant.
    pub async fn mkdir(&self, path: &str, mode: u32) -> FsResult<FileAttributes> {
        debug!(path, mode, "mkdir");
        let (parent, real) = self.creation_target(path, NewEntry::Directory)?;
        self.prepare_parent(&parent, &real).await?;
        self.backing.mkdir(&real, mode).await?;
        self.backing.lstat(&real).await
    }

    pub async fn rmdir(&self, path: &str) -> FsResult<()> {
        debug!(path, "rmdir");
        ensure_removable(&self.classify(path), path)?;
        self.backing.rmdir(&self.backing.resolve(path)?).await
    }

    pub async fn unlink(&self, path: &str) -> FsResult<()> {
        debug!(path, "unlink");
        ensure_removable(&self.classify(path), path)?;
        self.backing.unlink(&self.backing.resolve(path)?).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        debug!(from, to, "rename");
        ensure_removable(&self.classify(from), from)?;
        let source = self.backing.resolve(from)?;
        // A moved directory lands under the same rules as mkdir
        let entry = match self.backing.lstat(&source).await?.kind {
            FileKind::Directory => NewEntry::Directory,
            _ => NewEntry::File,
        };
        let (parent, dest) = self.creation_target(to, entry)?;
        self.prepare_parent(&parent, &dest).await?;
        self.backing.rename(&source, &dest).await
    }

    /// Hard link `path` at `new_path`. Synthetic entries cannot be linked.
    pub async fn link(&self, path: &str, new_path: &str) -> FsResult<FileAttributes> {
        debug!(path, new_path, "link");
        ensure_mutable(&self.classify(path), path)?;
        let source = self.backing.resolve(path)?;
        let (parent, dest) = self.creation_target(new_path, NewEntry::File)?;
        self.prepare_parent(&parent, &dest).await?;
        self.backing.link(&source, &dest).await?;
        self.backing.lstat(&dest).await
    }

    /// Create a symlink at `path` pointing at `target`, stored verbatim.
    pub async fn symlink(&self, path: &str, target: &Path) -> FsResult<FileAttributes> {
        debug!(path, target = %target.display(), "symlink");
        let (parent, real) = self.creation_target(path, NewEntry::File)?;
        self.prepare_parent(&parent, &real).await?;
        self.backing.symlink(target, &real).await?;
        self.backing.lstat(&real).await
    }

    pub async fn readlink(&self, path: &str) -> FsResult<PathBuf> {
        if self.classify(path).is_synthetic() {
            return Err(FsError::InvalidPath(path.to_string()));
        }
        self.backing.readlink(&self.backing.resolve(path)?).await
    }

    pub async fn mknod(&self, path: &str, mode: u32, rdev: u32) -> FsResult<FileAttributes> {
        debug!(path, mode, rdev, "mknod");
        let (parent, real) = self.creation_target(path, NewEntry::File)?;
        self.prepare_parent(&parent, &real).await?;
        self.backing.mknod(&real, mode, rdev).await?;
        self.backing.lstat(&real).await
    }

    /// chmod, chown, truncate and utimens in one call.
    pub async fn setattr(&self, path: &str, set: SetAttributes) -> FsResult<FileAttributes> {
        debug!(path, ?set, "setattr");
        if set.is_empty() {
            return self.getattr(path).await;
        }
        ensure_mutable(&self.classify(path), path)?;
        let real = self.backing.resolve(path)?;

        if let Some(mode) = set.mode {
            self.backing.chmod(&real, mode).await?;
        }
        if set.uid.is_some() || set.gid.is_some() {
            self.backing.chown(&real, set.uid, set.gid).await?;
        }
        if let Some(size) = set.size {
            self.backing.truncate(&real, size).await?;
        }
        if set.atime.is_some() || set.mtime.is_some() {
            self.backing.utimens(&real, set.atime, set.mtime).await?;
        }
        self.backing.lstat(&real).await
    }

    pub async fn statfs(&self) -> FsResult<StatFs> {
        self.backing.statfs(self.backing.root()).await
    }
}
