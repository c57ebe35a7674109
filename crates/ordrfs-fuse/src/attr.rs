//! Fixed attribute record for namespace entries.

use std::fs::{FileType, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
    Symlink,
    NamedPipe,
    CharDevice,
    BlockDevice,
    Socket,
}

impl FileKind {
    pub fn from_file_type(ft: FileType) -> Self {
        if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_fifo() {
            FileKind::NamedPipe
        } else if ft.is_char_device() {
            FileKind::CharDevice
        } else if ft.is_block_device() {
            FileKind::BlockDevice
        } else if ft.is_socket() {
            FileKind::Socket
        } else {
            FileKind::RegularFile
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub kind: FileKind,
    /// Permission bits only (no file-type bits)
    pub perm: u16,
    pub size: u64,
    pub blocks: u64,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub blksize: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    let nsecs = nsecs.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nsecs)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nsecs as u64)
    }
}

impl FileAttributes {
    /// Attributes of a synthetic directory, stamped with the current time.
    pub fn synthetic_dir(perm: u16, size: u64, uid: u32, gid: u32) -> Self {
        let now = SystemTime::now();
        FileAttributes {
            kind: FileKind::Directory,
            perm,
            size,
            blocks: 0,
            nlink: 1,
            uid,
            gid,
            rdev: 0,
            blksize: 4096,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Attributes of a real backing-store entry (from `lstat`).
    pub fn from_metadata(meta: &Metadata) -> Self {
        FileAttributes {
            kind: FileKind::from_file_type(meta.file_type()),
            perm: (meta.mode() & 0o7777) as u16,
            size: meta.size(),
            blocks: meta.blocks(),
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev() as u32,
            blksize: meta.blksize() as u32,
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_file_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"hello").unwrap();

        let attr = FileAttributes::from_metadata(&std::fs::symlink_metadata(&path).unwrap());
        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.size, 5);
        assert_eq!(attr.nlink, 1);
        assert!(attr.mtime > UNIX_EPOCH);

        let dir_attr = FileAttributes::from_metadata(&std::fs::symlink_metadata(dir.path()).unwrap());
        assert_eq!(dir_attr.kind, FileKind::Directory);
    }

    #[test]
    fn synthetic_dir_is_fresh() {
        let before = SystemTime::now();
        let attr = FileAttributes::synthetic_dir(0o555, 4096, 1000, 1000);
        assert_eq!(attr.kind, FileKind::Directory);
        assert_eq!(attr.perm, 0o555);
        assert_eq!(attr.nlink, 1);
        assert!(attr.mtime >= before);
    }

    #[test]
    fn pre_epoch_timestamps() {
        assert_eq!(unix_time(-1, 0), UNIX_EPOCH - Duration::from_secs(1));
        assert_eq!(unix_time(2, 5), UNIX_EPOCH + Duration::new(2, 5));
    }
}
