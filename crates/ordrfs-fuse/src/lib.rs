//! ordrfs-fuse: projects a restaurant catalog snapshot as a filesystem
//! overlaid on a real backing directory.
//!
//! Linux: fuse3 crate (kernel FUSE), feature `fuse`
//! macOS: fuse3 with macFUSE 4.x (feature: macos-fuse)
//!
//! Everything except the driver is transport independent and usable (and
//! tested) without FUSE.

pub mod access;
pub mod attr;
pub mod classify;
pub mod driver;
pub mod error;
pub mod fs;
pub mod handles;
pub mod materialize;
pub mod passthrough;
pub mod synth;

// Re-export the mount API when the fuse feature is enabled
#[cfg(feature = "fuse")]
pub use driver::{mount, MountConfig};

pub use attr::{FileAttributes, FileKind};
pub use classify::{classify, PathClass, SyntheticKind};
pub use error::{FsError, FsResult};
pub use fs::{OrdrFs, SetAttributes};
pub use passthrough::StatFs;
pub use synth::DirEntry;
