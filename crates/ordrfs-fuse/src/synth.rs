//! Attribute and directory-listing synthesis for catalog-backed paths.
//!
//! Categories and restaurants never exist on storage, so their attributes and
//! listings are computed on every call and merged with whatever real entries
//! sit at the mirrored backing path.

use std::collections::HashSet;

use ordrfs_core::{CatalogSnapshot, MENU_FILE_NAME};

use crate::attr::{FileAttributes, FileKind};
use crate::classify::PathClass;

/// Permission bits of category and restaurant directories (r-xr-xr-x).
pub const PERM_SYNTHETIC_DIR: u16 = 0o555;

/// `st_size` reported for synthetic directories.
pub const SYNTHETIC_DIR_SIZE: u64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        DirEntry {
            name: name.into(),
            kind,
        }
    }
}

/// Where the attributes of a classified path come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrSource {
    /// Fully synthetic; no storage access needed.
    Synthetic(FileAttributes),
    /// Generated file: materialize first, then stat the backing file.
    Materialize,
    /// Stat the backing path.
    Real,
}

pub struct Synthesizer {
    uid: u32,
    gid: u32,
}

impl Synthesizer {
    pub fn new(uid: u32, gid: u32) -> Self {
        Synthesizer { uid, gid }
    }

    pub fn attributes_for(&self, class: &PathClass) -> AttrSource {
        match class {
            PathClass::Category(_) | PathClass::Restaurant { .. } => AttrSource::Synthetic(
                FileAttributes::synthetic_dir(
                    PERM_SYNTHETIC_DIR,
                    SYNTHETIC_DIR_SIZE,
                    self.uid,
                    self.gid,
                ),
            ),
            PathClass::SyntheticFile { .. } => AttrSource::Materialize,
            PathClass::Root | PathClass::Other(_) => AttrSource::Real,
        }
    }

    /// Synthetic children of a directory class. Empty for `Other` and files.
    pub fn synthetic_entries(&self, class: &PathClass, snapshot: &CatalogSnapshot) -> Vec<DirEntry> {
        match class {
            PathClass::Root => snapshot
                .categories()
                .map(|c| DirEntry::new(c, FileKind::Directory))
                .collect(),
            PathClass::Category(category) => snapshot
                .restaurants_in(category)
                .map(|r| DirEntry::new(r, FileKind::Directory))
                .collect(),
            PathClass::Restaurant { .. } => {
                vec![DirEntry::new(MENU_FILE_NAME, FileKind::RegularFile)]
            }
            PathClass::SyntheticFile { .. } | PathClass::Other(_) => Vec::new(),
        }
    }
}

/// Build a full listing: `.` and `..`, the synthetic entries, then any real
/// entries whose names are not already present. Synthetic entries shadow
/// identically-named real ones.
pub fn merge_listing(synthetic: Vec<DirEntry>, real: Vec<DirEntry>) -> Vec<DirEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(synthetic.len() + real.len() + 2);

    for entry in [
        DirEntry::new(".", FileKind::Directory),
        DirEntry::new("..", FileKind::Directory),
    ]
    .into_iter()
    .chain(synthetic)
    .chain(real)
    {
        if seen.insert(entry.name.clone()) {
            out.push(entry);
        }
    }
    out
}
