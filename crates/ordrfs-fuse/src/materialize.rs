//! Lazy materialization of generated files into the backing store.
//!
//! The first access to a restaurant's menu renders it and writes it to the
//! mirrored backing path. From then on it is an ordinary file and is never
//! regenerated; deleting it out-of-band forces a fresh render on next access.
//!
//! Concurrent first accesses are serialized per backing path, and the content
//! is written to a hidden staging file then renamed into place, so readers
//! never observe a partial menu.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ordrfs_core::RestaurantRecord;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FsError, FsResult};

/// Staging name used while a file is being materialized (`.menu.tmp`).
pub fn staging_name(file_name: &str) -> String {
    format!(".{file_name}.tmp")
}

#[derive(Default)]
pub struct Materializer {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Materializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Make sure the menu of `restaurant` exists at `backing_path`.
    ///
    /// Returns `Ok(true)` if this call wrote the file, `Ok(false)` if it was
    /// already there. Storage failures are returned unchanged and leave no
    /// file at `backing_path`.
    pub async fn ensure_materialized(
        &self,
        restaurant: &RestaurantRecord,
        backing_path: &Path,
    ) -> FsResult<bool> {
        if fs::try_exists(backing_path).await? {
            return Ok(false);
        }

        let lock = self.lock_for(backing_path);
        let _guard = lock.lock().await;

        // Another caller may have finished while we waited
        if fs::try_exists(backing_path).await? {
            return Ok(false);
        }

        let (parent, file_name) = match (backing_path.parent(), backing_path.file_name()) {
            (Some(parent), Some(name)) => (parent, name.to_string_lossy()),
            _ => return Err(FsError::InvalidPath(backing_path.display().to_string())),
        };

        fs::create_dir_all(parent).await?;

        let body = restaurant.render_menu();
        let tmp = parent.join(staging_name(&file_name));
        if let Err(e) = fs::write(&tmp, &body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, backing_path).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), "failed to remove staging file: {cleanup}");
            }
            return Err(e.into());
        }

        debug!(
            restaurant = %restaurant.name,
            path = %backing_path.display(),
            bytes = body.len(),
            "materialized"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordrfs_core::{MenuItem, MenuRecord, MenuSection};

    fn luigi() -> RestaurantRecord {
        RestaurantRecord {
            id: "42".into(),
            name: "Luigi's".into(),
            cuisine: ["Italian".to_string()].into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            phone: "555-0100".into(),
            menu: MenuRecord {
                sections: vec![MenuSection {
                    label: "Pizza".into(),
                    items: vec![MenuItem {
                        name: "Margherita".into(),
                        price: "12.00".into(),
                        id: "201".into(),
                        description: String::new(),
                    }],
                }],
            },
        }
    }

    #[tokio::test]
    async fn creates_parents_and_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Italian/Luigi's/menu");
        let m = Materializer::new();

        assert!(m.ensure_materialized(&luigi(), &path).await.unwrap());
        let first = std::fs::read(&path).unwrap();
        assert_eq!(first, luigi().render_menu());

        assert!(!m.ensure_materialized(&luigi(), &path).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), first);
        assert!(!dir.path().join("Italian/Luigi's/.menu.tmp").exists());
    }

    #[tokio::test]
    async fn existing_file_is_never_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu");
        std::fs::write(&path, b"edited by hand").unwrap();

        let m = Materializer::new();
        assert!(!m.ensure_materialized(&luigi(), &path).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"edited by hand");

        std::fs::remove_file(&path).unwrap();
        assert!(m.ensure_materialized(&luigi(), &path).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), luigi().render_menu());
    }

    #[tokio::test]
    async fn storage_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the restaurant directory should be
        std::fs::write(dir.path().join("Italian"), b"not a dir").unwrap();
        let path = dir.path().join("Italian/Luigi's/menu");

        let err = Materializer::new()
            .ensure_materialized(&luigi(), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Io(_)));
        assert!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_materializes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Italian/Luigi's/menu");
        let m = Arc::new(Materializer::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let m = m.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    let wrote = m.ensure_materialized(&luigi(), &path).await.unwrap();
                    (wrote, std::fs::read(&path).unwrap())
                })
            })
            .collect();

        let mut writes = 0;
        for task in tasks {
            let (wrote, content) = task.await.unwrap();
            writes += usize::from(wrote);
            assert_eq!(content, luigi().render_menu());
        }
        assert_eq!(writes, 1);
    }

    #[test]
    fn staging_names() {
        assert_eq!(staging_name("menu"), ".menu.tmp");
    }
}
