//! Open file handle table.

use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{FsError, FsResult};

/// Maps FUSE file handles to open backing files.
///
/// Handle `0` is never issued; it is what `opendir` hands out.
pub struct HandleTable {
    next_fh: AtomicU64,
    open: Mutex<HashMap<u64, Arc<File>>>,
}

impl Default for HandleTable {
    fn default() -> Self {
        HandleTable {
            next_fh: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, file: File) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.open.lock().await.insert(fh, Arc::new(file));
        fh
    }

    pub async fn get(&self, fh: u64) -> FsResult<Arc<File>> {
        self.open
            .lock()
            .await
            .get(&fh)
            .cloned()
            .ok_or(FsError::BadHandle(fh))
    }

    pub async fn remove(&self, fh: u64) -> FsResult<Arc<File>> {
        self.open
            .lock()
            .await
            .remove(&fh)
            .ok_or(FsError::BadHandle(fh))
    }

    pub async fn len(&self) -> usize {
        self.open.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issue_lookup_release() {
        let table = HandleTable::new();
        let file = tempfile::tempfile().unwrap();

        let fh = table.insert(file).await;
        assert_ne!(fh, 0);
        assert!(table.get(fh).await.is_ok());
        assert_eq!(table.len().await, 1);

        table.remove(fh).await.unwrap();
        assert!(matches!(table.get(fh).await, Err(FsError::BadHandle(h)) if h == fh));
        assert!(table.remove(fh).await.is_err());
    }

    #[test]
    fn handles_are_unique() {
        tokio_test::block_on(async {
            let table = HandleTable::new();
            let a = table.insert(tempfile::tempfile().unwrap()).await;
            let b = table.insert(tempfile::tempfile().unwrap()).await;
            assert_ne!(a, b);
        });
    }
}
