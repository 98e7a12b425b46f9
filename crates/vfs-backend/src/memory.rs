use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RawMutex};
use lock_api::RawMutex as _;
use vfs_core::{VfsError, VfsResult};
use vfs_path::dirname;

use crate::backend::{Backend, BulkRequest};
use crate::mutex::{BackendMutex, MutexAcquireOutcome};
use crate::types::{FileEntry, FileMeta, FileType};

#[derive(Debug, Clone)]
enum StoredNode {
    File(Vec<u8>),
    Directory,
    Symlink(String),
}

#[derive(Debug, Clone)]
struct Entry {
    node: StoredNode,
    meta: FileMeta,
}

/// An in-process reference implementation of [`Backend`], used by tests and
/// the demo binary. Not a persistence layer: state lives only as long as the
/// process does.
pub struct InMemoryBackend {
    tree: Mutex<HashMap<String, Entry>>,
    generation: Arc<AtomicU64>,
    /// The single lock every `create_mutex()` handle shares, so that two
    /// cache instances over the same backend actually exclude one another
    /// (spec §4.3/glossary "backend mutex") rather than each locking a
    /// private `RawMutex` of their own.
    lock: Arc<RawMutex>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let mut tree = HashMap::new();
        tree.insert(
            "/".to_string(),
            Entry {
                node: StoredNode::Directory,
                meta: FileMeta::now(),
            },
        );
        InMemoryBackend {
            tree: Mutex::new(tree),
            generation: Arc::new(AtomicU64::new(0)),
            lock: Arc::new(RawMutex::INIT),
        }
    }

    /// Test-only hook simulating a write performed by some other holder of
    /// the backend, bypassing our own mutex's bookkeeping so the next
    /// `acquire` reports [`MutexAcquireOutcome::Stale`].
    pub fn force_external_mutation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn to_file_entry(path: &str, entry: &Entry) -> FileEntry {
        let filename = vfs_path::basename(path);
        match &entry.node {
            StoredNode::File(_) => FileEntry::file(filename, path, entry.meta),
            StoredNode::Directory => FileEntry::directory(filename, path, entry.meta),
            StoredNode::Symlink(dest) => FileEntry::symlink(filename, path, dest.clone(), entry.meta),
        }
    }
}

impl Backend for InMemoryBackend {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let tree = self.tree.lock();
        match tree.get(path) {
            Some(Entry { node: StoredNode::File(bytes), .. }) => Ok(bytes.clone()),
            Some(_) => Err(VfsError::not_file(path)),
            None => Err(VfsError::no_entry(path)),
        }
    }

    fn read_dir(&self, path: &str) -> VfsResult<Vec<FileEntry>> {
        let tree = self.tree.lock();
        match tree.get(path) {
            Some(Entry { node: StoredNode::Directory, .. }) => {}
            Some(_) => return Err(VfsError::not_directory(path)),
            None => return Err(VfsError::no_entry(path)),
        }
        let mut out = Vec::new();
        for (candidate, entry) in tree.iter() {
            if candidate != "/" && dirname(candidate) == path {
                out.push(Self::to_file_entry(candidate, entry));
            }
        }
        Ok(out)
    }

    fn linfo(&self, path: &str) -> VfsResult<Option<FileEntry>> {
        let tree = self.tree.lock();
        Ok(tree.get(path).map(|entry| Self::to_file_entry(path, entry)))
    }

    fn bulk(&self, request: BulkRequest) -> VfsResult<()> {
        let mut tree = self.tree.lock();

        for path in &request.to_delete {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            tree.retain(|candidate, _| candidate != path && !candidate.starts_with(&prefix));
        }

        for path in &request.folders_to_create {
            tree.insert(
                path.clone(),
                Entry {
                    node: StoredNode::Directory,
                    meta: FileMeta::now(),
                },
            );
        }

        for (path, bytes) in request.files_to_write {
            tree.insert(
                path,
                Entry {
                    node: StoredNode::File(bytes),
                    meta: FileMeta::now(),
                },
            );
        }

        // Checked before any symlink is inserted so a conflicting target
        // further down the list can't leave the batch half-applied: either
        // every symlink in this request lands, or none of them do.
        if let Some((path, _)) = request.symlinks_to_create.iter().find(|(path, _)| tree.contains_key(path)) {
            let path = path.clone();
            drop(tree);
            self.generation.fetch_add(1, Ordering::SeqCst);
            return Err(VfsError::already_exists(path));
        }

        for (path, destination) in request.symlinks_to_create {
            tree.insert(
                path,
                Entry {
                    node: StoredNode::Symlink(destination),
                    meta: FileMeta::now(),
                },
            );
        }

        for (path, meta) in request.meta_updates {
            if let Some(entry) = tree.get_mut(&path) {
                entry.meta = meta;
            }
        }

        drop(tree);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create_mutex(&self) -> Box<dyn BackendMutex> {
        Box::new(InMemoryMutex {
            raw: Arc::clone(&self.lock),
            generation: Arc::clone(&self.generation),
            last_seen: AtomicU64::new(self.generation.load(Ordering::SeqCst)),
        })
    }
}

struct InMemoryMutex {
    raw: Arc<RawMutex>,
    generation: Arc<AtomicU64>,
    last_seen: AtomicU64,
}

impl BackendMutex for InMemoryMutex {
    fn acquire(&self) -> MutexAcquireOutcome {
        self.raw.lock();
        let current = self.generation.load(Ordering::SeqCst);
        let previous = self.last_seen.load(Ordering::SeqCst);
        if current == previous {
            MutexAcquireOutcome::Fresh
        } else {
            self.last_seen.store(current, Ordering::SeqCst);
            MutexAcquireOutcome::Stale
        }
    }

    fn release(&self) {
        let current = self.generation.load(Ordering::SeqCst);
        self.last_seen.store(current, Ordering::SeqCst);
        unsafe {
            self.raw.unlock();
        }
    }
}

// SAFETY: `raw` is shared (via `Arc`) across every `InMemoryMutex` handed out
// by `create_mutex()` for a given backend, so it is genuinely the exclusion
// point between concurrent cache instances (spec §4.3/glossary "backend
// mutex"). `lock`/`unlock` are only ever called from within `acquire`/
// `release`, in strict acquire-then-release pairs per handle.
unsafe impl Send for InMemoryMutex {}
unsafe impl Sync for InMemoryMutex {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_exists_from_construction() {
        let backend = InMemoryBackend::new();
        assert!(backend.linfo("/").unwrap().is_some());
        assert!(backend.read_dir("/").unwrap().is_empty());
    }

    #[test]
    fn bulk_respects_ordering_contract() {
        let backend = InMemoryBackend::new();
        let mut req = BulkRequest::default();
        req.folders_to_create.push("/a".to_string());
        req.folders_to_create.push("/a/b".to_string());
        req.files_to_write.push(("/a/b/c".to_string(), vec![0xDE, 0xAD]));
        backend.bulk(req).unwrap();

        assert_eq!(backend.read_file("/a/b/c").unwrap(), vec![0xDE, 0xAD]);
        let listing = backend.read_dir("/a").unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].filename, "b");
    }

    #[test]
    fn delete_is_recursive() {
        let backend = InMemoryBackend::new();
        let mut req = BulkRequest::default();
        req.folders_to_create.push("/a".to_string());
        req.folders_to_create.push("/a/b".to_string());
        req.files_to_write.push(("/a/b/c".to_string(), vec![1]));
        backend.bulk(req).unwrap();

        let mut del = BulkRequest::default();
        del.to_delete.push("/a".to_string());
        backend.bulk(del).unwrap();

        assert!(backend.linfo("/a").unwrap().is_none());
        assert!(backend.linfo("/a/b").unwrap().is_none());
        assert!(backend.linfo("/a/b/c").unwrap().is_none());
    }

    #[test]
    fn symlink_create_over_existing_is_an_error() {
        let backend = InMemoryBackend::new();
        let mut req = BulkRequest::default();
        req.files_to_write.push(("/x".to_string(), vec![1]));
        backend.bulk(req).unwrap();

        let mut req2 = BulkRequest::default();
        req2.symlinks_to_create.push(("/x".to_string(), "/y".to_string()));
        assert!(backend.bulk(req2).is_err());
    }

    #[test]
    fn mutex_reports_fresh_then_stale_after_external_mutation() {
        let backend = InMemoryBackend::new();
        let mutex = backend.create_mutex();
        assert_eq!(mutex.acquire(), MutexAcquireOutcome::Fresh);
        mutex.release();

        backend.force_external_mutation();

        assert_eq!(mutex.acquire(), MutexAcquireOutcome::Stale);
        mutex.release();
        assert_eq!(mutex.acquire(), MutexAcquireOutcome::Fresh);
        mutex.release();
    }

    #[test]
    fn two_mutex_handles_from_one_backend_exclude_each_other() {
        let backend = InMemoryBackend::new();
        let a = backend.create_mutex();
        let b = backend.create_mutex();

        assert_eq!(a.acquire(), MutexAcquireOutcome::Fresh);
        // `b` contends for the same underlying lock `a` is holding, not a
        // private one of its own.
        assert!(!backend.lock.try_lock());
        a.release();

        assert_eq!(b.acquire(), MutexAcquireOutcome::Fresh);
        b.release();
    }
}
