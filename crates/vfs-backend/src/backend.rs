use vfs_core::VfsResult;

use crate::mutex::BackendMutex;
use crate::types::{FileEntry, FileMeta};

/// The single mutation entry point. Built by the commit engine, honouring
/// the ordering contract documented on [`Backend::bulk`].
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    /// Recursive deletes. No descendant of a deleted path appears in any
    /// other list.
    pub to_delete: Vec<String>,
    /// Directory creates, top-down: every parent appears before its
    /// children.
    pub folders_to_create: Vec<String>,
    /// File (over)writes; parent is guaranteed to exist by the time this
    /// runs.
    pub files_to_write: Vec<(String, Vec<u8>)>,
    /// Symlink creates; parent is guaranteed to exist, target must not.
    pub symlinks_to_create: Vec<(String, String)>,
    /// Metadata-only updates, applied last.
    pub meta_updates: Vec<(String, FileMeta)>,
}

impl BulkRequest {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty()
            && self.folders_to_create.is_empty()
            && self.files_to_write.is_empty()
            && self.symlinks_to_create.is_empty()
            && self.meta_updates.is_empty()
    }
}

/// The contract a storage backend must satisfy (spec §4.3).
///
/// Meta objects handed to [`Backend::bulk`] are consumed by the backend and
/// must not be mutated after hand-off; meta objects returned by read
/// operations must be safe for the caller to mutate.
pub trait Backend: Send + Sync {
    /// The file's current contents.
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Entries directly under `path`.
    fn read_dir(&self, path: &str) -> VfsResult<Vec<FileEntry>>;

    /// The entry for `path` itself; does not follow symlinks. `None` if
    /// nothing exists there.
    fn linfo(&self, path: &str) -> VfsResult<Option<FileEntry>>;

    /// Apply a batch of mutations. Callers must honour the ordering
    /// documented on [`BulkRequest`]; implementers may rely on it.
    fn bulk(&self, request: BulkRequest) -> VfsResult<()>;

    /// Factory for a process-local mutual exclusion primitive.
    fn create_mutex(&self) -> Box<dyn BackendMutex>;
}
