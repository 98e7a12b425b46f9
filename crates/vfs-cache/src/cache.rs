use std::sync::Arc;

use vfs_backend::{BasicFileEntry, BasicFileType, Backend, FileEntry, FileMeta};
use vfs_core::{VfsError, VfsResult};

use crate::commit;
use crate::node::CachedNodeType;
use crate::tree::ShadowTree;

/// Snapshot of a resolved node, handed back across the cache boundary so
/// callers never see arena indices.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub file_path: String,
    pub file_type: vfs_backend::FileType,
    pub destination: Option<String>,
    pub meta: FileMeta,
}

/// The cached shadow tree plus the backend it mirrors. Not internally
/// synchronised: callers (the scheduler) are responsible for serialising
/// access, per the single-threaded cooperative model this cache is built
/// for.
pub struct FileCache {
    backend: Arc<dyn Backend>,
    tree: ShadowTree,
}

impl FileCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        FileCache { backend, tree: ShadowTree::new() }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    fn node_info(&self, idx: usize) -> VfsResult<NodeInfo> {
        let node = self.tree.node(idx);
        let file_type = node
            .new_type
            .as_file_type()
            .ok_or_else(|| VfsError::no_entry(node.file_path.clone()))?;
        Ok(NodeInfo {
            file_path: node.file_path.clone(),
            file_type,
            destination: node.new_type.symlink_destination().map(str::to_string),
            meta: node.meta,
        })
    }

    /// Non-recursive single-level directory create: the parent must exist,
    /// the target must not.
    pub fn mk_dir(&mut self, path: &str) -> VfsResult<()> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.mk_dir(idx)
    }

    /// Creates a symlink, storing `destination` verbatim (unresolved).
    pub fn mk_lnk(&mut self, path: &str, destination: &str) -> VfsResult<()> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.mk_lnk(idx, destination.to_string())
    }

    /// Creates or overwrites a file.
    pub fn write_file(&mut self, path: &str, bytes: Vec<u8>) -> VfsResult<()> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.write_file(idx, bytes)
    }

    /// Removes a file, symlink, or empty placeholder at `path`. Directory
    /// emptiness is the caller's responsibility (see `children_names`).
    pub fn remove(&mut self, path: &str) -> VfsResult<()> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.delete(idx)
    }

    /// Reads file bytes without following symlinks; fails if `path` is not a
    /// plain file.
    pub fn read_file_direct(&mut self, path: &str) -> VfsResult<Vec<u8>> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.read_file(idx, self.backend.as_ref())
    }

    /// Reads file bytes, following a symlink chain first.
    pub fn read_file_following(&mut self, path: &str) -> VfsResult<Vec<u8>> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        let idx = self.tree.resolve_symlink(idx, self.backend.as_ref())?;
        self.tree.read_file(idx, self.backend.as_ref())
    }

    /// `lstat`-style lookup: no symlink following, returns `None` for a
    /// nonexistent path instead of erroring.
    pub fn linfo(&mut self, path: &str) -> VfsResult<Option<FileEntry>> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        let node = self.tree.node(idx);
        let Some(file_type) = node.new_type.as_file_type() else {
            return Ok(None);
        };
        Ok(Some(FileEntry {
            filename: node.filename.clone(),
            file_path: node.file_path.clone(),
            file_type,
            destination: node.new_type.symlink_destination().map(str::to_string),
            meta: node.meta,
        }))
    }

    /// `stat`-style lookup: follows symlinks; fails ENOENT if nothing is
    /// there and restricts the result to FILE|DIRECTORY.
    pub fn info(&mut self, path: &str) -> VfsResult<BasicFileEntry> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        let idx = self.tree.resolve_symlink(idx, self.backend.as_ref())?;
        let info = self.node_info(idx)?;
        let file_type = match info.file_type {
            vfs_backend::FileType::Directory => BasicFileType::Directory,
            vfs_backend::FileType::File => BasicFileType::File,
            vfs_backend::FileType::Symlink => {
                return Err(VfsError::no_entry(info.file_path));
            }
        };
        Ok(BasicFileEntry {
            filename: vfs_path::basename(&info.file_path),
            file_path: info.file_path,
            file_type,
            meta: info.meta,
        })
    }

    /// `readLink`: the verbatim symlink destination, failing ENOTLNK if
    /// `path` is not a symlink.
    pub fn read_link(&mut self, path: &str) -> VfsResult<String> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        let node = self.tree.node(idx);
        node.new_type
            .symlink_destination()
            .map(str::to_string)
            .ok_or_else(|| VfsError::not_symlink(node.file_path.clone()))
    }

    /// The live child filenames of a directory, following symlinks to reach
    /// it first.
    pub fn dir_entries_following(&mut self, path: &str) -> VfsResult<Vec<FileEntry>> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        let idx = self.tree.resolve_symlink(idx, self.backend.as_ref())?;
        self.dir_entries_at(idx)
    }

    /// The live child entries of a directory already resolved to an arena
    /// index (used by traversal helpers that walk many nodes without
    /// re-resolving from the root each time).
    pub(crate) fn dir_entries_at(&mut self, idx: usize) -> VfsResult<Vec<FileEntry>> {
        let children = self.tree.retrieve_children(idx, self.backend.as_ref())?.to_vec();
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let node = self.tree.node(child);
            if let Some(file_type) = node.new_type.as_file_type() {
                out.push(FileEntry {
                    filename: node.filename.clone(),
                    file_path: node.file_path.clone(),
                    file_type,
                    destination: node.new_type.symlink_destination().map(str::to_string),
                    meta: node.meta,
                });
            }
        }
        Ok(out)
    }

    // --- Index-level API for vfs-traversal / vfs-facade ---------------
    //
    // The path-string methods above resolve from the root every time, which
    // is the right default for one-off facade calls. Recursive helpers
    // (rm -r, copy, du, forEach) walk many nodes per operation and would
    // pay that walk repeatedly; these expose the already-resolved arena
    // index so a traversal can move to a child without re-resolving its
    // full path.

    pub fn resolve_index(&mut self, path: &str) -> VfsResult<usize> {
        self.tree.resolve(path, self.backend.as_ref())
    }

    pub fn resolve_index_following(&mut self, path: &str) -> VfsResult<usize> {
        let idx = self.tree.resolve(path, self.backend.as_ref())?;
        self.tree.resolve_symlink(idx, self.backend.as_ref())
    }

    pub fn node_exists(&self, idx: usize) -> bool {
        self.tree.node(idx).new_type.exists()
    }

    pub fn node_is_dir(&self, idx: usize) -> bool {
        self.tree.node(idx).new_type.is_dir()
    }

    pub fn node_file_path(&self, idx: usize) -> String {
        self.tree.node(idx).file_path.clone()
    }

    pub fn node_file_type(&self, idx: usize) -> Option<vfs_backend::FileType> {
        self.tree.node(idx).new_type.as_file_type()
    }

    /// Deletes `idx` directly, bypassing path re-resolution (used by
    /// recursive-remove helpers that already hold the index).
    pub fn delete_index(&mut self, idx: usize) -> VfsResult<()> {
        self.tree.delete(idx)
    }

    /// Creates a directory at an already-resolved index (used by `copy`,
    /// which walks the source tree by index and mirrors each node under the
    /// target by index too, rather than re-resolving full paths per step).
    pub fn mk_dir_index(&mut self, idx: usize) -> VfsResult<()> {
        self.tree.mk_dir(idx)
    }

    /// Creates a symlink at an already-resolved index.
    pub fn mk_lnk_index(&mut self, idx: usize, destination: String) -> VfsResult<()> {
        self.tree.mk_lnk(idx, destination)
    }

    /// Writes file bytes at an already-resolved index.
    pub fn write_file_index(&mut self, idx: usize, bytes: Vec<u8>) -> VfsResult<()> {
        self.tree.write_file(idx, bytes)
    }

    /// Reads file bytes at an already-resolved index, without symlink
    /// following (the caller resolved the index itself).
    pub fn read_file_index(&mut self, idx: usize) -> VfsResult<Vec<u8>> {
        self.tree.read_file(idx, self.backend.as_ref())
    }

    /// The verbatim symlink destination at an already-resolved index, or
    /// `None` if the node is not a symlink.
    pub fn symlink_destination_at(&self, idx: usize) -> Option<String> {
        self.tree.node(idx).new_type.symlink_destination().map(str::to_string)
    }

    /// The live child entries of a directory already resolved to an arena
    /// index (used by traversal helpers walking many nodes without
    /// re-resolving from the root each time).
    pub fn dir_entries_at_index(&mut self, idx: usize) -> VfsResult<Vec<FileEntry>> {
        self.dir_entries_at(idx)
    }

    /// True iff a root has ever been materialised — commit is a no-op
    /// otherwise.
    pub fn is_materialized(&self) -> bool {
        self.tree.is_materialized()
    }

    /// Flushes the accumulated shadow-tree mutations through the backend's
    /// `bulk` entry point, then dismantles the tree.
    pub fn commit(&mut self) -> VfsResult<()> {
        commit::commit(&mut self.tree, self.backend.as_ref())
    }

    /// Matches every CachedNodeType variant to its seven-state name, used by
    /// tests asserting the "exactly one payload populated" invariant.
    #[cfg(test)]
    pub(crate) fn debug_node_type_name(&self, idx: usize) -> &'static str {
        match &self.tree.node(idx).new_type {
            CachedNodeType::Directory(_) => "DIRECTORY",
            CachedNodeType::DirectoryNew(_) => "DIRECTORY_NEW",
            CachedNodeType::File(_) => "FILE",
            CachedNodeType::FileDirty(_) => "FILE_DIRTY",
            CachedNodeType::Symlink(_) => "SYMLINK",
            CachedNodeType::SymlinkDirty(_) => "SYMLINK_DIRTY",
            CachedNodeType::Nonexistent => "NONEXISTENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs_backend::InMemoryBackend;

    fn fresh_cache() -> FileCache {
        FileCache::new(Arc::new(InMemoryBackend::new()))
    }

    #[test]
    fn write_then_read_without_commit_round_trips() {
        let mut cache = fresh_cache();
        cache.write_file("/a.txt", vec![1, 2, 3]).unwrap();
        assert_eq!(cache.read_file_direct("/a.txt").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn mkdir_then_mkdir_again_is_already_exists() {
        let mut cache = fresh_cache();
        cache.mk_dir("/a").unwrap();
        let err = cache.mk_dir("/a").unwrap_err();
        assert_eq!(err.kind.code(), "EEXIST");
    }

    #[test]
    fn mkdir_without_parent_is_no_entry() {
        let mut cache = fresh_cache();
        let err = cache.mk_dir("/missing/child").unwrap_err();
        assert_eq!(err.kind.code(), "ENOENT");
    }

    #[test]
    fn mkdir_then_remove_nets_to_zero_without_delete() {
        let mut cache = fresh_cache();
        cache.mk_dir("/a").unwrap();
        cache.remove("/a").unwrap();
        if cache.is_materialized() {
            let idx = cache.resolve_index("/a").unwrap();
            assert_eq!(cache.debug_node_type_name(idx), "NONEXISTENT");
        }
        cache.commit().unwrap();
        assert!(cache.backend().linfo("/a").unwrap().is_none());
    }

    #[test]
    fn scenario_a_nested_mkdir_and_write() {
        let mut cache = fresh_cache();
        cache.mk_dir("/a").unwrap();
        cache.mk_dir("/a/b").unwrap();
        cache.write_file("/a/b/c", vec![0xDE, 0xAD]).unwrap();
        cache.commit().unwrap();

        assert_eq!(cache.backend().read_file("/a/b/c").unwrap(), vec![0xDE, 0xAD]);
        assert!(cache.backend().linfo("/a").unwrap().is_some());
        assert!(cache.backend().linfo("/a/b").unwrap().is_some());
    }

    #[test]
    fn readdir_does_not_mark_anything_dirty() {
        let backend = Arc::new(InMemoryBackend::new());
        {
            let mut seed = FileCache::new(backend.clone());
            seed.mk_dir("/d").unwrap();
            seed.write_file("/d/a", vec![1]).unwrap();
            seed.write_file("/d/b", vec![1]).unwrap();
            seed.write_file("/d/c", vec![1]).unwrap();
            seed.commit().unwrap();
        }
        let mut cache = FileCache::new(backend);
        let entries = cache.dir_entries_following("/d").unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.filename.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
