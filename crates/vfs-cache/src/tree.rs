use vfs_backend::{Backend, FileMeta};
use vfs_core::{VfsError, VfsResult};

use crate::node::{CachedNode, CachedNodeType, OldType};

const MAX_SYMLINK_HOPS: u32 = 64;

/// The in-memory mirror of (a subset of) the backend's namespace. A flat
/// arena of [`CachedNode`]s addressed by index — parents point at their
/// children's indices, children point back at their parent's index. Dropping
/// the whole `Vec` after commit reclaims the tree in one shot.
pub struct ShadowTree {
    nodes: Vec<CachedNode>,
    root: Option<usize>,
}

impl ShadowTree {
    pub fn new() -> Self {
        ShadowTree { nodes: Vec::new(), root: None }
    }

    pub fn is_materialized(&self) -> bool {
        self.root.is_some()
    }

    pub fn root_index(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, idx: usize) -> &CachedNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut CachedNode {
        &mut self.nodes[idx]
    }

    pub fn all_nodes(&self) -> &[CachedNode] {
        &self.nodes
    }

    /// Drops the whole tree after a commit, so the next operation starts
    /// fresh against the backend.
    pub fn dismantle(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    fn ensure_root(&mut self, backend: &dyn Backend) -> VfsResult<usize> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root_node = match backend.linfo("/")? {
            Some(entry) => CachedNode::root(entry.meta, OldType::Directory, CachedNodeType::Directory(None)),
            None => CachedNode::root(FileMeta::now(), OldType::Nonexistent, CachedNodeType::DirectoryNew(Vec::new())),
        };
        self.nodes.push(root_node);
        let idx = self.nodes.len() - 1;
        self.root = Some(idx);
        Ok(idx)
    }

    /// Loads (if needed) and returns the child indices of a directory node.
    pub fn retrieve_children(&mut self, idx: usize, backend: &dyn Backend) -> VfsResult<&[usize]> {
        let path = self.nodes[idx].file_path.clone();
        if !self.nodes[idx].new_type.is_dir() {
            return Err(VfsError::not_directory(path));
        }
        if self.nodes[idx].new_type.children().is_none() {
            let entries = backend.read_dir(&path)?;
            let mut indices = Vec::with_capacity(entries.len());
            for entry in &entries {
                self.nodes.push(CachedNode::from_entry(idx, entry));
                indices.push(self.nodes.len() - 1);
            }
            if let CachedNodeType::Directory(children) = &mut self.nodes[idx].new_type {
                *children = Some(indices);
            }
        }
        Ok(self.nodes[idx].new_type.children().expect("just loaded"))
    }

    /// Resolves a named child of `idx`, materialising a `NONEXISTENT`
    /// placeholder if it isn't present. May be called more than once for the
    /// same name; subsequent calls find the same node.
    pub fn retrieve_child(&mut self, idx: usize, name: &str, backend: &dyn Backend) -> VfsResult<usize> {
        let children = self.retrieve_children(idx, backend)?.to_vec();
        for child in children {
            if self.nodes[child].filename == name {
                return Ok(child);
            }
        }
        let parent_path = self.nodes[idx].file_path.clone();
        let child_path = vfs_path::join(&[&parent_path, name]);
        self.nodes.push(CachedNode::placeholder(idx, name.to_string(), child_path));
        let new_idx = self.nodes.len() - 1;
        self.nodes[idx]
            .new_type
            .children_mut()
            .expect("checked is_dir above")
            .push(new_idx);
        Ok(new_idx)
    }

    /// Walks from the root to `path`, per the corrected resolution rule:
    /// every interior component must exist and be a directory; the final
    /// component is returned unchecked. Symlinks are not followed.
    pub fn resolve(&mut self, path: &str, backend: &dyn Backend) -> VfsResult<usize> {
        let root = self.ensure_root(backend)?;
        let components = vfs_path::split(path);
        let parts = &components[1..];
        if parts.is_empty() {
            return Ok(root);
        }

        let mut current = root;
        let mut walked = "/".to_string();
        for part in parts {
            if !self.nodes[current].new_type.exists() {
                return Err(VfsError::no_entry(walked));
            }
            if !self.nodes[current].new_type.is_dir() {
                return Err(VfsError::not_directory(walked));
            }
            current = self.retrieve_child(current, part, backend)?;
            walked = self.nodes[current].file_path.clone();
        }
        Ok(current)
    }

    /// The second-stage symlink-following helper (spec-corrected semantics):
    /// while the node at `idx` is a symlink, look up its destination
    /// (resolved against the symlink's own parent directory when relative)
    /// and continue, up to a fixed hop limit.
    pub fn resolve_symlink(&mut self, idx: usize, backend: &dyn Backend) -> VfsResult<usize> {
        let origin_path = self.nodes[idx].file_path.clone();
        let mut current = idx;
        let mut hops: u32 = 0;
        loop {
            let destination = match self.nodes[current].new_type.symlink_destination() {
                Some(dest) => dest.to_string(),
                None => return Ok(current),
            };
            hops += 1;
            if hops > MAX_SYMLINK_HOPS {
                return Err(VfsError::symlink_loop(origin_path));
            }
            let parent_dir = vfs_path::dirname(&self.nodes[current].file_path);
            let target = vfs_path::resolve(&[&parent_dir, &destination]);
            current = self.resolve(&target, backend)?;
        }
    }

    pub fn mk_dir(&mut self, idx: usize) -> VfsResult<()> {
        if self.nodes[idx].new_type.exists() {
            return Err(VfsError::already_exists(self.nodes[idx].file_path.clone()));
        }
        self.nodes[idx].new_type = CachedNodeType::DirectoryNew(Vec::new());
        self.nodes[idx].touch();
        self.touch_parent(idx);
        Ok(())
    }

    pub fn mk_lnk(&mut self, idx: usize, destination: String) -> VfsResult<()> {
        if self.nodes[idx].new_type.exists() {
            return Err(VfsError::already_exists(self.nodes[idx].file_path.clone()));
        }
        self.nodes[idx].new_type = CachedNodeType::SymlinkDirty(destination);
        self.nodes[idx].touch();
        self.touch_parent(idx);
        Ok(())
    }

    pub fn write_file(&mut self, idx: usize, bytes: Vec<u8>) -> VfsResult<()> {
        let node = &self.nodes[idx];
        if node.new_type.exists() && !node.new_type.is_file() {
            return Err(VfsError::not_file(node.file_path.clone()));
        }
        let was_new = !node.new_type.exists();
        self.nodes[idx].new_type = CachedNodeType::FileDirty(bytes);
        self.nodes[idx].touch();
        if was_new {
            self.touch_parent(idx);
        }
        Ok(())
    }

    pub fn delete(&mut self, idx: usize) -> VfsResult<()> {
        if !self.nodes[idx].new_type.exists() {
            return Err(VfsError::no_entry(self.nodes[idx].file_path.clone()));
        }
        self.nodes[idx].new_type = CachedNodeType::Nonexistent;
        self.touch_parent(idx);
        Ok(())
    }

    fn touch_parent(&mut self, idx: usize) {
        if let Some(parent) = self.nodes[idx].parent {
            self.nodes[parent].touch();
        }
    }

    /// Reads a file's bytes, fetching from the backend on first access to a
    /// clean (non-dirty) node.
    pub fn read_file(&mut self, idx: usize, backend: &dyn Backend) -> VfsResult<Vec<u8>> {
        let path = self.nodes[idx].file_path.clone();
        match &self.nodes[idx].new_type {
            CachedNodeType::FileDirty(bytes) => Ok(bytes.clone()),
            CachedNodeType::File(Some(bytes)) => Ok(bytes.clone()),
            CachedNodeType::File(None) => {
                let bytes = backend.read_file(&path)?;
                self.nodes[idx].new_type = CachedNodeType::File(Some(bytes.clone()));
                Ok(bytes)
            }
            CachedNodeType::Nonexistent => Err(VfsError::no_entry(path)),
            _ => Err(VfsError::not_file(path)),
        }
    }
}
