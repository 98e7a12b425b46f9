use std::collections::VecDeque;

use vfs_backend::{Backend, BulkRequest};
use vfs_core::VfsResult;

use crate::node::{CachedNodeType, OldType};
use crate::tree::ShadowTree;

/// Walks the shadow tree breadth-first from the root, building the five
/// mutation lists per the (newType, oldType) action table, then flushes them
/// through the backend in one `bulk` call if any are non-empty.
///
/// Because the walk is breadth-first and children are enumerated after their
/// parent, `folders_to_create` comes out naturally top-down, satisfying the
/// backend contract without extra sorting.
pub fn commit(tree: &mut ShadowTree, backend: &dyn Backend) -> VfsResult<()> {
    let Some(root) = tree.root_index() else {
        return Ok(());
    };

    let mut request = BulkRequest::default();
    let mut queue = VecDeque::new();
    queue.push_back(root);

    while let Some(idx) = queue.pop_front() {
        let path = tree.node(idx).file_path.clone();
        let old_type = tree.node(idx).old_type;
        let meta_dirty = tree.node(idx).meta_dirty;
        let meta = tree.node(idx).meta;

        match &tree.node(idx).new_type {
            CachedNodeType::Nonexistent => {
                if old_type != OldType::Nonexistent {
                    request.to_delete.push(path);
                }
            }
            CachedNodeType::DirectoryNew(children) => {
                if old_type != OldType::Nonexistent {
                    request.to_delete.push(path.clone());
                }
                request.folders_to_create.push(path);
                queue.extend(children.iter().copied());
            }
            CachedNodeType::FileDirty(bytes) => {
                if old_type != OldType::Nonexistent && old_type != OldType::File {
                    request.to_delete.push(path.clone());
                }
                request.files_to_write.push((path, bytes.clone()));
            }
            CachedNodeType::SymlinkDirty(destination) => {
                if old_type != OldType::Nonexistent {
                    request.to_delete.push(path.clone());
                }
                request.symlinks_to_create.push((path, destination.clone()));
            }
            CachedNodeType::Directory(children) => {
                if let Some(children) = children {
                    queue.extend(children.iter().copied());
                }
                if meta_dirty {
                    request.meta_updates.push((path, meta));
                }
            }
            CachedNodeType::File(_) | CachedNodeType::Symlink(_) => {
                if meta_dirty {
                    request.meta_updates.push((path, meta));
                }
            }
        }
    }

    let result = if !request.is_empty() { backend.bulk(request) } else { Ok(()) };

    // The shadow tree is dropped whether or not the bulk call succeeded
    // (spec §7): a failed commit still releases the cache to start fresh
    // against the backend on the next operation.
    tree.dismantle();
    result
}
