use std::collections::VecDeque;

use vfs_backend::{FileMeta, FileType};
use vfs_cache::FileCache;
use vfs_core::VfsResult;

/// One node visited during a breadth-first walk. A thin, owned view over
/// what `linfo`/`readDir` already expose — traversal never needs arena
/// indices, only paths, so a walk can resume from anywhere by path alone.
#[derive(Debug, Clone)]
pub struct TraversalEntry {
    pub path: String,
    pub name: String,
    pub file_type: FileType,
    pub meta: FileMeta,
}

impl From<vfs_backend::FileEntry> for TraversalEntry {
    fn from(entry: vfs_backend::FileEntry) -> Self {
        TraversalEntry {
            path: entry.file_path,
            name: entry.filename,
            file_type: entry.file_type,
            meta: entry.meta,
        }
    }
}

/// Single-threaded breadth-first walk of the shadow tree starting at
/// `root`, generalising the work-queue shape of the disk-scanning walker
/// this crate is descended from: a FIFO queue of pending paths, popped and
/// expanded one at a time.
///
/// `root` itself is visited first. `visit` returns whether to keep going;
/// returning `false` stops the walk without visiting anything still queued.
/// Directories are expanded into their children; symlinks are never
/// descended into (their target is not walked), so the traversal can't
/// enter a cycle.
pub fn walk_bfs(
    cache: &mut FileCache,
    root: &str,
    mut visit: impl FnMut(&mut FileCache, &TraversalEntry) -> VfsResult<bool>,
) -> VfsResult<()> {
    let Some(root_entry) = cache.linfo(root)? else {
        return Ok(());
    };

    let mut queue: VecDeque<TraversalEntry> = VecDeque::new();
    queue.push_back(TraversalEntry::from(root_entry));

    while let Some(entry) = queue.pop_front() {
        let keep_going = visit(cache, &entry)?;
        if !keep_going {
            break;
        }
        if entry.file_type == FileType::Directory {
            let children = cache.dir_entries_following(&entry.path)?;
            queue.extend(children.into_iter().map(TraversalEntry::from));
        }
    }
    Ok(())
}

/// The recursive byte size under `path`: the sum of every plain file's
/// contents length reachable without crossing a symlink. Symlink entries
/// contribute 0.
pub fn du(cache: &mut FileCache, path: &str) -> VfsResult<u64> {
    let mut total: u64 = 0;
    walk_bfs(cache, path, |cache, entry| {
        if entry.file_type == FileType::File {
            total += cache.read_file_direct(&entry.path)?.len() as u64;
        }
        Ok(true)
    })?;
    Ok(total)
}
