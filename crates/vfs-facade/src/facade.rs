//! The POSIX-style facade (spec §6): translates user calls into
//! scheduler-mediated cache operations, resolving every path against the
//! working directory first, and implements the non-atomic helpers the
//! source leaves to this layer (recursive `mkDir`, `copy`, `move`, `du`,
//! `wipe`, `forEach`).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use vfs_backend::{BasicFileEntry, Backend, FileEntry, FileType};
use vfs_core::{VfsConfig, VfsError, VfsResult};
use vfs_incremental::UnknownChangesObserver;
use vfs_scheduler::Scheduler;

use crate::observer::{Observer, ObserverId, ObserverRegistry};

/// The mounted virtual file system: one shadow tree over one backend, with
/// its own working directory and listener registry.
pub struct Vfs {
    scheduler: Arc<Scheduler>,
    cwd: Mutex<String>,
    observers: Arc<ObserverRegistry>,
}

impl Vfs {
    pub fn new(backend: Arc<dyn Backend>, config: VfsConfig) -> Self {
        let scheduler = Arc::new(Scheduler::new(backend, config));
        let observers = Arc::new(ObserverRegistry::new());
        scheduler.set_unknown_changes_observer(Arc::clone(&observers) as Arc<dyn UnknownChangesObserver>);
        Vfs {
            scheduler,
            cwd: Mutex::new("/".to_string()),
            observers,
        }
    }

    pub fn mounted_with_defaults(backend: Arc<dyn Backend>) -> Self {
        Self::new(backend, VfsConfig::default())
    }

    // --- Working directory (spec §1 — "thin state holder") -------------

    pub fn cwd(&self) -> String {
        self.cwd.lock().clone()
    }

    pub fn set_cwd(&self, path: &str) {
        let resolved = self.resolve(path);
        *self.cwd.lock() = resolved;
    }

    fn resolve(&self, path: &str) -> String {
        let cwd = self.cwd.lock();
        vfs_path::resolve_from(&cwd, &[path])
    }

    // --- Observers (spec §6, §9) ----------------------------------------

    pub fn register_observer(&self, observer: Arc<dyn Observer>) -> ObserverId {
        self.observers.register(observer)
    }

    pub fn unregister_observer(&self, id: ObserverId) {
        self.observers.unregister(id);
    }

    // --- Core operations (spec §6) --------------------------------------

    pub fn mk_dir(&self, path: &str, recursive: bool) -> VfsResult<()> {
        let resolved = self.resolve(path);
        if recursive {
            self.mk_dir_recursive(&resolved)
        } else {
            self.scheduler.run(|cache| cache.mk_dir(&resolved))?;
            self.observers.dispatch_created(&resolved, FileType::Directory);
            Ok(())
        }
    }

    /// Creates every missing ancestor of `resolved`, `mkdir -p`-style: an
    /// existing directory in the chain (including the target itself) is
    /// skipped silently; an existing non-directory is an error.
    fn mk_dir_recursive(&self, resolved: &str) -> VfsResult<()> {
        let components = vfs_path::split(resolved);
        let created = self.scheduler.run(|cache| {
            let mut created = Vec::new();
            let mut current = String::new();
            for (i, part) in components.iter().enumerate() {
                current = if i == 0 { part.clone() } else { vfs_path::join(&[&current, part]) };
                let idx = cache.resolve_index(&current)?;
                if cache.node_exists(idx) {
                    if !cache.node_is_dir(idx) {
                        return Err(VfsError::not_directory(current));
                    }
                    continue;
                }
                cache.mk_dir_index(idx)?;
                created.push(current.clone());
            }
            Ok(created)
        })?;
        for path in created {
            self.observers.dispatch_created(&path, FileType::Directory);
        }
        Ok(())
    }

    pub fn mk_lnk(&self, path: &str, destination: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| cache.mk_lnk(&resolved, destination))?;
        self.observers.dispatch_created(&resolved, FileType::Symlink);
        Ok(())
    }

    pub fn write_file(&self, path: &str, contents: impl AsRef<[u8]>) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let bytes = contents.as_ref().to_vec();
        let was_new = self.scheduler.run(|cache| {
            let idx = cache.resolve_index(&resolved)?;
            let existed = cache.node_exists(idx);
            cache.write_file_index(idx, bytes)?;
            Ok(!existed)
        })?;
        if was_new {
            self.observers.dispatch_created(&resolved, FileType::File);
        } else {
            self.observers.dispatch_contents_changed(&resolved, FileType::File);
        }
        Ok(())
    }

    /// Symlinks followed.
    pub fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| cache.read_file_following(&resolved))
    }

    /// Symlinks not followed; ENOTLNK if `path` is not a symlink.
    pub fn read_link(&self, path: &str) -> VfsResult<String> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| cache.read_link(&resolved))
    }

    /// Symlinks followed; order is unspecified (spec §6).
    pub fn read_dir(&self, path: &str, full_paths: bool) -> VfsResult<Vec<String>> {
        let resolved = self.resolve(path);
        let entries = self.scheduler.run(|cache| cache.dir_entries_following(&resolved))?;
        Ok(entries
            .into_iter()
            .map(|e| if full_paths { e.file_path } else { e.filename })
            .collect())
    }

    pub fn rm(&self, path: &str, recursive: bool, folder: bool) -> VfsResult<()> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| {
            let idx = cache.resolve_index(&resolved)?;
            if !cache.node_exists(idx) {
                return Err(VfsError::no_entry(resolved.clone()));
            }
            if cache.node_is_dir(idx) {
                if !folder {
                    return Err(VfsError::is_directory(resolved.clone()));
                }
                if !recursive && !cache.dir_entries_at_index(idx)?.is_empty() {
                    return Err(VfsError::not_empty(resolved.clone()));
                }
            }
            cache.delete_index(idx)
        })?;
        self.observers.dispatch_deleted(&resolved);
        Ok(())
    }

    /// `lstat`-style lookup: no symlink following, `None` if nothing exists.
    pub fn linfo(&self, path: &str) -> VfsResult<Option<FileEntry>> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| cache.linfo(&resolved))
    }

    /// `stat`-style lookup: symlinks followed, restricted to FILE|DIRECTORY.
    pub fn info(&self, path: &str) -> VfsResult<BasicFileEntry> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| cache.info(&resolved))
    }

    /// Recursive byte size under `path`; does not follow symlinks during
    /// traversal, and a symlink entry itself contributes 0 (spec §6).
    pub fn du(&self, path: &str) -> VfsResult<u64> {
        let resolved = self.resolve(path);
        self.scheduler.run(|cache| vfs_traversal::du(cache, &resolved))
    }

    /// Recursive copy. Symlinks are copied as symlinks (their destination
    /// carried over verbatim, not followed) — the spec leaves `copy`'s
    /// symlink handling unspecified; see `DESIGN.md`. Rejects copying a
    /// source into itself or into one of its own descendants.
    pub fn copy(&self, source: &str, target: &str) -> VfsResult<()> {
        let source = self.resolve(source);
        let target = self.resolve(target);
        if nested_or_equal(&source, &target) {
            return Err(VfsError::already_exists(target));
        }

        let created = self.scheduler.run(|cache| {
            let mut created = Vec::new();
            let mut queue: VecDeque<(String, String)> = VecDeque::new();
            queue.push_back((source.clone(), target.clone()));

            while let Some((src_path, dst_path)) = queue.pop_front() {
                let src_idx = cache.resolve_index(&src_path)?;
                if !cache.node_exists(src_idx) {
                    return Err(VfsError::no_entry(src_path));
                }
                let file_type = cache.node_file_type(src_idx).expect("checked exists above");
                let dst_idx = cache.resolve_index(&dst_path)?;
                match file_type {
                    FileType::Directory => {
                        cache.mk_dir_index(dst_idx)?;
                        created.push((dst_path.clone(), FileType::Directory));
                        for child in cache.dir_entries_at_index(src_idx)? {
                            let child_dst = vfs_path::join(&[&dst_path, &child.filename]);
                            queue.push_back((child.file_path, child_dst));
                        }
                    }
                    FileType::File => {
                        let bytes = cache.read_file_index(src_idx)?;
                        cache.write_file_index(dst_idx, bytes)?;
                        created.push((dst_path.clone(), FileType::File));
                    }
                    FileType::Symlink => {
                        let destination = cache
                            .symlink_destination_at(src_idx)
                            .expect("file_type is Symlink");
                        cache.mk_lnk_index(dst_idx, destination)?;
                        created.push((dst_path.clone(), FileType::Symlink));
                    }
                }
            }
            Ok(created)
        })?;

        for (path, file_type) in created {
            self.observers.dispatch_created(&path, file_type);
        }
        Ok(())
    }

    /// Copy then remove the source (spec §9 note 5 — the source's `move`
    /// implementation is incomplete; this is the specified fallback).
    pub fn mv(&self, source: &str, target: &str) -> VfsResult<()> {
        let resolved_source = self.resolve(source);
        let source_is_dir = self.scheduler.run(|cache| {
            let idx = cache.resolve_index(&resolved_source)?;
            if !cache.node_exists(idx) {
                return Err(VfsError::no_entry(resolved_source.clone()));
            }
            Ok(cache.node_is_dir(idx))
        })?;
        self.copy(source, target)?;
        self.rm(source, source_is_dir, source_is_dir)
    }

    /// Breadth-first traversal; `visit` returns whether to keep going. Each
    /// step's read runs as its own scheduler operation rather than holding
    /// the lock for the whole walk, so `visit` may itself call back into
    /// this `Vfs` (e.g. to mutate an entry it just saw) without deadlocking
    /// (spec §6).
    pub fn for_each(&self, path: &str, mut visit: impl FnMut(&FileEntry) -> VfsResult<bool>) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let Some(root_entry) = self.linfo(&resolved)? else {
            return Ok(());
        };

        let mut queue: VecDeque<FileEntry> = VecDeque::new();
        queue.push_back(root_entry);

        while let Some(entry) = queue.pop_front() {
            let keep_going = visit(&entry)?;
            if !keep_going {
                break;
            }
            if entry.file_type == FileType::Directory {
                let children = self.scheduler.run(|cache| cache.dir_entries_following(&entry.file_path))?;
                queue.extend(children);
            }
        }
        Ok(())
    }

    /// Forces an immediate flush, cancelling any pending idle timer first.
    pub fn commit(&self) -> VfsResult<()> {
        self.scheduler.commit()
    }

    /// Removes every entry under `/`.
    pub fn wipe(&self) -> VfsResult<()> {
        let deleted = self.scheduler.run(|cache| {
            let root = cache.resolve_index("/")?;
            let children = cache.dir_entries_at_index(root)?;
            let mut deleted = Vec::with_capacity(children.len());
            for child in children {
                let idx = cache.resolve_index(&child.file_path)?;
                cache.delete_index(idx)?;
                deleted.push(child.file_path);
            }
            Ok(deleted)
        })?;
        for path in deleted {
            self.observers.dispatch_deleted(&path);
        }
        Ok(())
    }
}

fn nested_or_equal(source: &str, target: &str) -> bool {
    if target == source {
        return true;
    }
    let prefix = if source.ends_with('/') { source.to_string() } else { format!("{source}/") };
    target.starts_with(&prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vfs_backend::InMemoryBackend;

    fn fresh_vfs() -> Vfs {
        Vfs::mounted_with_defaults(Arc::new(InMemoryBackend::new()))
    }

    #[test]
    fn write_read_round_trips_without_commit() {
        let vfs = fresh_vfs();
        vfs.write_file("/a.txt", b"hello").unwrap();
        assert_eq!(vfs.read_file("/a.txt").unwrap(), b"hello");
    }

    #[test]
    fn mkdir_recursive_creates_every_missing_ancestor() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/a/b/c", true).unwrap();
        assert!(vfs.info("/a").unwrap().file_path == "/a");
        assert!(vfs.info("/a/b").unwrap().file_path == "/a/b");
        assert!(vfs.info("/a/b/c").unwrap().file_path == "/a/b/c");
    }

    #[test]
    fn mkdir_recursive_is_idempotent_on_existing_directory() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/a", false).unwrap();
        vfs.mk_dir("/a/b", true).unwrap();
    }

    #[test]
    fn mkdir_non_recursive_requires_existing_parent() {
        let vfs = fresh_vfs();
        let err = vfs.mk_dir("/missing/child", false).unwrap_err();
        assert_eq!(err.kind.code(), "ENOENT");
    }

    #[test]
    fn rm_non_recursive_directory_with_children_fails_not_empty() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/d", false).unwrap();
        vfs.write_file("/d/a", b"x").unwrap();
        let err = vfs.rm("/d", false, true).unwrap_err();
        assert_eq!(err.kind.code(), "ENOTEMPTY");
    }

    #[test]
    fn rm_recursive_directory_succeeds_and_commits_single_delete() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/d", false).unwrap();
        vfs.write_file("/d/a", b"x").unwrap();
        vfs.rm("/d", true, true).unwrap();
        vfs.commit().unwrap();
        assert!(vfs.linfo("/d").unwrap().is_none());
    }

    #[test]
    fn rm_directory_without_folder_flag_fails_is_directory() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/d", false).unwrap();
        let err = vfs.rm("/d", false, false).unwrap_err();
        assert_eq!(err.kind.code(), "EISDIR");
    }

    #[test]
    fn copy_rejects_nested_target() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/a", false).unwrap();
        let err = vfs.copy("/a", "/a/b").unwrap_err();
        assert_eq!(err.kind.code(), "EEXIST");
    }

    #[test]
    fn copy_mirrors_nested_structure_and_preserves_symlinks() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/src", false).unwrap();
        vfs.write_file("/src/a", b"hi").unwrap();
        vfs.mk_dir("/src/sub", false).unwrap();
        vfs.write_file("/src/sub/b", b"bye").unwrap();
        vfs.mk_lnk("/src/link", "a").unwrap();

        vfs.copy("/src", "/dst").unwrap();

        assert_eq!(vfs.read_file("/dst/a").unwrap(), b"hi");
        assert_eq!(vfs.read_file("/dst/sub/b").unwrap(), b"bye");
        assert_eq!(vfs.read_link("/dst/link").unwrap(), "a");
    }

    #[test]
    fn move_copies_then_removes_source() {
        let vfs = fresh_vfs();
        vfs.write_file("/a", b"x").unwrap();
        vfs.mv("/a", "/b").unwrap();
        assert!(vfs.linfo("/a").unwrap().is_none());
        assert_eq!(vfs.read_file("/b").unwrap(), b"x");
    }

    #[test]
    fn du_sums_files_and_skips_symlinks() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/d", false).unwrap();
        vfs.write_file("/d/a", vec![0u8; 3]).unwrap();
        vfs.mk_lnk("/d/link", "a").unwrap();
        assert_eq!(vfs.du("/d").unwrap(), 3);
    }

    #[test]
    fn for_each_visits_breadth_first_and_callback_can_mutate_cache() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/d", false).unwrap();
        vfs.write_file("/d/a", b"1").unwrap();
        vfs.write_file("/d/b", b"2").unwrap();

        let mut seen = Vec::new();
        vfs.for_each("/d", |entry| {
            seen.push(entry.file_path.clone());
            if entry.filename == "a" {
                // Calling back into the facade here must not deadlock.
                vfs.write_file("/d/c", b"3").unwrap();
            }
            Ok(true)
        })
        .unwrap();

        assert!(seen.contains(&"/d".to_string()));
        assert!(vfs.linfo("/d/c").unwrap().is_some());
    }

    #[test]
    fn wipe_removes_everything_under_root() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/a", false).unwrap();
        vfs.write_file("/b", b"x").unwrap();
        vfs.wipe().unwrap();
        assert!(vfs.linfo("/a").unwrap().is_none());
        assert!(vfs.linfo("/b").unwrap().is_none());
    }

    #[test]
    fn observer_sees_create_then_contents_changed_then_delete() {
        struct Recorder {
            creates: AtomicUsize,
            changes: AtomicUsize,
            deletes: AtomicUsize,
        }
        impl Observer for Recorder {
            fn on_file_created(&self, _path: &str, _file_type: FileType) {
                self.creates.fetch_add(1, Ordering::SeqCst);
            }
            fn on_file_contents_changed(&self, _path: &str, _file_type: FileType) {
                self.changes.fetch_add(1, Ordering::SeqCst);
            }
            fn on_file_deleted(&self, _path: &str) {
                self.deletes.fetch_add(1, Ordering::SeqCst);
            }
        }

        let vfs = fresh_vfs();
        let recorder = Arc::new(Recorder {
            creates: AtomicUsize::new(0),
            changes: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        });
        vfs.register_observer(recorder.clone());

        vfs.write_file("/a", b"1").unwrap();
        vfs.write_file("/a", b"2").unwrap();
        vfs.rm("/a", false, false).unwrap();

        assert_eq!(recorder.creates.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.changes.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.deletes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cwd_resolves_relative_paths() {
        let vfs = fresh_vfs();
        vfs.mk_dir("/a", false).unwrap();
        vfs.set_cwd("/a");
        vfs.write_file("b", b"x").unwrap();
        assert_eq!(vfs.read_file("/a/b").unwrap(), b"x");
    }
}
