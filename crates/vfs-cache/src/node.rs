use vfs_backend::{FileMeta, FileType};

/// What the node looked like the last time the cache learned about it from
/// the backend. Unlike [`CachedNodeType`] this has no pending-state
/// variants — it is the ground truth the commit engine diffs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OldType {
    Directory,
    File,
    Symlink,
    Nonexistent,
}

impl From<FileType> for OldType {
    fn from(value: FileType) -> Self {
        match value {
            FileType::Directory => OldType::Directory,
            FileType::File => OldType::File,
            FileType::Symlink => OldType::Symlink,
        }
    }
}

/// The seven-state node model. The payload a variant carries is part of the
/// type, so "exactly one of data/children/destination is populated" is
/// enforced by the compiler rather than by a runtime invariant.
///
/// `children: None` on a clean directory means "not yet loaded from the
/// backend"; `Some(vec![])` means "loaded, and empty". A directory created
/// in this session (`DirectoryNew`) always starts loaded, since nothing
/// exists yet to lazily fetch.
#[derive(Debug, Clone)]
pub enum CachedNodeType {
    Directory(Option<Vec<usize>>),
    DirectoryNew(Vec<usize>),
    File(Option<Vec<u8>>),
    FileDirty(Vec<u8>),
    Symlink(String),
    SymlinkDirty(String),
    Nonexistent,
}

impl CachedNodeType {
    pub fn exists(&self) -> bool {
        !matches!(self, CachedNodeType::Nonexistent)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, CachedNodeType::Directory(_) | CachedNodeType::DirectoryNew(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, CachedNodeType::File(_) | CachedNodeType::FileDirty(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, CachedNodeType::Symlink(_) | CachedNodeType::SymlinkDirty(_))
    }

    pub fn children(&self) -> Option<&[usize]> {
        match self {
            CachedNodeType::Directory(Some(children)) => Some(children),
            CachedNodeType::DirectoryNew(children) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<usize>> {
        match self {
            CachedNodeType::Directory(Some(children)) => Some(children),
            CachedNodeType::DirectoryNew(children) => Some(children),
            _ => None,
        }
    }

    pub fn symlink_destination(&self) -> Option<&str> {
        match self {
            CachedNodeType::Symlink(dest) | CachedNodeType::SymlinkDirty(dest) => Some(dest),
            _ => None,
        }
    }

    pub fn as_file_type(&self) -> Option<FileType> {
        match self {
            CachedNodeType::Directory(_) | CachedNodeType::DirectoryNew(_) => Some(FileType::Directory),
            CachedNodeType::File(_) | CachedNodeType::FileDirty(_) => Some(FileType::File),
            CachedNodeType::Symlink(_) | CachedNodeType::SymlinkDirty(_) => Some(FileType::Symlink),
            CachedNodeType::Nonexistent => None,
        }
    }
}

/// A single entry in the shadow tree. Stored in a flat arena owned by the
/// cache; `parent` is an index into that arena rather than an owning or weak
/// pointer, so the whole tree can be reclaimed by dropping the `Vec` (see
/// crate docs on `feedTheGC`/dismantling after commit).
#[derive(Debug, Clone)]
pub struct CachedNode {
    pub filename: String,
    pub file_path: String,
    pub parent: Option<usize>,
    pub old_type: OldType,
    pub new_type: CachedNodeType,
    pub meta: FileMeta,
    pub meta_dirty: bool,
}

impl CachedNode {
    pub fn root(meta: FileMeta, old_type: OldType, new_type: CachedNodeType) -> Self {
        CachedNode {
            filename: String::new(),
            file_path: "/".to_string(),
            parent: None,
            old_type,
            new_type,
            meta,
            meta_dirty: false,
        }
    }

    pub fn placeholder(parent: usize, filename: String, file_path: String) -> Self {
        CachedNode {
            filename,
            file_path,
            parent: Some(parent),
            old_type: OldType::Nonexistent,
            new_type: CachedNodeType::Nonexistent,
            meta: FileMeta::new(chrono::DateTime::from_timestamp(0, 0).expect("epoch is representable")),
            meta_dirty: false,
        }
    }

    pub fn from_entry(parent: usize, entry: &vfs_backend::FileEntry) -> Self {
        let new_type = match entry.file_type {
            FileType::Directory => CachedNodeType::Directory(None),
            FileType::File => CachedNodeType::File(None),
            FileType::Symlink => {
                CachedNodeType::Symlink(entry.destination.clone().unwrap_or_default())
            }
        };
        CachedNode {
            filename: entry.filename.clone(),
            file_path: entry.file_path.clone(),
            parent: Some(parent),
            old_type: OldType::from(entry.file_type),
            new_type,
            meta: entry.meta,
            meta_dirty: false,
        }
    }

    pub fn touch(&mut self) {
        self.meta = FileMeta::now();
        self.meta_dirty = true;
    }
}
