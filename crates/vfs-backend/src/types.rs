use chrono::{DateTime, Utc};

/// What the backend actually stores a path as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A value record attached to every node. Currently a single field, but kept
/// as its own type since backends hand it across the trait boundary and the
/// cache defensively copies it on read-out (see crate docs on `Backend`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub mtime: DateTime<Utc>,
}

impl FileMeta {
    pub fn new(mtime: DateTime<Utc>) -> Self {
        FileMeta { mtime }
    }

    pub fn now() -> Self {
        FileMeta { mtime: Utc::now() }
    }
}

/// A directory-listing record: everything `readDir`/`linfo` hand back about
/// one entry. `destination` is populated, verbatim and unresolved, only for
/// symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub filename: String,
    pub file_path: String,
    pub file_type: FileType,
    pub destination: Option<String>,
    pub meta: FileMeta,
}

impl FileEntry {
    pub fn file(filename: impl Into<String>, file_path: impl Into<String>, meta: FileMeta) -> Self {
        FileEntry {
            filename: filename.into(),
            file_path: file_path.into(),
            file_type: FileType::File,
            destination: None,
            meta,
        }
    }

    pub fn directory(filename: impl Into<String>, file_path: impl Into<String>, meta: FileMeta) -> Self {
        FileEntry {
            filename: filename.into(),
            file_path: file_path.into(),
            file_type: FileType::Directory,
            destination: None,
            meta,
        }
    }

    pub fn symlink(
        filename: impl Into<String>,
        file_path: impl Into<String>,
        destination: impl Into<String>,
        meta: FileMeta,
    ) -> Self {
        FileEntry {
            filename: filename.into(),
            file_path: file_path.into(),
            file_type: FileType::Symlink,
            destination: Some(destination.into()),
            meta,
        }
    }
}

/// The `stat`-style analogue of [`FileEntry`] returned from symlink-following
/// lookups: its `file_type` is restricted to `File | Directory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicFileType {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicFileEntry {
    pub filename: String,
    pub file_path: String,
    pub file_type: BasicFileType,
    pub meta: FileMeta,
}
