use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The closed set of recoverable VFS error kinds (spec §4.2, §7).
///
/// Every kind is bound to an offending path when raised; see [`VfsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No entry exists at the path.
    NoEntry,
    /// An entry already exists where one must not.
    AlreadyExists,
    /// A file-only operation was attempted on a directory.
    IsDirectory,
    /// A directory-only operation was attempted on a file.
    IsFile,
    /// A path component that must be a directory is not one.
    NotDirectory,
    /// The target is not a plain file.
    NotFile,
    /// The target is not a symbolic link.
    NotSymlink,
    /// A non-recursive removal found a non-empty directory.
    NotEmpty,
    /// Symlink resolution exceeded the hop limit (see `vfs-cache`).
    SymlinkLoop,
}

impl ErrorKind {
    /// The standard human message for this kind, independent of path.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::NoEntry => "no such file or directory",
            ErrorKind::AlreadyExists => "file exists",
            ErrorKind::IsDirectory => "is a directory",
            ErrorKind::IsFile => "is a file",
            ErrorKind::NotDirectory => "not a directory",
            ErrorKind::NotFile => "not a file",
            ErrorKind::NotSymlink => "not a symbolic link",
            ErrorKind::NotEmpty => "directory not empty",
            ErrorKind::SymlinkLoop => "too many levels of symbolic links",
        }
    }

    /// The POSIX-flavoured short code, for callers that want to match on it.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NoEntry => "ENOENT",
            ErrorKind::AlreadyExists => "EEXIST",
            ErrorKind::IsDirectory => "EISDIR",
            ErrorKind::IsFile => "EISFILE",
            ErrorKind::NotDirectory => "ENOTDIR",
            ErrorKind::NotFile => "ENOTFILE",
            ErrorKind::NotSymlink => "ENOTLNK",
            ErrorKind::NotEmpty => "ENOTEMPTY",
            ErrorKind::SymlinkLoop => "ELOOP",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// A VFS error: a closed-set kind tied to the path that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {}", path.display())]
pub struct VfsError {
    pub kind: ErrorKind,
    pub path: PathBuf,
}

impl VfsError {
    pub fn new(kind: ErrorKind, path: impl Into<PathBuf>) -> Self {
        VfsError { kind, path: path.into() }
    }

    pub fn no_entry(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NoEntry, path)
    }

    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::AlreadyExists, path)
    }

    pub fn is_directory(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::IsDirectory, path)
    }

    pub fn is_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::IsFile, path)
    }

    pub fn not_directory(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NotDirectory, path)
    }

    pub fn not_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NotFile, path)
    }

    pub fn not_symlink(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NotSymlink, path)
    }

    pub fn not_empty(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NotEmpty, path)
    }

    pub fn symlink_loop(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::SymlinkLoop, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_path() {
        let err = VfsError::no_entry("/a/b");
        let rendered = err.to_string();
        assert!(rendered.contains("ENOENT"));
        assert!(rendered.contains("/a/b"));
    }

    #[test]
    fn kinds_have_distinct_codes() {
        let kinds = [
            ErrorKind::NoEntry,
            ErrorKind::AlreadyExists,
            ErrorKind::IsDirectory,
            ErrorKind::IsFile,
            ErrorKind::NotDirectory,
            ErrorKind::NotFile,
            ErrorKind::NotSymlink,
            ErrorKind::NotEmpty,
            ErrorKind::SymlinkLoop,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
