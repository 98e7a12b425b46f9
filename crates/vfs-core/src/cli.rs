use clap::{Parser, Subcommand};

// ============================================================================
// Global Options
// ============================================================================

/// vfsctl - an interactive driver for the in-memory write-back VFS
///
/// Mounts a fresh cache over an in-memory backend and runs one command
/// against it, printing the result. Every invocation starts from an empty
/// backend; there is no persistence across runs (see crate docs).
#[derive(Parser, Debug)]
#[command(name = "vfsctl")]
#[command(about = "Drive the in-memory write-back VFS from the command line")]
pub struct Args {
    /// Idle delay (ms) before an automatic commit; use "inf" to disable.
    #[arg(long, default_value = "500")]
    pub cache_commit_delay: String,

    /// Absolute staleness bound (ms) before a forced commit; use "inf" to disable.
    #[arg(long, default_value = "5000")]
    pub always_commit_cache_after: String,

    #[command(subcommand)]
    pub command: Command,
}

// ============================================================================
// Subcommands
// ============================================================================

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a directory (non-recursive unless --recursive is given).
    Mkdir {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Create a symbolic link at `path` pointing at `destination`.
    Ln { path: String, destination: String },
    /// Write `contents` to `path`, creating or overwriting it.
    Write { path: String, contents: String },
    /// Print the contents of a file (symlinks followed).
    Cat { path: String },
    /// List the names of entries under a directory (symlinks followed).
    Ls { path: String },
    /// Remove a file, symlink, or (with --folder) a directory.
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
        #[arg(short, long)]
        folder: bool,
    },
    /// Print lstat-style info for a path (no symlink following).
    Linfo { path: String },
    /// Print stat-style info for a path (symlinks followed).
    Info { path: String },
    /// Print the recursive byte size under a path.
    Du { path: String },
    /// Recursively copy `source` to `target`.
    Copy { source: String, target: String },
    /// Move `source` to `target` (copy then remove).
    Move { source: String, target: String },
    /// Print the whole tree from `path` down.
    Tree { path: String },
    /// Remove every entry under `/`.
    Wipe,
}

pub fn parse_args() -> Args {
    Args::parse()
}

/// Parse a millisecond duration option that also accepts the literal "inf".
pub fn parse_duration_ms(raw: &str) -> Result<Option<u64>, String> {
    if raw.eq_ignore_ascii_case("inf") || raw.eq_ignore_ascii_case("infinite") {
        Ok(None)
    } else {
        raw.parse::<u64>().map(Some).map_err(|e| format!("invalid duration {raw:?}: {e}"))
    }
}
