use std::sync::Arc;

use anyhow::{bail, Context, Result};
use vfs_backend::{FileType, InMemoryBackend};
use vfs_core::cli::parse_duration_ms;
use vfs_core::{Command, VfsConfig};
use vfs_facade::Vfs;

fn main() -> Result<()> {
    env_logger::init();

    let args = vfs_core::parse_args();

    // ========================================================================
    // Determine Color Output Settings
    // ========================================================================

    let use_colors = atty::is(atty::Stream::Stdout);

    // ========================================================================
    // Mount a Fresh VFS
    // ========================================================================

    let config = VfsConfig::new(
        parse_duration_ms(&args.always_commit_cache_after)
            .map(|ms| ms.map(std::time::Duration::from_millis))
            .map_err(anyhow::Error::msg)?,
        parse_duration_ms(&args.cache_commit_delay)
            .map(|ms| ms.map(std::time::Duration::from_millis))
            .map_err(anyhow::Error::msg)?,
    );
    let backend = Arc::new(InMemoryBackend::new());
    let vfs = Vfs::new(backend, config);

    // ========================================================================
    // Dispatch the Subcommand
    // ========================================================================

    run_command(&vfs, args.command, use_colors)?;

    // Every command that mutated the cache should be visible to a second
    // invocation were there persistence; since there is none (crate docs),
    // flush mostly so Drop doesn't need to race the idle timer on exit.
    vfs.commit().context("failed to commit pending changes before exit")?;

    Ok(())
}

fn run_command(vfs: &Vfs, command: Command, use_colors: bool) -> Result<()> {
    match command {
        Command::Mkdir { path, recursive } => {
            vfs.mk_dir(&path, recursive).with_context(|| format!("mkdir {path}"))?;
        }
        Command::Ln { path, destination } => {
            vfs.mk_lnk(&path, &destination).with_context(|| format!("ln {path} -> {destination}"))?;
        }
        Command::Write { path, contents } => {
            vfs.write_file(&path, contents.as_bytes()).with_context(|| format!("write {path}"))?;
        }
        Command::Cat { path } => {
            let bytes = vfs.read_file(&path).with_context(|| format!("cat {path}"))?;
            print!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Ls { path } => {
            let mut names = vfs.read_dir(&path, false).with_context(|| format!("ls {path}"))?;
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
        Command::Rm { path, recursive, folder } => {
            vfs.rm(&path, recursive, folder).with_context(|| format!("rm {path}"))?;
        }
        Command::Linfo { path } => {
            match vfs.linfo(&path).with_context(|| format!("linfo {path}"))? {
                Some(entry) => println!("{}\t{:?}\t{}", entry.file_path, entry.file_type, entry.meta.mtime),
                None => bail!("no such file or directory: {path}"),
            }
        }
        Command::Info { path } => {
            let entry = vfs.info(&path).with_context(|| format!("info {path}"))?;
            println!("{}\t{:?}\t{}", entry.file_path, entry.file_type, entry.meta.mtime);
        }
        Command::Du { path } => {
            let total = vfs.du(&path).with_context(|| format!("du {path}"))?;
            println!("{total}");
        }
        Command::Copy { source, target } => {
            vfs.copy(&source, &target).with_context(|| format!("copy {source} -> {target}"))?;
        }
        Command::Move { source, target } => {
            vfs.mv(&source, &target).with_context(|| format!("move {source} -> {target}"))?;
        }
        Command::Tree { path } => {
            print_tree(vfs, &path, use_colors)?;
        }
        Command::Wipe => {
            vfs.wipe().context("wipe")?;
        }
    }
    Ok(())
}

/// Recursively prints `path` and everything under it, indenting one level
/// per directory nested, matching `find`-style depth-first output.
fn print_tree(vfs: &Vfs, path: &str, use_colors: bool) -> Result<()> {
    print_tree_at(vfs, path, 0, use_colors)
}

fn print_tree_at(vfs: &Vfs, path: &str, depth: usize, use_colors: bool) -> Result<()> {
    let Some(entry) = vfs.linfo(path)? else {
        bail!("no such file or directory: {path}");
    };
    let indent = "  ".repeat(depth);
    let name = vfs_path::basename(path);
    let label = if depth == 0 { path.to_string() } else { name };
    println!("{indent}{}", colorize(&label, entry.file_type, use_colors));

    if entry.file_type == FileType::Directory {
        let mut children = vfs.read_dir(path, true)?;
        children.sort();
        for child in children {
            print_tree_at(vfs, &child, depth + 1, use_colors)?;
        }
    }
    Ok(())
}

fn colorize(label: &str, file_type: FileType, use_colors: bool) -> String {
    if !use_colors {
        return label.to_string();
    }
    match file_type {
        FileType::Directory => format!("\x1b[1;34m{label}\x1b[0m"),
        FileType::Symlink => format!("\x1b[1;36m{label}\x1b[0m"),
        FileType::File => label.to_string(),
    }
}
