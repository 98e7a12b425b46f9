//! Pure `/`-separated path algebra for the virtual file system.
//!
//! Every function here is a pure string transform — no I/O, no `std::path`
//! dependency on host path semantics (the VFS namespace always uses `/`
//! regardless of host OS). The normalisation rule below is the same
//! pop-on-`..` idiom used by `cargo_util::paths::normalize_path`, adapted
//! from `std::path::Component` walking to plain `/`-delimited strings since
//! the VFS namespace is not the host filesystem's.

/// True iff `p` starts with `/`.
pub fn is_absolute(p: &str) -> bool {
    p.starts_with('/')
}

/// Raw, non-normalising `/`-delimited components of `p` (no `.`/`..` folding).
fn raw_components(p: &str) -> Vec<&str> {
    p.split('/').filter(|c| !c.is_empty()).collect()
}

/// Splits `p` into a leading marker (`"/"` if absolute, `"."` otherwise)
/// followed by its raw (non-normalising) components.
///
/// Empty input splits to `["."]`.
pub fn split(p: &str) -> Vec<String> {
    let marker = if is_absolute(p) { "/" } else { "." };
    let mut out = vec![marker.to_string()];
    out.extend(raw_components(p).into_iter().map(str::to_string));
    out
}

/// True iff no component of `p` is `.` or `..`.
pub fn is_normalized(p: &str) -> bool {
    raw_components(p).iter().all(|c| *c != "." && *c != "..")
}

/// Normalises `p`: folds away `.` components and pops `..` against the
/// preceding real component, per spec §4.1.
///
/// An empty path normalises to `"."`. A trailing `/` on the input is
/// preserved on the output unless normalisation already ends in `/`.
pub fn normalize(p: &str) -> String {
    let absolute = is_absolute(p);
    let had_trailing_slash = !p.is_empty() && p.ends_with('/');

    let mut out: Vec<&str> = Vec::new();
    for comp in raw_components(p) {
        match comp {
            "." => {}
            ".." => {
                match out.last() {
                    Some(&last) if last != ".." => {
                        out.pop();
                    }
                    Some(_) => out.push(".."),
                    None => {
                        if !absolute {
                            out.push("..");
                        }
                        // absolute with nothing to pop: stay at root
                    }
                }
            }
            other => out.push(other),
        }
    }

    let body = out.join("/");
    let mut result = if absolute {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    };

    if had_trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}

/// Joins path fragments, filtering empty ones, collapsing repeated `/`, and
/// normalising the result. A join of nothing (or only empty strings) is
/// `"."`.
pub fn join(parts: &[&str]) -> String {
    let filtered: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    if filtered.is_empty() {
        return ".".to_string();
    }
    normalize(&filtered.join("/"))
}

/// Resolves `parts` by scanning right-to-left for the last absolute
/// fragment and discarding everything before it, then joining the
/// remainder. With zero arguments, returns `"/"`. The result's trailing `/`
/// is trimmed unless the result is exactly `"/"`.
///
/// This is the free-function form; it does not consult a working directory.
/// See [`resolve_from`] for the cwd-aware variant.
pub fn resolve(parts: &[&str]) -> String {
    if parts.is_empty() {
        return "/".to_string();
    }
    let mut start = 0;
    for (i, p) in parts.iter().enumerate() {
        if is_absolute(p) {
            start = i;
        }
    }
    let mut result = join(&parts[start..]);
    if result.ends_with('/') && result != "/" {
        result.pop();
    }
    result
}

/// `resolve`, but with `cwd` prepended so a fully relative `parts` still
/// resolves to an absolute path (the "instance-method variant" of §4.1).
pub fn resolve_from(cwd: &str, parts: &[&str]) -> String {
    let mut all = Vec::with_capacity(parts.len() + 1);
    all.push(cwd);
    all.extend_from_slice(parts);
    resolve(&all)
}

/// The relative path from `from` to `to`: both are resolved to absolute
/// first, the longest common prefix is found, `..` is emitted for each
/// remaining component of `from`, and the remainder of `to` is appended.
/// Equal paths yield `""`.
pub fn relative(from: &str, to: &str) -> String {
    let from_abs = resolve(&[from]);
    let to_abs = resolve(&[to]);
    if from_abs == to_abs {
        return String::new();
    }
    let from_parts = raw_components(&from_abs);
    let to_parts = raw_components(&to_abs);
    let common = from_parts.iter().zip(to_parts.iter()).take_while(|(a, b)| a == b).count();

    let mut out: Vec<&str> = Vec::with_capacity((from_parts.len() - common) + (to_parts.len() - common));
    for _ in common..from_parts.len() {
        out.push("..");
    }
    out.extend(&to_parts[common..]);
    out.join("/")
}

/// The final component of `p`, with any trailing `/` stripped.
/// `basename("/")` is `""`.
pub fn basename(p: &str) -> String {
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// The prefix of `p` before its last component, defaulting to `/` for
/// absolute paths with no remaining directory part, or `.` for relative
/// ones. `dirname("/")` is `"/"`; `dirname(".")` is `"."`.
pub fn dirname(p: &str) -> String {
    if p.is_empty() {
        return ".".to_string();
    }
    let absolute = is_absolute(p);
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() {
        return if absolute { "/".to_string() } else { ".".to_string() };
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => {
            if absolute {
                "/".to_string()
            } else {
                ".".to_string()
            }
        }
    }
}

/// The substring of `basename(p)` from its last `.` (a leading dot is
/// ignored, so dotfiles have no extension), or `""` if there is none.
pub fn extname(p: &str) -> String {
    let base = basename(p);
    let mut last_dot = None;
    for (i, c) in base.char_indices() {
        if c == '.' && i > 0 {
            last_dot = Some(i);
        }
    }
    match last_dot {
        Some(i) => base[i..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_basics() {
        assert_eq!(normalize(""), ".");
        assert_eq!(normalize("."), ".");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("a/b/../c/"), "a/c/");
        assert_eq!(normalize("/../a"), "/a");
        assert_eq!(normalize("../a"), "../a");
        assert_eq!(normalize("a/../.."), "..");
    }

    #[test]
    fn normalize_is_idempotent() {
        for p in ["", ".", "/", "/a/b", "a/../b", "../../x", "/a/../../b", "a/b/"] {
            let once = normalize(p);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {p:?}");
        }
    }

    #[test]
    fn normalize_preserves_absoluteness() {
        for p in ["/", "/a/b", "/a/../b", "/../a"] {
            assert!(is_absolute(&normalize(p)), "{p:?} lost its leading /");
        }
    }

    #[test]
    fn join_basics() {
        assert_eq!(join(&[]), ".");
        assert_eq!(join(&["", ""]), ".");
        assert_eq!(join(&["a", "b"]), "a/b");
        assert_eq!(join(&["a", "", "/b"]), "a/b");
        assert_eq!(join(&["/a", "b"]), "/a/b");
        assert_eq!(join(&["a/", "/b/"]), "a/b/");
    }

    #[test]
    fn join_of_normalized_relative_has_no_dots() {
        let a = "/root/dir";
        let b = normalize("sub/../leaf");
        let joined = normalize(&join(&[a, &b]));
        assert!(is_normalized(&joined));
    }

    #[test]
    fn resolve_basics() {
        assert_eq!(resolve(&[]), "/");
        assert_eq!(resolve(&["/a", "b"]), "/a/b");
        assert_eq!(resolve(&["/a", "/b"]), "/b");
        assert_eq!(resolve(&["/a/"]), "/a");
        assert_eq!(resolve(&["/"]), "/");
    }

    #[test]
    fn resolve_from_prepends_cwd() {
        assert_eq!(resolve_from("/home/user", &["sub"]), "/home/user/sub");
        assert_eq!(resolve_from("/home/user", &["/etc"]), "/etc");
    }

    #[test]
    fn relative_basics() {
        assert_eq!(relative("/a/b", "/a/b"), "");
        assert_eq!(relative("/a/b", "/a/b/c"), "c");
        assert_eq!(relative("/a/b/c", "/a/b"), "..");
        assert_eq!(relative("/a/x", "/a/y"), "../y");
        assert_eq!(relative("/a/b/c", "/a/x/y"), "../../x/y");
    }

    #[test]
    fn relative_round_trips_through_join() {
        let cases = [("/a/b", "/a/b/c"), ("/a/b/c", "/a/b"), ("/a/x", "/a/y"), ("/", "/a/b/c"), ("/a/b/c", "/")];
        for (from, to) in cases {
            let rel = relative(from, to);
            let rejoined = normalize(&join(&[from, &rel]));
            assert_eq!(rejoined, to, "relative({from:?}, {to:?}) = {rel:?} did not round-trip");
        }
    }

    #[test]
    fn basename_dirname_extname() {
        assert_eq!(basename("/"), "");
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(basename("a"), "a");

        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("."), ".");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/a/b"), "/a");
        assert_eq!(dirname("a/b"), "a");
        assert_eq!(dirname("a"), ".");

        assert_eq!(extname("file.txt"), ".txt");
        assert_eq!(extname("file.tar.gz"), ".gz");
        assert_eq!(extname(".bashrc"), "");
        assert_eq!(extname("file"), "");
    }

    #[test]
    fn basename_ends_with_extname() {
        for p in ["file.txt", "a/b/c.tar.gz", ".bashrc", "noext"] {
            let base = basename(p);
            let ext = extname(p);
            assert!(base.ends_with(&ext), "{base:?} does not end with {ext:?}");
        }
    }

    #[test]
    fn is_normalized_basics() {
        assert!(is_normalized("/a/b"));
        assert!(is_normalized("."));
        assert!(!is_normalized("/a/./b"));
        assert!(!is_normalized("/a/../b"));
    }
}
