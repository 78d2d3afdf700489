//! Path utilities for naming derived assets and checking arrivals.

use crate::error::{Error, Result};
use crate::params::Container;
use std::path::{Component, Path, PathBuf};

/// Check if a path's extension is one of `extensions` (case-insensitive,
/// without the leading dot).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use framekeeper_common::paths::has_extension;
///
/// let accepted = vec!["mkv".to_string()];
/// assert!(has_extension(Path::new("/arrivals/N_1234.MKV"), &accepted));
/// assert!(!has_extension(Path::new("/arrivals/N_1234.mov"), &accepted));
/// ```
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// File name of the derived asset for `source`: the source stem, the
/// configured suffix, and the container's extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use framekeeper_common::{paths::derived_file_name, Container};
///
/// let name = derived_file_name(Path::new("/arrivals/N_1234_01of02.mkv"), "_v210", Container::Mov).unwrap();
/// assert_eq!(name, "N_1234_01of02_v210.mov");
/// ```
pub fn derived_file_name(source: &Path, suffix: &str, container: Container) -> Result<String> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::invalid_input(format!("no usable file stem in {:?}", source)))?;
    Ok(format!("{}{}.{}", stem, suffix, container.extension()))
}

/// Full path of the derived asset inside `working_dir`.
pub fn derived_path(
    source: &Path,
    working_dir: &Path,
    suffix: &str,
    container: Container,
) -> Result<PathBuf> {
    Ok(working_dir.join(derived_file_name(source, suffix, container)?))
}

/// Whether `path` lies inside `dir` (lexically, after dropping `.` components).
pub fn is_within(path: &Path, dir: &Path) -> bool {
    let clean = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    };
    clean(path).starts_with(clean(dir))
}

/// Best-effort canonical form of `path`.
///
/// Existing prefixes are canonicalized (resolving symlinks); `..` and `.` in
/// the part that does not exist yet are resolved lexically. Two spellings of
/// the same location resolve to the same path.
pub fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => {
                resolved.push(other);
                if let Ok(canonical) = std::fs::canonicalize(&resolved) {
                    resolved = canonical;
                }
            }
        }
    }
    resolved
}

/// Whether `a` and `b` resolve to the same location or one contains the other.
pub fn overlaps(a: &Path, b: &Path) -> bool {
    let (a, b) = (resolve(a), resolve(b));
    a.starts_with(&b) || b.starts_with(&a)
}
