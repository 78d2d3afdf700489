//! Confirmed, no-clobber file relocation and deletion.
//!
//! A relocation is only reported as done once the destination has been seen
//! with the origin's size and the origin is gone. The origin is not unlinked
//! until the destination has been confirmed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocationError {
    #[error("file to relocate does not exist: {path:?}")]
    MissingSource { path: PathBuf },

    #[error("destination already exists: {path:?}")]
    Occupied { path: PathBuf },

    #[error("{op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not confirm {path:?}: {reason}")]
    Unconfirmed { path: PathBuf, reason: String },
}

impl RelocationError {
    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Move `path` into `dest_dir`, keeping its file name. Returns the new path.
pub fn relocate(path: &Path, dest_dir: &Path) -> Result<PathBuf, RelocationError> {
    let name = path.file_name().ok_or_else(|| RelocationError::MissingSource {
        path: path.to_path_buf(),
    })?;
    let dest = dest_dir.join(name);
    relocate_to(path, &dest)?;
    Ok(dest)
}

/// Upper bound on numbered alternatives tried before giving up.
const MAX_NUMBERED: usize = 999;

/// `name` for attempt 0, otherwise `<stem>_<n>.<ext>`.
fn numbered(name: &Path, attempt: usize) -> PathBuf {
    if attempt == 0 {
        return name.to_path_buf();
    }
    let stem = name.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match name.extension() {
        Some(ext) => PathBuf::from(format!("{}_{}.{}", stem, attempt, ext.to_string_lossy())),
        None => PathBuf::from(format!("{}_{}", stem, attempt)),
    }
}

/// Move `path` into `dest_dir` under its own name, or the first free
/// numbered alternative if that name is taken. Returns the new path.
pub fn relocate_numbered(path: &Path, dest_dir: &Path) -> Result<PathBuf, RelocationError> {
    let name = path.file_name().ok_or_else(|| RelocationError::MissingSource {
        path: path.to_path_buf(),
    })?;
    for attempt in 0..=MAX_NUMBERED {
        let dest = dest_dir.join(numbered(Path::new(name), attempt));
        match relocate_to(path, &dest) {
            Ok(()) => return Ok(dest),
            Err(RelocationError::Occupied { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(RelocationError::Occupied {
        path: dest_dir.join(name),
    })
}

/// Write `contents` to a new file in `dir` named `name`, or the first free
/// numbered alternative. Existing files are never replaced.
pub fn write_numbered(dir: &Path, name: &Path, contents: &[u8]) -> Result<PathBuf, RelocationError> {
    fs::create_dir_all(dir).map_err(|e| RelocationError::io("create directory", dir, e))?;
    for attempt in 0..=MAX_NUMBERED {
        let dest = dir.join(numbered(name, attempt));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RelocationError::io("create", &dest, e)),
        };
        if let Err(e) = file.write_all(contents).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&dest);
            return Err(RelocationError::io("write", &dest, e));
        }
        return Ok(dest);
    }
    Err(RelocationError::Occupied {
        path: dir.join(name),
    })
}

/// Move `path` to exactly `dest`, never replacing an existing file.
///
/// Within one filesystem the file is hard-linked into place and the origin
/// unlinked; otherwise it is copied, synced and the origin removed.
pub fn relocate_to(path: &Path, dest: &Path) -> Result<(), RelocationError> {
    let expected_len = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            return Err(RelocationError::MissingSource {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RelocationError::MissingSource {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(RelocationError::io("stat", path, e)),
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| RelocationError::io("create directory", parent, e))?;
    }
    if fs::symlink_metadata(dest).is_ok() {
        return Err(RelocationError::Occupied {
            path: dest.to_path_buf(),
        });
    }

    match fs::hard_link(path, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(RelocationError::Occupied {
                path: dest.to_path_buf(),
            })
        }
        Err(e) => {
            tracing::debug!("Hard link {:?} -> {:?} failed ({}), copying", path, dest, e);
            copy_no_clobber(path, dest)?;
        }
    }

    release_origin(path, dest, expected_len)?;
    tracing::debug!("Relocated {:?} -> {:?}", path, dest);
    Ok(())
}

/// Confirm `dest`, then unlink `path`. On any failure before the unlink the
/// origin stays the only copy.
fn release_origin(path: &Path, dest: &Path, expected_len: u64) -> Result<(), RelocationError> {
    if let Err(e) = confirm_landed(dest, expected_len) {
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(path) {
        let _ = fs::remove_file(dest);
        return Err(RelocationError::io("remove origin", path, e));
    }
    if fs::symlink_metadata(path).is_ok() {
        return Err(RelocationError::Unconfirmed {
            path: path.to_path_buf(),
            reason: "origin still present".to_string(),
        });
    }
    Ok(())
}

fn copy_no_clobber(path: &Path, dest: &Path) -> Result<(), RelocationError> {
    let mut target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                RelocationError::Occupied {
                    path: dest.to_path_buf(),
                }
            } else {
                RelocationError::io("create", dest, e)
            }
        })?;

    let copied = File::open(path)
        .and_then(|mut origin| io::copy(&mut origin, &mut target))
        .and_then(|_| target.sync_all());

    if let Err(e) = copied {
        drop(target);
        let _ = fs::remove_file(dest);
        return Err(RelocationError::io("copy", path, e));
    }
    Ok(())
}

fn confirm_landed(dest: &Path, expected_len: u64) -> Result<(), RelocationError> {
    let landed = fs::metadata(dest).map_err(|e| RelocationError::Unconfirmed {
        path: dest.to_path_buf(),
        reason: format!("destination not visible: {}", e),
    })?;
    if landed.len() != expected_len {
        return Err(RelocationError::Unconfirmed {
            path: dest.to_path_buf(),
            reason: format!("size {} differs from original {}", landed.len(), expected_len),
        });
    }
    Ok(())
}

/// Delete `path` and confirm it is gone.
pub fn delete_confirmed(path: &Path) -> Result<(), RelocationError> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RelocationError::MissingSource {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(RelocationError::io("delete", path, e)),
    }
    if fs::symlink_metadata(path).is_ok() {
        return Err(RelocationError::Unconfirmed {
            path: path.to_path_buf(),
            reason: "still present after delete".to_string(),
        });
    }
    Ok(())
}
