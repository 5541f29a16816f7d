//! Filesystem primitives used by every other orchestration crate.
//!
//! Every write goes through [`write_file`], which honors the atomic-replace
//! invariant: the new content lands in a temp file, the previous file (if
//! any) is copied to `<name>.bk`, then the temp file replaces the original.
//! A crash mid-write leaves either the new or the prior file intact.

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

fn io_err(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Error {
    let path = path.as_ref().display().to_string();
    move |source| Error::Io { path, source }
}

/// Read an entire file to a `String`.
pub fn read_file(path: impl AsRef<Path>) -> Result<String> {
    std::fs::read_to_string(&path).map_err(io_err(&path))
}

/// Write `text` to `path`, honoring the atomic-replace invariant.
///
/// When `append` is true the existing content (if any) is preserved and
/// `text` is appended; no backup is taken in that mode since nothing is
/// being replaced.
pub fn write_file(text: &str, path: impl AsRef<Path>, append: bool) -> Result<()> {
    let path = path.as_ref();
    if append {
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err(path))?;
        file.write_all(text.as_bytes()).map_err(io_err(path))?;
        return Ok(());
    }

    let tmp_path = path.with_extension("tmp-write");
    std::fs::write(&tmp_path, text).map_err(io_err(&tmp_path))?;

    if path.exists() {
        let bk_path = backup_path(path);
        std::fs::copy(path, &bk_path).map_err(io_err(&bk_path))?;
    }

    std::fs::rename(&tmp_path, path).map_err(io_err(path))?;
    debug!(path = %path.display(), "wrote file via atomic replace");
    Ok(())
}

/// The `.bk` sibling path used by the atomic-replace invariant.
pub fn backup_path(path: impl AsRef<Path>) -> std::path::PathBuf {
    let path = path.as_ref();
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".bk");
    path.with_file_name(name)
}

/// Remove a file, succeeding if it is already absent.
pub fn remove_file(path: impl AsRef<Path>) -> Result<()> {
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(&path)(e)),
    }
}

/// Copy `from` to `to`, creating parent directories as needed.
pub fn copy_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = to.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::copy(&from, &to).map_err(io_err(&to))?;
    Ok(())
}

/// Create a directory and all missing parent directories.
pub fn create_directory(path: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&path).map_err(io_err(&path))
}

/// Remove a directory. If `recursive` is false, the directory must be empty.
pub fn remove_directory(path: impl AsRef<Path>, recursive: bool) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    let result = if recursive {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_dir(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path)(e)),
    }
}

/// Whether a regular file exists at `path`.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Whether a directory exists at `path`.
pub fn dir_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

/// Whether `path` names a file that exists and has nonzero length.
pub fn non_empty_file(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(&path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        write_file("hello", &path, false).unwrap();
        assert_eq!(read_file(&path).unwrap(), "hello");
        assert!(non_empty_file(&path));
    }

    #[test]
    fn rewrite_leaves_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        write_file("one", &path, false).unwrap();
        write_file("two", &path, false).unwrap();
        assert_eq!(read_file(&path).unwrap(), "two");
        assert_eq!(read_file(backup_path(&path)).unwrap(), "one");
    }

    #[test]
    fn append_does_not_create_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        write_file("one\n", &path, true).unwrap();
        write_file("two\n", &path, true).unwrap();
        assert_eq!(read_file(&path).unwrap(), "one\ntwo\n");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn remove_directory_recursive() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        create_directory(&nested).unwrap();
        write_file("x", nested.join("f.txt"), false).unwrap();
        remove_directory(dir.path().join("a"), true).unwrap();
        assert!(!dir_exists(dir.path().join("a")));
    }
}
