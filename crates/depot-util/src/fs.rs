//! Filesystem helpers shared by the local repository manager and tracking store.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::DepotError;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `data` to `path` atomically: write to a sibling temp file, then
/// rename over the destination. Used by the local repository manager,
/// tracking store, and installer so a crash never leaves a half-written
/// file at the final path (spec.md §4.H step 5, §4.F).
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    ensure_dir(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "depot".to_string()),
        std::process::id()
    ));

    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(data)?;
        f.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)
}

/// Atomically write `data`, wrapping I/O errors as a `DepotError`.
pub fn write_atomic_checked(path: &Path, data: &[u8]) -> miette::Result<()> {
    write_atomic(path, data).map_err(DepotError::Io)?;
    Ok(())
}

/// Canonicalize a path for use as a lock/tracking key, falling back to the
/// original path (possibly non-absolute) if the file does not yet exist.
pub fn canonical_or_self(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_search_finds_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("marker"), b"").unwrap();

        let found = find_ancestor_with(&nested, "marker").unwrap();
        assert_eq!(found, tmp.path());
    }

    #[test]
    fn ancestor_search_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_ancestor_with(tmp.path(), "does-not-exist").is_none());
    }

    #[test]
    fn atomic_write_creates_file_and_no_temp_left() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("file.txt");
        write_atomic(&target, b"hello").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
        let leftover = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains(".tmp-")
            })
            .count();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn atomic_write_overwrites_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("file.txt");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn canonical_or_self_falls_back() {
        let missing = Path::new("/does/not/exist/at/all");
        assert_eq!(canonical_or_self(missing), missing);
    }
}
