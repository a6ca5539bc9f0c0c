//! `TrackingStore` (component F, spec.md §4.F): records which repository
//! an installed/cached file came from, in a small side-car file next to
//! it, so a later session can tell "available from this origin" apart
//! from "present on disk but from somewhere else".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use depot_util::errors::DepotError;
use depot_util::fs::write_atomic_checked;

const TRACKING_FILE_NAME: &str = "_remote.repositories";

/// One directory's tracking file: `filename=repository_key` lines,
/// sorted for stable diffs (spec.md §4.F "side-car tracking files").
#[derive(Debug, Clone, Default)]
pub struct TrackingFile {
    entries: BTreeMap<String, String>,
}

impl TrackingFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((filename, repo_key)) = line.split_once('=') {
                entries.insert(filename.to_string(), repo_key.to_string());
            }
        }
        Self { entries }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("# NOTE: This is an internal file used by the local repository\n# manager, which tracks the origin repository of cached artifacts.\n");
        for (filename, repo_key) in &self.entries {
            out.push_str(filename);
            out.push('=');
            out.push_str(repo_key);
            out.push('\n');
        }
        out
    }

    pub fn set(&mut self, filename: impl Into<String>, repository_key: impl Into<String>) {
        self.entries.insert(filename.into(), repository_key.into());
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(|s| s.as_str())
    }

    /// True if `filename` is recorded as having come from
    /// `repository_key` (spec.md §4.F "is this available from origin
    /// X").
    pub fn is_available_from(&self, filename: &str, repository_key: &str) -> bool {
        self.get(filename) == Some(repository_key)
    }
}

/// Reads and writes `TrackingFile`s at a directory granularity, matching
/// the convention that one tracking file covers every artifact/metadata
/// sibling in that directory.
pub struct TrackingStore;

impl TrackingStore {
    fn path_for(directory: &Path) -> PathBuf {
        directory.join(TRACKING_FILE_NAME)
    }

    pub fn load(directory: &Path) -> miette::Result<TrackingFile> {
        let path = Self::path_for(directory);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(TrackingFile::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TrackingFile::new()),
            Err(e) => Err(DepotError::Io(e).into()),
        }
    }

    pub fn record(directory: &Path, filename: &str, repository_key: &str) -> miette::Result<()> {
        let mut tracking = Self::load(directory)?;
        tracking.set(filename, repository_key);
        let path = Self::path_for(directory);
        write_atomic_checked(&path, tracking.render().as_bytes())
    }

    pub fn is_available_from(directory: &Path, filename: &str, repository_key: &str) -> miette::Result<bool> {
        let tracking = Self::load(directory)?;
        Ok(tracking.is_available_from(filename, repository_key))
    }
}

const UPDATE_STATUS_FILE_NAME: &str = "_remote.repositories.updated";

/// Side-car file recording, per `(filename, repository_key)`, the epoch
/// millisecond timestamp of the last update check and (if it failed) the
/// error message — the durable half of the update-check state machine
/// (spec.md §4.G), kept separate from [`TrackingFile`] since it changes
/// on every check, not just on a successful download.
pub struct UpdateStatusStore;

impl UpdateStatusStore {
    fn path_for(directory: &Path) -> PathBuf {
        directory.join(UPDATE_STATUS_FILE_NAME)
    }

    fn key(filename: &str, repository_key: &str) -> String {
        format!("{filename}::{repository_key}")
    }

    fn load_map(directory: &Path) -> miette::Result<BTreeMap<String, String>> {
        let path = Self::path_for(directory);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content
                .lines()
                .filter_map(|l| l.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(DepotError::Io(e).into()),
        }
    }

    pub fn last_updated(directory: &Path, filename: &str, repository_key: &str) -> miette::Result<Option<u64>> {
        let map = Self::load_map(directory)?;
        Ok(map
            .get(&Self::key(filename, repository_key))
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.parse().ok()))
    }

    /// The error recorded alongside the last check, if that check failed
    /// (spec.md §4.K step 4: replaying a cached not-found/transfer error
    /// instead of re-asking the network while a recheck isn't required).
    pub fn last_error(directory: &Path, filename: &str, repository_key: &str) -> miette::Result<Option<String>> {
        let map = Self::load_map(directory)?;
        Ok(map
            .get(&Self::key(filename, repository_key))
            .and_then(|v| v.split_once(','))
            .map(|(_, error)| error.to_string()))
    }

    pub fn record(
        directory: &Path,
        filename: &str,
        repository_key: &str,
        now_ms: u64,
        error: Option<&str>,
    ) -> miette::Result<()> {
        let mut map = Self::load_map(directory)?;
        let value = match error {
            Some(e) => format!("{now_ms},{e}"),
            None => now_ms.to_string(),
        };
        map.insert(Self::key(filename, repository_key), value);

        let mut out = String::new();
        for (k, v) in &map {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }
        write_atomic_checked(&Self::path_for(directory), out.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_roundtrip() {
        let mut file = TrackingFile::new();
        file.set("lib-1.0.jar", "central-abc123");
        let rendered = file.render();
        let reparsed = TrackingFile::parse(&rendered);
        assert_eq!(reparsed.get("lib-1.0.jar"), Some("central-abc123"));
    }

    #[test]
    fn parse_ignores_comments_and_blank_lines() {
        let content = "# a comment\n\nlib-1.0.jar=central-abc\n";
        let file = TrackingFile::parse(content);
        assert_eq!(file.get("lib-1.0.jar"), Some("central-abc"));
    }

    #[test]
    fn store_records_and_reloads() {
        let tmp = tempfile::tempdir().unwrap();
        TrackingStore::record(tmp.path(), "lib-1.0.jar", "central-abc").unwrap();
        let loaded = TrackingStore::load(tmp.path()).unwrap();
        assert!(loaded.is_available_from("lib-1.0.jar", "central-abc"));
        assert!(!loaded.is_available_from("lib-1.0.jar", "other-repo"));
    }

    #[test]
    fn store_load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = TrackingStore::load(tmp.path()).unwrap();
        assert!(loaded.get("anything").is_none());
    }

    #[test]
    fn store_record_is_idempotent_across_multiple_files_in_same_dir() {
        let tmp = tempfile::tempdir().unwrap();
        TrackingStore::record(tmp.path(), "lib-1.0.jar", "central-abc").unwrap();
        TrackingStore::record(tmp.path(), "lib-1.0.pom", "central-abc").unwrap();
        let loaded = TrackingStore::load(tmp.path()).unwrap();
        assert!(loaded.is_available_from("lib-1.0.jar", "central-abc"));
        assert!(loaded.is_available_from("lib-1.0.pom", "central-abc"));
    }

    #[test]
    fn update_status_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        UpdateStatusStore::record(tmp.path(), "maven-metadata.xml", "central", 12345, None).unwrap();
        let last = UpdateStatusStore::last_updated(tmp.path(), "maven-metadata.xml", "central").unwrap();
        assert_eq!(last, Some(12345));
    }

    #[test]
    fn update_status_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let last = UpdateStatusStore::last_updated(tmp.path(), "maven-metadata.xml", "central").unwrap();
        assert_eq!(last, None);
    }

    #[test]
    fn update_status_records_error_without_breaking_timestamp_read() {
        let tmp = tempfile::tempdir().unwrap();
        UpdateStatusStore::record(tmp.path(), "maven-metadata.xml", "central", 999, Some("not found")).unwrap();
        let last = UpdateStatusStore::last_updated(tmp.path(), "maven-metadata.xml", "central").unwrap();
        assert_eq!(last, Some(999));
    }

    #[test]
    fn update_status_last_error_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        UpdateStatusStore::record(tmp.path(), "lib-1.0.jar", "central", 999, Some("not found")).unwrap();
        let error = UpdateStatusStore::last_error(tmp.path(), "lib-1.0.jar", "central").unwrap();
        assert_eq!(error.as_deref(), Some("not found"));
    }

    #[test]
    fn update_status_last_error_is_none_on_success() {
        let tmp = tempfile::tempdir().unwrap();
        UpdateStatusStore::record(tmp.path(), "lib-1.0.jar", "central", 999, None).unwrap();
        let error = UpdateStatusStore::last_error(tmp.path(), "lib-1.0.jar", "central").unwrap();
        assert_eq!(error, None);
    }
}
