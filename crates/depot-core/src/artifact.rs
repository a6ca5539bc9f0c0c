//! The `Artifact` value type (spec.md §3 DATA MODEL).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// An immutable addressable unit: four coordinate fields plus a version,
/// optional classifier/extension, free-form properties, and (once
/// resolved) a local file.
///
/// Identity is the four coordinate fields plus `version` — two artifacts
/// with the same coordinates but different `baseVersion` derivations are
/// never constructed, since `baseVersion` is always *derived from*
/// `version`, never supplied independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    pub extension: String,
    pub version: String,
    pub properties: BTreeMap<String, String>,
    pub file: Option<PathBuf>,
}

impl Artifact {
    /// Build an artifact with extension `jar` and no classifier, the
    /// common case for a library dependency.
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: String::new(),
            extension: "jar".to_string(),
            version: version.into(),
            properties: BTreeMap::new(),
            file: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.version = version.into();
        clone
    }

    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = Some(file);
        self
    }

    /// `group:artifact` key, ignoring version — used as a conflict id
    /// component and as a cache/ancestor-stack key.
    pub fn ga_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// `group:artifact:classifier:extension` conflict id (spec.md §4.N).
    pub fn conflict_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.classifier, self.extension
        )
    }

    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.version)
    }

    /// Collapse a timestamped snapshot qualifier to `-SNAPSHOT`
    /// (spec.md §3 invariant, §8 scenario 6):
    /// `1.0-20110329.221805-4` → `1.0-SNAPSHOT`.
    pub fn base_version(&self) -> String {
        base_version_of(&self.version)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.group_id, self.artifact_id)?;
        if !self.classifier.is_empty() {
            write!(f, "{}:", self.classifier)?;
        }
        write!(f, "{}:{}", self.extension, self.version)
    }
}

/// True if `version` itself ends in the literal `-SNAPSHOT` qualifier.
pub fn is_snapshot_version(version: &str) -> bool {
    version.ends_with("-SNAPSHOT")
}

/// Compute the base version for an arbitrary version string, collapsing a
/// `-yyyyMMdd.HHmmss-N` timestamp qualifier down to `-SNAPSHOT`.
pub fn base_version_of(version: &str) -> String {
    if is_snapshot_version(version) {
        return version.to_string();
    }
    if let Some(base) = strip_timestamp_qualifier(version) {
        return format!("{base}-SNAPSHOT");
    }
    version.to_string()
}

/// If `version` ends with a Maven timestamped-snapshot qualifier
/// (`-yyyyMMdd.HHmmss-buildNumber`), return the prefix before it.
fn strip_timestamp_qualifier(version: &str) -> Option<&str> {
    let (rest, build_number) = version.rsplit_once('-')?;
    if build_number.is_empty() || !build_number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (base, timestamp) = rest.rsplit_once('-')?;
    if !is_timestamp(timestamp) {
        return None;
    }
    if base.is_empty() {
        return None;
    }
    Some(base)
}

/// `yyyyMMdd.HHmmss`: 8 digits, a dot, 6 digits.
fn is_timestamp(s: &str) -> bool {
    let Some((date, time)) = s.split_once('.') else {
        return false;
    };
    date.len() == 8
        && time.len() == 6
        && date.bytes().all(|b| b.is_ascii_digit())
        && time.bytes().all(|b| b.is_ascii_digit())
}
