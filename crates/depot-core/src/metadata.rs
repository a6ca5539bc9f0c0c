//! The `Metadata` value type: a repository-side index file at G/GA/GAV
//! granularity (spec.md §3 DATA MODEL, GLOSSARY).

use std::path::PathBuf;

/// Which kind of content a metadata file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataNature {
    Release,
    Snapshot,
    ReleaseOrSnapshot,
}

/// An immutable repository metadata descriptor. Exists at group (G),
/// group-artifact (GA), or group-artifact-version (GAV) level depending
/// on which coordinate fields are populated.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub kind: String,
    pub nature: MetadataNature,
    pub file: Option<PathBuf>,
}

impl Metadata {
    pub fn group(group_id: impl Into<String>, nature: MetadataNature) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: None,
            version: None,
            kind: "maven-metadata.xml".to_string(),
            nature,
            file: None,
        }
    }

    pub fn group_artifact(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        nature: MetadataNature,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: None,
            kind: "maven-metadata.xml".to_string(),
            nature,
            file: None,
        }
    }

    pub fn group_artifact_version(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        nature: MetadataNature,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            kind: "maven-metadata.xml".to_string(),
            nature,
            file: None,
        }
    }

    /// The level this metadata exists at, used by the layout (component B)
    /// to choose which directory it lives in.
    pub fn level(&self) -> MetadataLevel {
        match (&self.artifact_id, &self.version) {
            (None, _) => MetadataLevel::Group,
            (Some(_), None) => MetadataLevel::GroupArtifact,
            (Some(_), Some(_)) => MetadataLevel::GroupArtifactVersion,
        }
    }

    /// Stable cache/tracking key for this metadata item.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id.as_deref().unwrap_or(""),
            self.artifact_id.as_deref().unwrap_or(""),
            self.version.as_deref().unwrap_or(""),
            self.kind
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataLevel {
    Group,
    GroupArtifact,
    GroupArtifactVersion,
}

/// Parsed contents of an artifact-level `maven-metadata.xml`: the set of
/// versions published under a `group:artifact`, used by the range
/// resolver (component L).
#[derive(Debug, Clone, Default)]
pub struct VersioningIndex {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
    pub last_updated: Option<String>,
}

/// Parsed contents of a version-level `maven-metadata.xml`: the
/// timestamped build identity of a `-SNAPSHOT` version (spec.md §4.L
/// step 5).
#[derive(Debug, Clone, Default)]
pub struct SnapshotVersioning {
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
    pub last_updated: Option<String>,
}

impl SnapshotVersioning {
    /// Substitute the canonical timestamped version for a `-SNAPSHOT`
    /// version, e.g. `1.0-SNAPSHOT` + timestamp `20240615.143022` +
    /// build `42` → `1.0-20240615.143022-42`.
    pub fn canonical_version(&self, snapshot_version: &str) -> Option<String> {
        let base = snapshot_version.strip_suffix("-SNAPSHOT")?;
        let ts = self.timestamp.as_deref()?;
        let bn = self.build_number?;
        Some(format!("{base}-{ts}-{bn}"))
    }
}
