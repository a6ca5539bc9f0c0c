//! Repository layout (component B, spec.md §4.B): maps artifact and
//! metadata coordinates to repository-relative paths, both for the local
//! cache (enhanced/simple) and for remote HTTP layouts (which always
//! follow the Maven2 convention this module implements).

use depot_core::artifact::Artifact;
use depot_core::metadata::Metadata;

/// The Maven2-style layout: `group/with/dots/as/slashes/artifact/version/
/// artifact-version[-classifier].extension`. This is the only layout
/// remote repositories speak; the local repository manager additionally
/// offers a simpler, non-Maven2 tree (see `depot-local`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Maven2Layout;

impl Maven2Layout {
    /// `groupPath/artifactId/baseVersion/artifactId-baseVersion[-classifier].ext`
    /// — the directory and the filename both collapse to `baseVersion`, so
    /// this is stable for an artifact regardless of which timestamped
    /// snapshot version it currently carries (spec.md §4.B, §8 invariant 1:
    /// `pathForLocalArtifact(a) == pathForLocalArtifact(a.withVersion(timestamped))`).
    pub fn artifact_path(&self, artifact: &Artifact) -> String {
        self.artifact_path_with_resolved_version(artifact, &artifact.base_version())
    }

    /// Same directory as [`Maven2Layout::artifact_path`] (`baseVersion`),
    /// but with `resolved_version` substituted into the filename instead
    /// of the collapsed base — the path a remote repository actually
    /// serves a resolved (possibly timestamped) version at, and the path
    /// `pathForRemoteArtifact` caches it under locally (spec.md §4.B,
    /// §8 invariant 2: `pathForRemoteArtifact(a, r).endsWith(a.version)`).
    pub fn artifact_path_with_resolved_version(&self, artifact: &Artifact, resolved_version: &str) -> String {
        let group_path = artifact.group_id.replace('.', "/");
        let mut filename = format!("{}-{}", artifact.artifact_id, resolved_version);
        if !artifact.classifier.is_empty() {
            filename.push('-');
            filename.push_str(&artifact.classifier);
        }
        filename.push('.');
        filename.push_str(&artifact.extension);

        format!(
            "{}/{}/{}/{}",
            group_path,
            artifact.artifact_id,
            artifact.base_version(),
            filename
        )
    }

    pub fn metadata_path(&self, metadata: &Metadata) -> String {
        let mut parts = Vec::new();
        if let Some(group_id) = &metadata.group_id {
            parts.push(group_id.replace('.', "/"));
        }
        if let Some(artifact_id) = &metadata.artifact_id {
            parts.push(artifact_id.clone());
        }
        if let Some(version) = &metadata.version {
            parts.push(version.clone());
        }
        parts.push(metadata.kind.clone());
        parts.join("/")
    }

    /// The checksum sidecar path for an already-computed content path,
    /// e.g. `.../lib-1.0.jar.sha256` (spec.md §4.D, §6).
    pub fn checksum_path(&self, content_path: &str, extension: &str) -> String {
        format!("{content_path}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::metadata::MetadataNature;

    #[test]
    fn artifact_path_no_classifier() {
        let layout = Maven2Layout;
        let artifact = Artifact::new("org.example", "lib", "1.0");
        assert_eq!(
            layout.artifact_path(&artifact),
            "org/example/lib/1.0/lib-1.0.jar"
        );
    }

    #[test]
    fn artifact_path_with_classifier() {
        let layout = Maven2Layout;
        let artifact = Artifact::new("org.example", "lib", "1.0").with_classifier("sources");
        assert_eq!(
            layout.artifact_path(&artifact),
            "org/example/lib/1.0/lib-1.0-sources.jar"
        );
    }

    #[test]
    fn snapshot_path_keeps_snapshot_directory_but_timestamps_filename() {
        let layout = Maven2Layout;
        let artifact = Artifact::new("org.example", "lib", "1.0-SNAPSHOT");
        let path = layout.artifact_path_with_resolved_version(&artifact, "1.0-20110329.221805-4");
        assert_eq!(path, "org/example/lib/1.0-SNAPSHOT/lib-1.0-20110329.221805-4.jar");
    }

    #[test]
    fn resolved_version_path_collapses_directory_even_when_artifact_version_is_timestamped() {
        // An artifact whose `version` field is already the timestamped
        // snapshot (as it is once version resolution has filled it in)
        // must still land in the `-SNAPSHOT` directory, not one named
        // after the timestamp.
        let layout = Maven2Layout;
        let artifact = Artifact::new("org.example", "lib", "1.0-20110329.221805-4");
        let path = layout.artifact_path_with_resolved_version(&artifact, &artifact.version.clone());
        assert_eq!(path, "org/example/lib/1.0-SNAPSHOT/lib-1.0-20110329.221805-4.jar");
    }

    #[test]
    fn local_artifact_path_collapses_to_base_version_in_filename_too() {
        let layout = Maven2Layout;
        let artifact = Artifact::new("org.example", "lib", "1.0-20110329.221805-4");
        assert_eq!(
            layout.artifact_path(&artifact),
            "org/example/lib/1.0-SNAPSHOT/lib-1.0-SNAPSHOT.jar"
        );
    }

    #[test]
    fn metadata_path_at_group_artifact_version_level() {
        let layout = Maven2Layout;
        let metadata =
            Metadata::group_artifact_version("org.example", "lib", "1.0-SNAPSHOT", MetadataNature::Snapshot);
        assert_eq!(
            layout.metadata_path(&metadata),
            "org/example/lib/1.0-SNAPSHOT/maven-metadata.xml"
        );
    }

    #[test]
    fn metadata_path_at_group_level() {
        let layout = Maven2Layout;
        let metadata = Metadata::group("org.example", MetadataNature::Release);
        assert_eq!(layout.metadata_path(&metadata), "org/example/maven-metadata.xml");
    }

    #[test]
    fn checksum_path_appends_extension() {
        let layout = Maven2Layout;
        assert_eq!(
            layout.checksum_path("org/example/lib/1.0/lib-1.0.jar", "sha256"),
            "org/example/lib/1.0/lib-1.0.jar.sha256"
        );
    }
}
