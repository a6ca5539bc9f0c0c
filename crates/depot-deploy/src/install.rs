//! Installer (component O, spec.md §4.O): writes an artifact into the
//! local repository and registers it, merging any accompanying metadata
//! with the copy already on disk.

use std::path::Path;

use depot_core::artifact::Artifact;
use depot_core::metadata::{Metadata, VersioningIndex};
use depot_local::manager::LocalRepositoryManager;
use depot_resolve::metadata_xml::{parse_versioning_index, render_versioning_index};
use depot_util::errors::DepotError;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum InstallEvent {
    ArtifactInstalling(Artifact),
    ArtifactInstalled(Artifact),
    MetadataInstalling(Metadata),
    MetadataInstalled(Metadata),
}

/// Metadata whose on-disk copy should be merged rather than overwritten,
/// e.g. a `VersioningIndex` gaining one more installed version (spec.md
/// §4.O "MergeableMetadata").
pub trait MergeableMetadata {
    fn metadata(&self) -> &Metadata;
    fn merge(&self, current: Option<VersioningIndex>) -> VersioningIndex;
}

/// Adds `artifact.version` to an existing artifact-level versioning
/// index (or creates one), keeping `latest` pointed at the
/// highest-by-insertion-order version — the common case when installing
/// a newly-built artifact (spec.md §4.O).
pub struct AddVersionMetadata {
    pub metadata: Metadata,
    pub version: String,
}

impl MergeableMetadata for AddVersionMetadata {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn merge(&self, current: Option<VersioningIndex>) -> VersioningIndex {
        let mut index = current.unwrap_or_default();
        if !index.versions.contains(&self.version) {
            index.versions.push(self.version.clone());
        }
        index.latest = Some(self.version.clone());
        if !self.version.ends_with("-SNAPSHOT") {
            index.release = Some(self.version.clone());
        }
        index
    }
}

pub struct Installer;

impl Installer {
    /// Install `artifact` (which must already have `file` set to the
    /// bytes-on-disk to copy in) plus any `metadata` to merge, emitting
    /// progress events as each step starts and finishes (spec.md §4.O
    /// "Events").
    pub fn install(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        artifact: &Artifact,
        metadata: &[Box<dyn MergeableMetadata>],
        mut on_event: impl FnMut(InstallEvent),
    ) -> miette::Result<Artifact> {
        on_event(InstallEvent::ArtifactInstalling(artifact.clone()));
        let source = artifact.file.as_deref().ok_or_else(|| DepotError::Generic {
            message: format!("{artifact} has no local file to install"),
        })?;
        let destination = local_repo.path_for_local_artifact(artifact);
        copy_into_place(source, &destination)?;
        let installed = artifact.clone().with_file(destination);
        on_event(InstallEvent::ArtifactInstalled(installed.clone()));

        for item in metadata {
            on_event(InstallEvent::MetadataInstalling(item.metadata().clone()));
            let path = local_repo.path_for_local_metadata(item.metadata());
            let current = std::fs::read_to_string(&path)
                .ok()
                .and_then(|content| parse_versioning_index(&content).ok());
            let merged = item.merge(current);
            let group_id = item.metadata().group_id.clone().unwrap_or_default();
            let artifact_id = item.metadata().artifact_id.clone().unwrap_or_default();
            let rendered = render_versioning_index(&group_id, &artifact_id, &merged);
            depot_util::fs::write_atomic_checked(&path, rendered.as_bytes())?;
            debug!(path = %path.display(), "metadata merged and installed");
            on_event(InstallEvent::MetadataInstalled(item.metadata().clone()));
        }

        Ok(installed)
    }
}

fn copy_into_place(source: &Path, destination: &Path) -> miette::Result<()> {
    let bytes = std::fs::read(source).map_err(DepotError::Io)?;
    depot_util::fs::write_atomic_checked(destination, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::metadata::MetadataNature;
    use depot_local::manager::SimpleLocalRepositoryManager;

    #[test]
    fn installs_artifact_and_merges_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tempfile::tempdir().unwrap();
        let source_file = source_dir.path().join("lib-1.0.jar");
        std::fs::write(&source_file, b"jar-bytes").unwrap();

        let local_repo = SimpleLocalRepositoryManager::new(tmp.path());
        let artifact = Artifact::new("org.example", "lib", "1.0").with_file(source_file);

        let metadata_item = Box::new(AddVersionMetadata {
            metadata: Metadata::group_artifact("org.example", "lib", MetadataNature::Release),
            version: "1.0".to_string(),
        }) as Box<dyn MergeableMetadata>;

        let mut events = Vec::new();
        let installer = Installer;
        let installed = installer
            .install(&local_repo, &artifact, &[metadata_item], |e| events.push(format!("{e:?}")))
            .unwrap();

        assert!(installed.file.as_ref().unwrap().is_file());
        assert_eq!(std::fs::read(installed.file.as_ref().unwrap()).unwrap(), b"jar-bytes");

        let metadata_path = local_repo.path_for_local_metadata(&Metadata::group_artifact(
            "org.example",
            "lib",
            MetadataNature::Release,
        ));
        let content = std::fs::read_to_string(metadata_path).unwrap();
        assert!(content.contains("<version>1.0</version>"));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn merge_adds_to_existing_versions_without_duplicating() {
        let metadata = Metadata::group_artifact("org.example", "lib", MetadataNature::Release);
        let item = AddVersionMetadata {
            metadata,
            version: "1.1".to_string(),
        };
        let current = VersioningIndex {
            latest: Some("1.0".to_string()),
            release: Some("1.0".to_string()),
            versions: vec!["1.0".to_string()],
            last_updated: None,
        };
        let merged = item.merge(Some(current));
        assert_eq!(merged.versions, vec!["1.0", "1.1"]);
        assert_eq!(merged.latest, Some("1.1".to_string()));
    }
}
