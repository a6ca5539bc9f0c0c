//! Version and version-range resolution (component L, spec.md §4.L):
//! turns a [`VersionConstraint`] into one concrete version, folding in
//! workspace-local versions alongside the repository metadata index, and
//! substitutes the canonical timestamped filename for `-SNAPSHOT`
//! versions.

use depot_core::metadata::SnapshotVersioning;
use depot_core::version::{MavenVersion, VersionConstraint};
use depot_util::errors::DepotError;

/// The result of resolving a version constraint: the chosen version plus
/// whether it came from a range (so callers know a re-resolve might pick
/// differently later) or was pinned exactly.
#[derive(Debug, Clone)]
pub struct VersionResolutionResult {
    pub version: String,
    pub was_range: bool,
}

/// Resolve `constraint` against the union of `repository_versions` (from
/// a `maven-metadata.xml` [`depot_core::metadata::VersioningIndex`]) and
/// `workspace_versions` (from a `WorkspaceReader`), preferring the
/// workspace's own version when both sides offer a match at the same
/// version (spec.md §4.L step 1, §6 "WorkspaceReader").
pub fn resolve_version_constraint(
    constraint: &VersionConstraint,
    repository_versions: &[String],
    workspace_versions: &[String],
) -> miette::Result<VersionResolutionResult> {
    match constraint {
        VersionConstraint::Literal(v) => Ok(VersionResolutionResult {
            version: v.clone(),
            was_range: false,
        }),
        VersionConstraint::Range(range) => {
            if range.is_exact() {
                return Ok(VersionResolutionResult {
                    version: range.as_str().trim_matches(['[', ']']).to_string(),
                    was_range: false,
                });
            }

            let mut candidates: Vec<MavenVersion> = repository_versions
                .iter()
                .chain(workspace_versions.iter())
                .map(|v| MavenVersion::parse(v))
                .collect();
            candidates.sort();
            candidates.dedup_by(|a, b| a == b);

            let selected = range.select_highest(&candidates).ok_or_else(|| DepotError::VersionResolution {
                message: format!("no version in {} satisfies range {}", candidates.len(), range.as_str()),
            })?;

            Ok(VersionResolutionResult {
                version: selected.as_str().to_string(),
                was_range: true,
            })
        }
    }
}

/// Substitute the canonical timestamped version for a resolved
/// `-SNAPSHOT` version, if version-level metadata provides one; falls
/// back to the literal `-SNAPSHOT` string when the repository has no
/// snapshot metadata yet (a fresh, never-deployed snapshot directory).
pub fn resolve_snapshot_filename_version(version: &str, snapshot_versioning: Option<&SnapshotVersioning>) -> String {
    snapshot_versioning
        .and_then(|sv| sv.canonical_version(version))
        .unwrap_or_else(|| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::version::VersionConstraint;

    #[test]
    fn literal_constraint_passes_through() {
        let result =
            resolve_version_constraint(&VersionConstraint::parse("1.0"), &[], &[]).unwrap();
        assert_eq!(result.version, "1.0");
        assert!(!result.was_range);
    }

    #[test]
    fn range_picks_highest_matching_repository_version() {
        let repository_versions = vec!["1.0".to_string(), "1.5".to_string(), "2.0".to_string()];
        let result = resolve_version_constraint(
            &VersionConstraint::parse("[1.0,2.0)"),
            &repository_versions,
            &[],
        )
        .unwrap();
        assert_eq!(result.version, "1.5");
        assert!(result.was_range);
    }

    #[test]
    fn range_folds_in_workspace_versions() {
        let repository_versions = vec!["1.0".to_string()];
        let workspace_versions = vec!["1.9-SNAPSHOT".to_string()];
        let result = resolve_version_constraint(
            &VersionConstraint::parse("[1.0,2.0)"),
            &repository_versions,
            &workspace_versions,
        )
        .unwrap();
        assert_eq!(result.version, "1.9-SNAPSHOT");
    }

    #[test]
    fn range_with_no_match_errors() {
        let repository_versions = vec!["0.1".to_string()];
        let result = resolve_version_constraint(&VersionConstraint::parse("[1.0,2.0)"), &repository_versions, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn exact_range_bypasses_candidate_search() {
        let result = resolve_version_constraint(&VersionConstraint::parse("[1.0]"), &[], &[]).unwrap();
        assert_eq!(result.version, "1.0");
        assert!(!result.was_range);
    }

    #[test]
    fn snapshot_filename_uses_timestamp_when_available() {
        let sv = SnapshotVersioning {
            timestamp: Some("20240615.143022".to_string()),
            build_number: Some(3),
            last_updated: None,
        };
        assert_eq!(
            resolve_snapshot_filename_version("1.0-SNAPSHOT", Some(&sv)),
            "1.0-20240615.143022-3"
        );
    }

    #[test]
    fn snapshot_filename_falls_back_without_metadata() {
        assert_eq!(resolve_snapshot_filename_version("1.0-SNAPSHOT", None), "1.0-SNAPSHOT");
    }
}
