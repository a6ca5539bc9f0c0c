//! Streaming parser for `maven-metadata.xml`, tracked by path context
//! rather than building a DOM — the format is small and flat enough that
//! a stack of open tag names is all the disambiguation the grammar
//! needs (e.g. telling the group-artifact-version `<version>` inside
//! `<snapshotVersion>` apart from the artifact-level `<version>` inside
//! `<versions>`).

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use depot_core::metadata::{SnapshotVersioning, VersioningIndex};
use depot_util::errors::DepotError;

fn text_of(reader: &mut Reader<&[u8]>) -> miette::Result<String> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                return Ok(t
                    .unescape()
                    .map(|s| s.into_owned())
                    .unwrap_or_default());
            }
            Ok(Event::End(_)) | Ok(Event::Eof) => return Ok(String::new()),
            Ok(_) => continue,
            Err(e) => {
                return Err(DepotError::Descriptor {
                    message: format!("malformed metadata XML: {e}"),
                }
                .into())
            }
        }
    }
}

/// Parse an artifact-level (`group:artifact`) `maven-metadata.xml`
/// document into a [`VersioningIndex`] (spec.md §4.J).
pub fn parse_versioning_index(xml: &str) -> miette::Result<VersioningIndex> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut index = VersioningIndex::default();
    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "latest" if in_versioning(&path) => index.latest = Some(text_of(&mut reader)?),
                    "release" if in_versioning(&path) => index.release = Some(text_of(&mut reader)?),
                    "lastUpdated" if in_versioning(&path) => index.last_updated = Some(text_of(&mut reader)?),
                    "version" if in_versions_list(&path) => index.versions.push(text_of(&mut reader)?),
                    _ => path.push(name),
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DepotError::Descriptor {
                    message: format!("malformed metadata XML: {e}"),
                }
                .into())
            }
        }
        buf.clear();
    }

    Ok(index)
}

fn in_versioning(path: &[String]) -> bool {
    path.last().map(|s| s == "versioning").unwrap_or(false)
}

fn in_versions_list(path: &[String]) -> bool {
    path.len() >= 2 && path[path.len() - 1] == "versions" && path[path.len() - 2] == "versioning"
}

/// Parse a version-level (`group:artifact:version`) `maven-metadata.xml`
/// document's `<versioning><snapshot>` block into a
/// [`SnapshotVersioning`] (spec.md §4.L step 5).
pub fn parse_snapshot_versioning(xml: &str) -> miette::Result<SnapshotVersioning> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut snapshot = SnapshotVersioning::default();
    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let in_snapshot = path.last().map(|s| s == "snapshot").unwrap_or(false);
                match name.as_str() {
                    "timestamp" if in_snapshot => snapshot.timestamp = Some(text_of(&mut reader)?),
                    "buildNumber" if in_snapshot => {
                        snapshot.build_number = text_of(&mut reader)?.parse().ok();
                    }
                    "lastUpdated" if in_versioning(&path) => {
                        snapshot.last_updated = Some(text_of(&mut reader)?)
                    }
                    _ => path.push(name),
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DepotError::Descriptor {
                    message: format!("malformed metadata XML: {e}"),
                }
                .into())
            }
        }
        buf.clear();
    }

    Ok(snapshot)
}

/// Render a [`VersioningIndex`] back to `maven-metadata.xml` text, used
/// by the installer/deployer when merging a local update into an
/// existing metadata file (spec.md §4.O "metadata merging").
pub fn render_versioning_index(group_id: &str, artifact_id: &str, index: &VersioningIndex) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata>\n");
    out.push_str(&format!("  <groupId>{group_id}</groupId>\n"));
    out.push_str(&format!("  <artifactId>{artifact_id}</artifactId>\n"));
    out.push_str("  <versioning>\n");
    if let Some(latest) = &index.latest {
        out.push_str(&format!("    <latest>{latest}</latest>\n"));
    }
    if let Some(release) = &index.release {
        out.push_str(&format!("    <release>{release}</release>\n"));
    }
    out.push_str("    <versions>\n");
    for version in &index.versions {
        out.push_str(&format!("      <version>{version}</version>\n"));
    }
    out.push_str("    </versions>\n");
    if let Some(last_updated) = &index.last_updated {
        out.push_str(&format!("    <lastUpdated>{last_updated}</lastUpdated>\n"));
    }
    out.push_str("  </versioning>\n</metadata>\n");
    out
}
