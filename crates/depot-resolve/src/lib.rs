//! Resolution against a session's repository list: metadata (component
//! J), artifacts (component K), and version ranges (component L).

pub mod artifact_resolver;
pub mod metadata_resolver;
pub mod metadata_xml;
pub mod version_resolver;
