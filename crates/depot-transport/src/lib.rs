//! Transfer engine: the protocol-facing half of the resolver.
//!
//! `layout` maps coordinates to repository-relative paths, `transporter`
//! is the protocol boundary a connector drives, `checksum` enforces
//! integrity policy on downloaded bytes, `connector` batches and retries
//! transfers against one repository, and `remote` aggregates and
//! resolves a session's repository list.

pub mod checksum;
pub mod connector;
pub mod layout;
pub mod remote;
pub mod transporter;
