use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all depot operations.
///
/// Variants mirror the taxonomy in the design's error-handling section:
/// not-found, transfer, checksum, descriptor, version-resolution,
/// collection, offline, and missing-component errors each get their own
/// variant so callers can match on failure kind rather than parse a message.
#[derive(Debug, Error, Diagnostic)]
pub enum DepotError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The local repository layout could not produce or parse a path.
    #[error("Layout error: {message}")]
    #[diagnostic(help("Check the artifact/metadata coordinates and repository layout"))]
    Layout { message: String },

    /// An artifact or metadata item is absent from the queried origin.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A cached not-found or transfer-error outcome is being replayed.
    ///
    /// The message always contains the literal substring `"cached"` so
    /// callers can distinguish a fresh failure from a replayed one (§7, §8
    /// scenario 4).
    #[error("{message} (cached)")]
    Cached { message: String },

    /// Networking or protocol failure during a transfer.
    #[error("Transfer error: {message}")]
    Transfer { message: String },

    /// Integrity verification failed or errored.
    #[error("Checksum failure: {message}")]
    #[diagnostic(help("The downloaded bytes do not match the repository's published checksum"))]
    ChecksumFailure { message: String },

    /// A transfer was cancelled by the caller.
    #[error("Transfer cancelled: {message}")]
    Cancelled { message: String },

    /// An artifact descriptor (effective model projection) could not be read.
    #[error("Descriptor error: {message}")]
    Descriptor { message: String },

    /// No version satisfied a requested constraint or range.
    #[error("Version resolution failed: {message}")]
    VersionResolution { message: String },

    /// One or more errors were accumulated while walking a dependency graph.
    #[error("Dependency collection failed: {message}")]
    Collection { message: String },

    /// A remote access was attempted while the session is offline.
    #[error("Repository offline: {message}")]
    Offline { message: String },

    /// No `Transporter`/`RepositoryLayout` is registered for a repository type.
    #[error("No component available: {message}")]
    NoComponent { message: String },

    /// Dependency resolution failed (version conflicts, missing deps, etc.).
    #[error("Resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl DepotError {
    /// True if this error represents a not-found outcome (fresh or cached).
    pub fn is_not_found(&self) -> bool {
        matches!(self, DepotError::NotFound { .. })
            || matches!(self, DepotError::Cached { message } if message.contains("not found") || message.contains("Not found"))
    }

    /// Build a "cached" variant of a not-found error for replay (§4.K, §7).
    pub fn cached_not_found(original: &str) -> Self {
        DepotError::Cached {
            message: format!("not found: {original}"),
        }
    }

    /// Build a "cached" variant of a transfer error for replay (§4.K, §7).
    pub fn cached_transfer(original: &str) -> Self {
        DepotError::Cached {
            message: format!("transfer error: {original}"),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type DepotResult<T> = miette::Result<T>;
