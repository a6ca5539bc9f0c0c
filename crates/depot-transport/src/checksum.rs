//! Checksum validation (component D, spec.md §4.D): reconciles a
//! downloaded file's computed digest against whichever checksum sources
//! are available, and turns a mismatch into an action per the effective
//! [`ChecksumPolicyKind`].

use depot_core::repository::ChecksumPolicyKind;
use depot_util::errors::DepotError;
use depot_util::hash::Algorithm;

/// Where an expected checksum value came from, in the precedence order
/// the connector tries them (spec.md §4.D step 1):
/// 1. provided alongside the request (e.g. a lockfile pin),
/// 2. a header embedded in the remote response,
/// 3. an external sidecar file (`.sha256`/`.sha1`/`.md5`).
#[derive(Debug, Clone)]
pub enum ChecksumSource {
    Provided(String),
    ResponseHeader(String),
    ExternalSidecar(String),
}

impl ChecksumSource {
    pub fn value(&self) -> &str {
        match self {
            ChecksumSource::Provided(v) => v,
            ChecksumSource::ResponseHeader(v) => v,
            ChecksumSource::ExternalSidecar(v) => v,
        }
    }
}

/// The outcome of validating one downloaded artifact's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// A checksum source matched.
    Match,
    /// No checksum source was available at all.
    NoChecksumAvailable,
    /// A checksum source was available but did not match.
    Mismatch { expected: String, actual: String },
}

/// Validate `actual_digests` (one per algorithm that was computed over
/// the downloaded bytes, strongest first per
/// [`Algorithm::default_order`]) against the first available
/// [`ChecksumSource`] for each algorithm, trying algorithms in order
/// until one has a source to compare against (spec.md §4.D step 2).
pub fn validate(
    actual_digests: &[(Algorithm, String)],
    sources: impl Fn(Algorithm) -> Option<ChecksumSource>,
) -> ChecksumOutcome {
    for (algorithm, actual) in actual_digests {
        if let Some(source) = sources(*algorithm) {
            let expected = source.value().trim().to_lowercase();
            if expected == actual.to_lowercase() {
                return ChecksumOutcome::Match;
            }
            return ChecksumOutcome::Mismatch {
                expected,
                actual: actual.clone(),
            };
        }
    }
    ChecksumOutcome::NoChecksumAvailable
}

/// Apply `policy` to a validation outcome, producing the action the
/// connector should take (spec.md §4.D step 3):
///
/// - `Match` always succeeds;
/// - `NoChecksumAvailable` succeeds under every policy (nothing to
///   enforce) but the caller should still log under `warn`/`fail`;
/// - `Mismatch` under `ignore` succeeds, under `warn` succeeds but the
///   caller must surface a warning, under `fail` errors.
pub fn apply_policy(policy: ChecksumPolicyKind, outcome: &ChecksumOutcome) -> Result<(), DepotError> {
    match outcome {
        ChecksumOutcome::Match => Ok(()),
        ChecksumOutcome::NoChecksumAvailable => Ok(()),
        ChecksumOutcome::Mismatch { expected, actual } => match policy {
            ChecksumPolicyKind::Ignore | ChecksumPolicyKind::Warn => Ok(()),
            ChecksumPolicyKind::Fail => Err(DepotError::ChecksumFailure {
                message: format!("expected {expected}, got {actual}"),
            }),
        },
    }
}

/// True if `apply_policy` would have logged a warning for this outcome
/// under `policy` (used by the connector to decide whether to emit a
/// `tracing::warn!`).
pub fn should_warn(policy: ChecksumPolicyKind, outcome: &ChecksumOutcome) -> bool {
    matches!(policy, ChecksumPolicyKind::Warn)
        && matches!(outcome, ChecksumOutcome::Mismatch { .. } | ChecksumOutcome::NoChecksumAvailable)
}
