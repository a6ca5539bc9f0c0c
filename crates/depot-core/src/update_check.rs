//! UpdateCheckManager (component G): decides whether a remote (re)check is
//! required for an artifact or metadata item (spec.md §4.G).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// `never | always | daily | interval:<minutes>` (spec.md §4.G, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePolicy {
    Never,
    Always,
    Daily,
    IntervalMinutes(u64),
}

impl UpdatePolicy {
    /// Parse a policy string. An unrecognized `interval:<n>` with a
    /// non-numeric `n` is treated as `Daily` (spec.md §4.G: "a non-numeric
    /// `n` yields false" for `isUpdateRequired` — folding that into a
    /// policy that never forces an update except at the daily boundary
    /// preserves that behavior without a separate invalid state).
    pub fn parse(s: &str) -> Self {
        if s == "never" {
            UpdatePolicy::Never
        } else if s == "always" {
            UpdatePolicy::Always
        } else if s == "daily" {
            UpdatePolicy::Daily
        } else if let Some(rest) = s.strip_prefix("interval:") {
            match rest.parse::<u64>() {
                Ok(n) => UpdatePolicy::IntervalMinutes(n),
                Err(_) => UpdatePolicy::Daily,
            }
        } else {
            UpdatePolicy::Daily
        }
    }

    /// Numeric ranking used to find the "shortest interval" when merging
    /// two policies (spec.md §4.G "Effective policy"): `always < interval:n
    /// < daily < never`. Lower means stricter (more eager to recheck).
    fn strictness_rank(&self) -> u8 {
        match self {
            UpdatePolicy::Always => 0,
            UpdatePolicy::IntervalMinutes(_) => 1,
            UpdatePolicy::Daily => 2,
            UpdatePolicy::Never => 3,
        }
    }

    /// Merge two policies, keeping the stricter (shorter-interval) one.
    /// Commutative and monotone (spec.md §8 invariant).
    pub fn effective(a: &UpdatePolicy, b: &UpdatePolicy) -> UpdatePolicy {
        match (a, b) {
            (UpdatePolicy::IntervalMinutes(x), UpdatePolicy::IntervalMinutes(y)) => {
                UpdatePolicy::IntervalMinutes(*x.min(y))
            }
            _ => {
                if a.strictness_rank() <= b.strictness_rank() {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        }
    }

    /// Whether a recheck is required given the last-updated timestamp
    /// (epoch milliseconds), evaluated against `now` (epoch milliseconds).
    pub fn is_update_required(&self, last_update_ms: Option<u64>, now_ms: u64) -> bool {
        match self {
            UpdatePolicy::Never => false,
            UpdatePolicy::Always => true,
            UpdatePolicy::Daily => match last_update_ms {
                None => true,
                Some(t) => t < local_midnight_today(now_ms),
            },
            UpdatePolicy::IntervalMinutes(n) => match last_update_ms {
                None => true,
                Some(t) => now_ms.saturating_sub(t) > n.saturating_mul(60_000),
            },
        }
    }
}

/// Midnight (UTC) of the day containing `now_ms`, in epoch milliseconds.
/// The spec does not pin a timezone; UTC keeps this deterministic and
/// testable.
fn local_midnight_today(now_ms: u64) -> u64 {
    let day_ms = 86_400_000u64;
    (now_ms / day_ms) * day_ms
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A transient record of one update-check decision (spec.md §3 DATA MODEL
/// `UpdateCheck<T,E>`).
#[derive(Debug, Clone)]
pub struct UpdateCheck<T> {
    pub item: T,
    pub repository_key: String,
    pub policy: UpdatePolicy,
    pub local_last_updated: Option<u64>,
    pub file_valid: bool,
    pub required: Option<bool>,
    pub exception: Option<String>,
}

impl<T> UpdateCheck<T> {
    pub fn new(item: T, repository_key: impl Into<String>, policy: UpdatePolicy) -> Self {
        Self {
            item,
            repository_key: repository_key.into(),
            policy,
            local_last_updated: None,
            file_valid: true,
            required: None,
            exception: None,
        }
    }
}

/// Per-session memo of update-check outcomes, keyed by `(item-key,
/// repository-key)`. Guarantees each pair is decided at most once per
/// session (spec.md §3 invariant, §4.G, §8 invariant).
#[derive(Debug, Default)]
pub struct UpdateCheckMemo {
    decisions: HashMap<(String, String), bool>,
}

impl UpdateCheckMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized `required` decision if one exists for this
    /// `(item_key, repository_key)` pair.
    pub fn get(&self, item_key: &str, repository_key: &str) -> Option<bool> {
        self.decisions
            .get(&(item_key.to_string(), repository_key.to_string()))
            .copied()
    }

    /// Record a decision, or return the existing one if this pair was
    /// already decided this session (first decision wins).
    pub fn record_or_get(&mut self, item_key: &str, repository_key: &str, required: bool) -> bool {
        *self
            .decisions
            .entry((item_key.to_string(), repository_key.to_string()))
            .or_insert(required)
    }
}

/// Evaluate whether a remote check is required for an item, applying the
/// memo-once and no-local-file override rules (spec.md §4.G):
///
/// - if the item has no local file or `file_valid=false`, force `required
///   = true`, except when `policy = never` and there is no tracked
///   timestamp at all, in which case `required = false`;
/// - otherwise defer to `policy.is_update_required`;
/// - the session memo makes the whole decision idempotent per
///   `(item_key, repository_key)`.
pub fn check_required(
    memo: &mut UpdateCheckMemo,
    item_key: &str,
    repository_key: &str,
    has_local_file: bool,
    file_valid: bool,
    last_update_ms: Option<u64>,
    policy: &UpdatePolicy,
    now_ms: u64,
) -> bool {
    if let Some(existing) = memo.get(item_key, repository_key) {
        return existing;
    }

    let required = if !has_local_file || !file_valid {
        if matches!(policy, UpdatePolicy::Never) && last_update_ms.is_none() {
            false
        } else {
            true
        }
    } else {
        policy.is_update_required(last_update_ms, now_ms)
    };

    memo.record_or_get(item_key, repository_key, required)
}
