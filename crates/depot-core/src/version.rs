//! Version parsing, ordering, and range matching (component A, spec.md
//! §4.A). Segment-based Maven version comparison, ranges, and the
//! constraint union used by the range resolver (component L).

use std::cmp::Ordering;
use std::fmt;

/// One token of a parsed version: either a numeric run or a qualifier
/// run, in the order they appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Qualifier(String),
}

/// A parsed Maven-style version: dot/dash/underscore separated segments,
/// each either numeric or a qualifier word, ordered per the qualifier
/// table below (spec.md §4.A).
#[derive(Debug, Clone, Eq)]
pub struct MavenVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl MavenVersion {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            segments: tokenize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ord = compare_segment(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Split a raw version string into alternating numeric/qualifier runs.
/// Separators (`.`, `-`, `_`) start a new segment; a transition between
/// digit and non-digit characters within a run also starts a new segment
/// even without an explicit separator (e.g. `1a1` -> `1`, `a`, `1`).
fn tokenize(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_is_digit: Option<bool> = None;

    let flush = |current: &mut String, is_digit: Option<bool>, out: &mut Vec<Segment>| {
        if current.is_empty() {
            return;
        }
        match is_digit {
            Some(true) => out.push(Segment::Number(current.parse().unwrap_or(0))),
            _ => out.push(Segment::Qualifier(current.to_lowercase())),
        }
        current.clear();
    };

    for ch in raw.chars() {
        if ch == '.' || ch == '-' || ch == '_' {
            flush(&mut current, current_is_digit, &mut segments);
            current_is_digit = None;
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if let Some(prev) = current_is_digit {
            if prev != is_digit {
                flush(&mut current, current_is_digit, &mut segments);
            }
        }
        current_is_digit = Some(is_digit);
        current.push(ch);
    }
    flush(&mut current, current_is_digit, &mut segments);

    segments
}

/// Qualifier ranking: `alpha < beta < milestone < rc|cr < snapshot <
/// (release, "", ga, final) < sp` (spec.md §4.A). Unknown qualifiers sort
/// after `sp`, compared lexically among themselves.
fn qualifier_rank(q: &str) -> i32 {
    match q {
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "ga" | "final" | "release" => 5,
        "sp" => 6,
        _ => 7,
    }
}

fn compare_segment(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(s)) => compare_segment(Some(&zero_like(s)), b).then(Ordering::Equal),
        (Some(s), None) => compare_segment(a, Some(&zero_like(s))),
        (Some(Segment::Number(x)), Some(Segment::Number(y))) => x.cmp(y),
        (Some(Segment::Qualifier(x)), Some(Segment::Qualifier(y))) => {
            let rx = qualifier_rank(x);
            let ry = qualifier_rank(y);
            if rx == 7 && ry == 7 {
                x.cmp(y)
            } else {
                rx.cmp(&ry)
            }
        }
        // A missing segment on one side behaves like that side's
        // "neutral" value for the other side's segment kind: 0 for
        // numbers, the empty qualifier ("release"-equivalent) for
        // qualifiers. A number always outranks a qualifier at the same
        // position (1.0 > 1.0-beta).
        (Some(Segment::Number(x)), Some(Segment::Qualifier(_))) => {
            if *x == 0 {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (Some(Segment::Qualifier(_)), Some(Segment::Number(y))) => {
            if *y == 0 {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
    }
}

fn zero_like(s: &Segment) -> Segment {
    match s {
        Segment::Number(_) => Segment::Number(0),
        Segment::Qualifier(_) => Segment::Qualifier(String::new()),
    }
}

/// An endpoint of a version range: bounded or open.
#[derive(Debug, Clone)]
enum Bound {
    Unbounded,
    Inclusive(MavenVersion),
    Exclusive(MavenVersion),
}

/// A single `[low,high]`-style interval, one component of a
/// `VersionRange` (Maven ranges are a comma-separated union of these).
#[derive(Debug, Clone)]
struct Interval {
    low: Bound,
    high: Bound,
}

impl Interval {
    fn contains(&self, v: &MavenVersion) -> bool {
        let low_ok = match &self.low {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v >= b,
            Bound::Exclusive(b) => v > b,
        };
        let high_ok = match &self.high {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v <= b,
            Bound::Exclusive(b) => v < b,
        };
        low_ok && high_ok
    }
}

/// A Maven version range: `[1.0,2.0)`, `(,1.0]`, `[1.0,]`, or the exact
/// single-version form `[1.0]` (spec.md §4.A, §4.L).
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    intervals: Vec<Interval>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid version range '{0}'")]
pub struct InvalidVersionRange(pub String);

impl VersionRange {
    pub fn parse(raw: &str) -> Result<Self, InvalidVersionRange> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidVersionRange(raw.to_string()));
        }

        let mut intervals = Vec::new();
        for part in split_top_level(trimmed) {
            intervals.push(parse_interval(&part).ok_or_else(|| InvalidVersionRange(raw.to_string()))?);
        }
        if intervals.is_empty() {
            return Err(InvalidVersionRange(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            intervals,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        self.intervals.iter().any(|i| i.contains(version))
    }

    /// True for the exact single-version form `[1.0]`, which pins a
    /// version instead of ranging over candidates.
    pub fn is_exact(&self) -> bool {
        self.intervals.len() == 1
            && matches!(
                (&self.intervals[0].low, &self.intervals[0].high),
                (Bound::Inclusive(a), Bound::Inclusive(b)) if a == b
            )
    }

    /// Select the highest version from `candidates` that this range
    /// contains (spec.md §4.L step 1: range resolution picks the highest
    /// matching version unless resolving an exact pin).
    pub fn select_highest<'a>(&self, candidates: &'a [MavenVersion]) -> Option<&'a MavenVersion> {
        candidates.iter().filter(|v| self.contains(v)).max()
    }
}

/// Split `"[1.0,2.0),[3.0,4.0)"` into its bracketed sub-ranges, respecting
/// bracket nesting depth (there is none in Maven ranges, but this keeps
/// the comma inside a single interval from being mistaken for a union
/// separator).
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth -= 1;
                current.push(ch);
                if depth == 0 {
                    parts.push(std::mem::take(&mut current));
                }
            }
            ',' if depth == 0 => {
                // separates unions; ignore stray whitespace
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_interval(part: &str) -> Option<Interval> {
    let part = part.trim();
    let (open, close) = (part.chars().next()?, part.chars().last()?);
    let low_inclusive = open == '[';
    let high_inclusive = close == ']';
    if !matches!(open, '[' | '(') || !matches!(close, ']' | ')') {
        return None;
    }
    let inner = &part[1..part.len() - 1];
    let (low_raw, high_raw) = if let Some(idx) = inner.find(',') {
        (&inner[..idx], &inner[idx + 1..])
    } else {
        // Exact single-version shorthand: "[1.0]"
        (inner, inner)
    };

    let low = if low_raw.trim().is_empty() {
        Bound::Unbounded
    } else if low_inclusive {
        Bound::Inclusive(MavenVersion::parse(low_raw.trim()))
    } else {
        Bound::Exclusive(MavenVersion::parse(low_raw.trim()))
    };
    let high = if high_raw.trim().is_empty() {
        Bound::Unbounded
    } else if high_inclusive {
        Bound::Inclusive(MavenVersion::parse(high_raw.trim()))
    } else {
        Bound::Exclusive(MavenVersion::parse(high_raw.trim()))
    };

    Some(Interval { low, high })
}

/// Either a single literal version or a range, as accepted by a
/// dependency declaration (spec.md §4.L).
#[derive(Debug, Clone)]
pub enum VersionConstraint {
    Literal(String),
    Range(VersionRange),
}

impl VersionConstraint {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            match VersionRange::parse(trimmed) {
                Ok(range) => VersionConstraint::Range(range),
                Err(_) => VersionConstraint::Literal(raw.to_string()),
            }
        } else {
            VersionConstraint::Literal(raw.to_string())
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, VersionConstraint::Range(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionConstraint::Literal(s) => s,
            VersionConstraint::Range(r) => r.as_str(),
        }
    }
}
