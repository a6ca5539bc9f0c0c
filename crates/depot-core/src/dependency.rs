//! The `Dependency` value type (spec.md §3 DATA MODEL).

use std::collections::BTreeSet;
use std::fmt;

use crate::artifact::Artifact;

/// Maven-compatible dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Compile,
    Runtime,
    Provided,
    Test,
    System,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Provided => "provided",
            Scope::Test => "test",
            Scope::System => "system",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "runtime" => Scope::Runtime,
            "provided" => Scope::Provided,
            "test" => Scope::Test,
            "system" => Scope::System,
            _ => Scope::Compile,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `group:artifact` pair to exclude from a dependency's transitive closure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Exclusion {
    pub group_id: String,
    /// `None` means "exclude every artifact in this group".
    pub artifact_id: Option<String>,
}

impl Exclusion {
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id
            && self
                .artifact_id
                .as_deref()
                .map(|a| a == artifact_id)
                .unwrap_or(true)
    }
}

/// A single dependency edge declaration: an artifact coordinate plus scope,
/// optionality, and exclusions.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub artifact: Artifact,
    pub scope: Scope,
    pub optional: bool,
    pub exclusions: BTreeSet<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: Artifact, scope: Scope) -> Self {
        Self {
            artifact,
            scope,
            optional: false,
            exclusions: BTreeSet::new(),
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn excluding(mut self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        self.exclusions.extend(exclusions);
        self
    }

    /// True if `group_id:artifact_id` is excluded by this dependency's
    /// exclusion set.
    pub fn excludes(&self, group_id: &str, artifact_id: &str) -> bool {
        self.exclusions.iter().any(|e| e.matches(group_id, artifact_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_matches_exact_artifact() {
        let e = Exclusion {
            group_id: "commons-logging".to_string(),
            artifact_id: Some("commons-logging".to_string()),
        };
        assert!(e.matches("commons-logging", "commons-logging"));
        assert!(!e.matches("commons-logging", "other"));
    }

    #[test]
    fn exclusion_matches_whole_group() {
        let e = Exclusion {
            group_id: "org.slf4j".to_string(),
            artifact_id: None,
        };
        assert!(e.matches("org.slf4j", "slf4j-api"));
        assert!(e.matches("org.slf4j", "anything"));
    }

    #[test]
    fn dependency_excludes_checks_set() {
        let dep = Dependency::new(Artifact::new("g", "a", "1.0"), Scope::Compile).excluding([
            Exclusion {
                group_id: "x".to_string(),
                artifact_id: Some("y".to_string()),
            },
        ]);
        assert!(dep.excludes("x", "y"));
        assert!(!dep.excludes("x", "z"));
    }
}
