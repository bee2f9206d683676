//! Change detection for pipeline jobs.
//!
//! A job needs work when one of its watched paths shows up in the diff
//! between the previous and the current revision. [`AlwaysChanged`] skips the
//! diff entirely and is used for forced rebuilds.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::Result;

/// Decides whether a job has to run.
pub trait ChangeDetection: Sized {
    /// Return a copy that additionally watches `paths`.
    fn add_paths<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    fn has_changed(&self) -> bool;
}

/// Reports every job as changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysChanged;

impl ChangeDetection for AlwaysChanged {
    fn add_paths<I, S>(&self, _paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self
    }

    fn has_changed(&self) -> bool {
        true
    }
}

/// Files changed between a base revision and the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedPaths(BTreeSet<String>);

impl ChangedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(normalize(path))
    }

    /// True when any changed file is `watched` itself or lies beneath it.
    pub fn touches(&self, watched: &str) -> bool {
        let watched = normalize(watched);
        if watched.is_empty() {
            return !self.0.is_empty();
        }
        self.0.iter().any(|changed| {
            changed == watched
                || changed
                    .strip_prefix(watched)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ChangedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|path| normalize(path.as_ref()).to_string())
                .filter(|path| !path.is_empty())
                .collect(),
        )
    }
}

fn normalize(path: &str) -> &str {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./").or_else(|| path.strip_prefix('/')) {
        path = rest;
    }
    let path = path.trim_end_matches('/');
    if path == "." { "" } else { path }
}

/// Source of the changed-file list for a base revision.
pub trait DiffSource {
    fn changed_paths(&self, base_ref: &str) -> Result<ChangedPaths>;
}

/// A fixed diff, independent of the base revision.
impl DiffSource for ChangedPaths {
    fn changed_paths(&self, _base_ref: &str) -> Result<ChangedPaths> {
        Ok(self.clone())
    }
}

/// Watches a growing set of paths against one precomputed diff.
#[derive(Debug, Clone)]
pub struct DiffChangeDetection {
    base_ref: String,
    watched: Vec<String>,
    changes: Arc<ChangedPaths>,
}

impl DiffChangeDetection {
    pub fn new(base_ref: impl Into<String>, changes: Arc<ChangedPaths>) -> Self {
        Self {
            base_ref: base_ref.into(),
            watched: Vec::new(),
            changes,
        }
    }

    pub fn base_ref(&self) -> &str {
        &self.base_ref
    }

    pub fn watched(&self) -> &[String] {
        &self.watched
    }
}

impl ChangeDetection for DiffChangeDetection {
    fn add_paths<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        for path in paths {
            let path = path.into();
            if !next.watched.contains(&path) {
                next.watched.push(path);
            }
        }
        next
    }

    fn has_changed(&self) -> bool {
        self.watched.iter().any(|path| self.changes.touches(path))
    }
}

/// The strategy picked for one parse.
#[derive(Debug, Clone)]
pub enum ChangeDetector {
    Always(AlwaysChanged),
    Diff(DiffChangeDetection),
}

impl ChangeDetection for ChangeDetector {
    fn add_paths<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            ChangeDetector::Always(always) => ChangeDetector::Always(always.add_paths(paths)),
            ChangeDetector::Diff(diff) => ChangeDetector::Diff(diff.add_paths(paths)),
        }
    }

    fn has_changed(&self) -> bool {
        match self {
            ChangeDetector::Always(always) => always.has_changed(),
            ChangeDetector::Diff(diff) => diff.has_changed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(paths: &[&str]) -> DiffChangeDetection {
        DiffChangeDetection::new("abc123", Arc::new(paths.iter().collect()))
    }

    #[test]
    fn test_always_changed_ignores_paths() {
        let cd = AlwaysChanged.add_paths(["nowhere"]);
        assert!(cd.has_changed());
    }

    #[test]
    fn test_no_watched_paths_means_unchanged() {
        let cd = diff(&["api/main.go"]);
        assert!(!cd.has_changed());
    }

    #[test]
    fn test_watched_directory_matches_nested_file() {
        let cd = diff(&["api/cmd/main.go"]).add_paths(["api"]);
        assert!(cd.has_changed());
    }

    #[test]
    fn test_prefix_must_end_on_component_boundary() {
        let cd = diff(&["api-gateway/main.go"]).add_paths(["api"]);
        assert!(!cd.has_changed());
    }

    #[test]
    fn test_add_paths_leaves_original_untouched() {
        let base = diff(&["lib/util.go"]).add_paths(["api"]);
        let extended = base.add_paths(["lib"]);

        assert!(!base.has_changed());
        assert!(extended.has_changed());
        assert_eq!(base.watched(), ["api".to_string()]);
        assert_eq!(extended.watched().len(), 2);
        assert_eq!(extended.base_ref(), "abc123");
    }

    #[test]
    fn test_paths_are_normalized() {
        let changes: ChangedPaths = ["./charts/db/values.yaml", ""].into_iter().collect();
        assert_eq!(changes.len(), 1);
        assert!(changes.contains("charts/db/values.yaml"));
        assert!(changes.touches("./charts/db/"));
        assert!(changes.touches("."));
        assert!(!ChangedPaths::new().touches("."));
    }

    #[test]
    fn test_rooted_watched_path_matches_repo_relative_diff() {
        let changes: ChangedPaths = ["services/api/main.go"].into_iter().collect();
        assert!(changes.touches("/services/api"));
        assert!(changes.touches("/./services/"));
        assert!(!changes.touches("/services/web"));
        assert!(diff(&["services/api/main.go"]).add_paths(["/services/api"]).has_changed());
    }

    #[test]
    fn test_detector_dispatch() {
        let forced = ChangeDetector::Always(AlwaysChanged).add_paths(["x"]);
        assert!(forced.has_changed());

        let detector = ChangeDetector::Diff(diff(&["x/y"]));
        assert!(!detector.has_changed());
        assert!(detector.add_paths(["x"]).has_changed());
    }

    #[test]
    fn test_fixed_diff_source() {
        let changes: ChangedPaths = ["a/b"].into_iter().collect();
        let resolved = changes.changed_paths("any-ref").unwrap();
        assert_eq!(resolved, changes);
    }
}
