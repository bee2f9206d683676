//! Per-invocation parameters.

use std::path::PathBuf;

/// What the caller knows about the revision being built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// Pipeline document to read.
    pub config_path: PathBuf,
    /// Cloud project the pipeline runs in.
    pub project_id: String,
    /// Revision being built.
    pub current_sha: String,
    /// Revision the last successful run built, if any.
    pub previous_sha: Option<String>,
    /// Rebuild everything regardless of the diff.
    pub force: bool,
}

impl BuildArgs {
    pub fn new(project_id: impl Into<String>, current_sha: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            current_sha: current_sha.into(),
            ..Default::default()
        }
    }

    pub fn with_previous_sha(mut self, sha: impl Into<String>) -> Self {
        self.previous_sha = Some(sha.into());
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Base revision to diff against, or `None` when every job must run.
    ///
    /// Without a previous revision there is nothing to diff against, so the
    /// run behaves as if it were forced.
    pub fn diff_base(&self) -> Option<&str> {
        if self.force {
            return None;
        }
        self.previous_sha.as_deref().filter(|sha| !sha.is_empty())
    }
}
