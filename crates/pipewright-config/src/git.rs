//! Diff source backed by the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use pipewright_core::{ChangedPaths, DiffSource, Error, Result};
use tracing::debug;

/// Runs `git diff --name-only <base> <head>` inside a checkout.
#[derive(Debug, Clone)]
pub struct GitDiff {
    repo_dir: PathBuf,
    head: String,
}

impl GitDiff {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            head: "HEAD".to_string(),
        }
    }

    /// Compare against `head` instead of the checked out revision.
    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

impl DiffSource for GitDiff {
    fn changed_paths(&self, base_ref: &str) -> Result<ChangedPaths> {
        debug!(
            repo = %self.repo_dir.display(),
            base_ref,
            head = %self.head,
            "Running git diff"
        );
        let output = Command::new("git")
            .args(["diff", "--name-only", base_ref, self.head.as_str()])
            .current_dir(&self.repo_dir)
            .output()?;

        if !output.status.success() {
            return Err(Error::Diff {
                base_ref: base_ref.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_name_only(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// One path per line; blank lines are ignored.
fn parse_name_only(stdout: &str) -> ChangedPaths {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
