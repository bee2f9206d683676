//! Error types for pipewright.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git diff against '{base_ref}' failed: {message}")]
    Diff { base_ref: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
