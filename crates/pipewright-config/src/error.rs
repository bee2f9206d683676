//! Configuration parsing errors.
//!
//! Two channels: field-level problems are collected into a
//! [`ValidationErrors`] tree and reported together, while the
//! [`ConfigurationFailure`]s below stop the parse at the first occurrence.

use pipewright_core::InvalidEnumValue;
use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pipeline configuration:\n{0}")]
    ValidationFailure(ValidationErrors),

    #[error(transparent)]
    ConfigurationFailure(#[from] ConfigurationFailure),
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::ValidationFailure(errors)
    }
}

/// Problems that abort the parse immediately.
#[derive(Debug, Error)]
pub enum ConfigurationFailure {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode pipeline document: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error(transparent)]
    InvalidEnumValue(#[from] InvalidEnumValue),

    #[error(
        "missing secret provider: application '{application}' binds '{helm_key}' to unknown provider '{provider}'"
    )]
    MissingSecretProvider {
        application: String,
        helm_key: String,
        provider: String,
    },

    #[error("'{job}' depends on '{dependency}', which must be declared before it")]
    DependencyOrder { job: String, dependency: String },

    #[error("change detection failed: {0}")]
    Diff(#[from] pipewright_core::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
