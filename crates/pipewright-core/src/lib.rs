//! Core domain types and traits for the pipewright pipeline compiler.
//!
//! This crate contains:
//! - Enumerated kinds (cloud provider, secret provider, artifact, application)
//! - Provider settings and shared resources
//! - Change detection strategies and the diff source trait
//! - Resolved jobs (artifacts and applications)

pub mod args;
pub mod change;
pub mod config_map;
pub mod error;
pub mod job;
pub mod kind;
pub mod resources;

pub use args::BuildArgs;
pub use change::{
    AlwaysChanged, ChangeDetection, ChangeDetector, ChangedPaths, DiffChangeDetection, DiffSource,
};
pub use config_map::ConfigMap;
pub use error::{Error, Result};
pub use job::{Application, Artifact, HelmSecretValue, HelmValue, Job, JobStage, Upstream};
pub use kind::{
    ApplicationKind, ArtifactKind, CloudProviderKind, Enumerated, InvalidEnumValue,
    SecretProviderKind,
};
pub use resources::{ArtifactRepository, CloudProvider, ClusterConfig, Resources, SecretProvider};
