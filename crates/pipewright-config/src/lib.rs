//! Pipeline document parsing for pipewright.
//!
//! This crate handles:
//! - Decoding the YAML pipeline document
//! - Field-level validation into a single error tree
//! - Resolving artifacts and applications into a job graph with change flags

pub mod document;
pub mod error;
pub mod git;
pub mod parse;
mod rules;
pub mod validation;

pub use document::PipelineConfig;
pub use error::{ConfigError, ConfigResult, ConfigurationFailure};
pub use git::GitDiff;
pub use parse::{
    GraphBuilder, ParseFailure, ParsedConfig, PipelineGraph, parse_build, parse_pipeline,
    parse_pipeline_file,
};
pub use validation::{FieldError, Validate, ValidationErrors};
