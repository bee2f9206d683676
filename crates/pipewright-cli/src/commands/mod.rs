//! CLI command implementations.

pub mod plan;

use std::path::Path;

use anyhow::Result;
use pipewright_config::parse_pipeline_file;
use pipewright_core::{BuildArgs, ChangedPaths};
use tracing::debug;

pub fn validate(path: &Path) -> Result<()> {
    // Forced so the diff is never consulted.
    let args = BuildArgs::default().forced();
    debug!(path = %path.display(), "Validating pipeline");
    let parsed = parse_pipeline_file(path, &args, &ChangedPaths::new());
    match parsed.into_result() {
        Ok(graph) => {
            println!(
                "Configuration is valid ({} artifacts, {} applications)",
                graph.artifacts.len(),
                graph.applications.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
