//! pipewright CLI tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "Validate pipeline documents and plan which jobs run", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, env = "PIPEWRIGHT_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a pipeline configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "pipeline.yaml")]
        path: PathBuf,
    },
    /// Resolve the job graph and show which jobs run for a revision
    Plan {
        /// Path to the configuration file
        #[arg(default_value = "pipeline.yaml")]
        path: PathBuf,
        /// Cloud project the pipeline runs in
        #[arg(long, env = "PIPEWRIGHT_PROJECT")]
        project: String,
        /// Revision being built
        #[arg(long, env = "PIPEWRIGHT_CURRENT_SHA")]
        current_sha: String,
        /// Revision the last successful run built
        #[arg(long, env = "PIPEWRIGHT_PREVIOUS_SHA")]
        previous_sha: Option<String>,
        /// Run every job regardless of the diff
        #[arg(long, env = "PIPEWRIGHT_FORCE")]
        force: bool,
        /// Checkout to diff in
        #[arg(long, env = "PIPEWRIGHT_REPO_DIR", default_value = ".")]
        repo_dir: PathBuf,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Plan {
            path,
            project,
            current_sha,
            previous_sha,
            force,
            repo_dir,
            json,
        } => {
            let mut args =
                pipewright_core::BuildArgs::new(project, current_sha).with_config_path(path);
            args.previous_sha = previous_sha;
            args.force = force;
            commands::plan::run(&args, &repo_dir, json)?;
        }
    }

    Ok(())
}
