//! Plan command.

use std::path::Path;

use anyhow::{Context, Result};
use pipewright_config::{GitDiff, PipelineGraph, parse_build};
use pipewright_core::{Application, Artifact, BuildArgs, Job};
use serde::Serialize;
use tracing::info;

/// JSON shape of a plan.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport<'a> {
    build_name: &'a str,
    repository: String,
    /// Images pushed by changed artifacts.
    images: Vec<String>,
    artifacts: Vec<&'a Artifact>,
    applications: Vec<&'a Application>,
}

impl<'a> PlanReport<'a> {
    fn new(graph: &'a PipelineGraph) -> Self {
        Self {
            build_name: &graph.build_name,
            repository: graph.resources.repository(),
            images: graph
                .artifacts
                .values()
                .filter(|artifact| artifact.changed)
                .filter_map(|artifact| artifact.image())
                .collect(),
            artifacts: graph.artifacts.values().map(AsRef::as_ref).collect(),
            applications: graph.applications.values().map(AsRef::as_ref).collect(),
        }
    }
}

pub fn run(args: &BuildArgs, repo_dir: &Path, json: bool) -> Result<()> {
    info!(
        path = %args.config_path.display(),
        previous_sha = ?args.previous_sha,
        force = args.force,
        "Planning pipeline"
    );
    let diff = GitDiff::new(repo_dir);
    let graph = match parse_build(args, &diff).into_result() {
        Ok(graph) => graph,
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        let report = serde_json::to_string_pretty(&PlanReport::new(&graph))
            .context("failed to serialize plan")?;
        println!("{}", report);
    } else {
        print!("{}", render_table(&graph));
    }
    Ok(())
}

fn render_table(graph: &PipelineGraph) -> String {
    let jobs: Vec<&dyn Job> = graph.jobs().collect();
    let width = jobs
        .iter()
        .map(|job| job.job_name().len())
        .max()
        .unwrap_or(0)
        .max("JOB".len());

    let mut out = format!("Pipeline: {}\n", graph.build_name);
    out.push_str(&format!("{:<width$}  {:<7}  NEEDS\n", "JOB", "CHANGED"));
    for job in jobs {
        let needs: Vec<String> = job.upstreams().iter().map(|u| u.job_name()).collect();
        let changed = if job.has_changed() { "yes" } else { "no" };
        out.push_str(&format!(
            "{:<width$}  {:<7}  {}\n",
            job.job_name(),
            changed,
            needs.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_config::parse_pipeline;
    use pipewright_core::ChangedPaths;

    const PIPELINE: &str = r#"
name: Demo
resources:
  artifactRepository: {host: us-docker.pkg.dev, name: images}
  kubernetesCluster: {name: main, location: us-central1}
  cloudProvider:
    type: gcp
    config: {project: demo, serviceAccount: sa, workloadIdentityProvider: wip}
artifacts:
  - id: api
    path: services/api
    type: app-go
applications:
  - id: api
    path: charts/api
    namespace: web
    type: helm
    artifacts: [api]
"#;

    fn graph(changed: &[&str]) -> PipelineGraph {
        let args = BuildArgs::new("demo", "abc123").with_previous_sha("def456");
        let diff: ChangedPaths = changed.iter().collect();
        parse_pipeline(PIPELINE, &args, &diff).into_result().unwrap()
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&graph(&["charts/api/values.yaml"]));
        assert_eq!(
            table,
            "Pipeline: Demo\n\
             JOB         CHANGED  NEEDS\n\
             build-api   no       \n\
             deploy-api  yes      build-api\n"
        );
    }

    #[test]
    fn test_json_report() {
        let graph = graph(&["services/api/main.go"]);
        let value = serde_json::to_value(PlanReport::new(&graph)).unwrap();
        assert_eq!(value["buildName"], "Demo");
        assert_eq!(value["repository"], "us-docker.pkg.dev/demo/images");
        assert_eq!(value["artifacts"][0]["changed"], true);
        assert_eq!(value["applications"][0]["upstreams"][0], "build-api");
        assert_eq!(value["applications"][0]["kind"], "helm");
        assert_eq!(
            value["images"],
            serde_json::json!(["us-docker.pkg.dev/demo/images/api:abc123"])
        );
    }

    #[test]
    fn test_report_lists_only_changed_artifact_images() {
        let unchanged = graph(&["charts/api/values.yaml"]);
        assert!(PlanReport::new(&unchanged).images.is_empty());

        let yaml = PIPELINE.replace("type: app-go", "type: lib-go");
        let args = BuildArgs::new("demo", "abc123").forced();
        let library = parse_pipeline(&yaml, &args, &ChangedPaths::new())
            .into_result()
            .unwrap();
        assert!(library.artifacts["api"].changed);
        assert!(PlanReport::new(&library).images.is_empty());
    }
}
