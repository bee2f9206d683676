//! Job graph resolution.
//!
//! [`GraphBuilder`] turns a decoded [`PipelineConfig`] into a
//! [`PipelineGraph`] in one pass:
//!
//! 1. every kind that is present is checked against its enumerated set,
//! 2. the whole document is validated into one error tree,
//! 3. artifacts are resolved in declaration order,
//! 4. applications are resolved in declaration order, wiring upstream jobs
//!    and secret bindings.
//!
//! The first failure ends the parse; callers never see a partial graph.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use pipewright_core::{
    AlwaysChanged, Application, ApplicationKind, Artifact, ArtifactKind, ArtifactRepository,
    BuildArgs, ChangeDetection, ChangeDetector, ChangedPaths, CloudProvider, CloudProviderKind,
    ClusterConfig, DiffChangeDetection, DiffSource, Enumerated, HelmSecretValue, InvalidEnumValue,
    Job, Resources, SecretProvider, SecretProviderKind, Upstream,
};
use tracing::{debug, info, warn};

use crate::document::{ApplicationSpec, ArtifactSpec, PipelineConfig, ResourcesSpec};
use crate::error::{ConfigError, ConfigResult, ConfigurationFailure};
use crate::validation::Validate;

/// A fully resolved pipeline.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    pub build_name: String,
    pub resources: Resources,
    /// Keyed by id, in declaration order.
    pub artifacts: IndexMap<String, Arc<Artifact>>,
    /// Keyed by id, in declaration order.
    pub applications: IndexMap<String, Arc<Application>>,
}

impl PipelineGraph {
    /// Every job, artifacts first, each after its upstreams.
    pub fn jobs(&self) -> impl Iterator<Item = &dyn Job> {
        self.artifacts
            .values()
            .map(|a| a.as_ref() as &dyn Job)
            .chain(self.applications.values().map(|a| a.as_ref() as &dyn Job))
    }

    /// Jobs that need to run for this revision.
    pub fn changed_jobs(&self) -> impl Iterator<Item = &dyn Job> {
        self.jobs().filter(|job| job.has_changed())
    }
}

/// Why a parse was rejected, with whatever build name was recovered.
#[derive(Debug)]
pub struct ParseFailure {
    pub build_name: Option<String>,
    pub error: ConfigError,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.build_name {
            Some(name) => write!(f, "{name}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of one parse.
#[derive(Debug)]
pub enum ParsedConfig {
    Success(PipelineGraph),
    Failure(ParseFailure),
}

impl ParsedConfig {
    fn failed(build_name: Option<String>, error: impl Into<ConfigError>) -> Self {
        ParsedConfig::Failure(ParseFailure {
            build_name,
            error: error.into(),
        })
    }

    pub fn build_name(&self) -> Option<&str> {
        match self {
            ParsedConfig::Success(graph) => Some(&graph.build_name),
            ParsedConfig::Failure(failure) => failure.build_name.as_deref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ParsedConfig::Success(_))
    }

    pub fn error(&self) -> Option<&ConfigError> {
        match self {
            ParsedConfig::Success(_) => None,
            ParsedConfig::Failure(failure) => Some(&failure.error),
        }
    }

    pub fn into_result(self) -> Result<PipelineGraph, ParseFailure> {
        match self {
            ParsedConfig::Success(graph) => Ok(graph),
            ParsedConfig::Failure(failure) => Err(failure),
        }
    }
}

/// Decode a YAML document and resolve it.
pub fn parse_pipeline(yaml: &str, args: &BuildArgs, diff: &dyn DiffSource) -> ParsedConfig {
    match PipelineConfig::from_yaml(yaml) {
        Ok(config) => GraphBuilder::new(args, diff).build(&config),
        Err(err) => ParsedConfig::failed(None, err),
    }
}

/// Read, decode and resolve the document at `path`.
pub fn parse_pipeline_file(
    path: impl AsRef<Path>,
    args: &BuildArgs,
    diff: &dyn DiffSource,
) -> ParsedConfig {
    match PipelineConfig::load(path) {
        Ok(config) => GraphBuilder::new(args, diff).build(&config),
        Err(err) => ParsedConfig::failed(None, err),
    }
}

/// Resolve the document named by `args.config_path`.
pub fn parse_build(args: &BuildArgs, diff: &dyn DiffSource) -> ParsedConfig {
    parse_pipeline_file(&args.config_path, args, diff)
}

/// Resolves a decoded document into a [`PipelineGraph`].
pub struct GraphBuilder<'a> {
    args: &'a BuildArgs,
    diff: &'a dyn DiffSource,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(args: &'a BuildArgs, diff: &'a dyn DiffSource) -> Self {
        Self { args, diff }
    }

    pub fn build(&self, config: &PipelineConfig) -> ParsedConfig {
        let build_name = Some(config.name.clone()).filter(|name| !name.is_empty());
        match self.try_build(config) {
            Ok(graph) => {
                info!(
                    build = %graph.build_name,
                    artifacts = graph.artifacts.len(),
                    applications = graph.applications.len(),
                    changed = graph.changed_jobs().count(),
                    "Pipeline graph resolved"
                );
                ParsedConfig::Success(graph)
            }
            Err(error) => {
                warn!(build = ?build_name, error = %error, "Pipeline configuration rejected");
                ParsedConfig::failed(build_name, error)
            }
        }
    }

    fn try_build(&self, config: &PipelineConfig) -> ConfigResult<PipelineGraph> {
        check_kinds(config)?;
        let errors = config.validate("");
        if errors.is_present() {
            return Err(errors.into());
        }

        let resources = resolve_resources(&config.resources)?;
        let artifact_kinds = config
            .artifacts
            .iter()
            .map(|spec| ArtifactKind::parse(text(&spec.kind)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigurationFailure::from)?;
        let application_kinds = config
            .applications
            .iter()
            .map(|spec| ApplicationKind::parse(text(&spec.kind)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigurationFailure::from)?;

        let detection = self.change_detection()?;
        let mut resolver = Resolver {
            args: self.args,
            resources: &resources,
            repository: resources.repository(),
            detection,
            artifacts: IndexMap::new(),
            applications: IndexMap::new(),
        };
        for (spec, kind) in config.artifacts.iter().zip(artifact_kinds) {
            resolver.resolve_artifact(spec, kind)?;
        }
        for (spec, kind) in config.applications.iter().zip(application_kinds) {
            resolver.resolve_application(spec, kind)?;
        }

        Ok(PipelineGraph {
            build_name: config.name.clone(),
            artifacts: resolver.artifacts,
            applications: resolver.applications,
            resources,
        })
    }

    /// Queries the diff once, unless every job runs anyway.
    fn change_detection(
        &self,
    ) -> Result<Option<(String, Arc<ChangedPaths>)>, ConfigurationFailure> {
        let Some(base) = self.args.diff_base() else {
            debug!(force = self.args.force, "Change detection disabled, every job runs");
            return Ok(None);
        };
        let changes = self.diff.changed_paths(base)?;
        debug!(base_ref = %base, changed_files = changes.len(), "Computed diff");
        Ok(Some((base.to_string(), Arc::new(changes))))
    }
}

/// Rejects the first kind literal outside its enumerated set: cloud provider,
/// then secret providers, artifacts and applications in declaration order.
/// Blank kinds are left to the validation pass.
fn check_kinds(config: &PipelineConfig) -> Result<(), ConfigurationFailure> {
    fn check<E: Enumerated>(kind: &Option<String>) -> Result<(), InvalidEnumValue> {
        match kind.as_deref().filter(|kind| !kind.trim().is_empty()) {
            Some(kind) => E::validate(kind),
            None => Ok(()),
        }
    }

    if let Some(cloud) = &config.resources.cloud_provider {
        check::<CloudProviderKind>(&cloud.kind)?;
    }
    for provider in config.resources.secret_providers.iter() {
        check::<SecretProviderKind>(&provider.kind)?;
    }
    for artifact in &config.artifacts {
        check::<ArtifactKind>(&artifact.kind)?;
    }
    for application in &config.applications {
        check::<ApplicationKind>(&application.kind)?;
    }
    Ok(())
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Types the `resources` block of a validated document.
fn resolve_resources(spec: &ResourcesSpec) -> Result<Resources, ConfigurationFailure> {
    let cloud = spec.cloud_provider.clone().unwrap_or_default();
    let cloud_provider = CloudProvider {
        kind: CloudProviderKind::parse(text(&cloud.kind))?,
        config: cloud.config.unwrap_or_default(),
    };

    let mut secret_providers = IndexMap::new();
    for provider in spec.secret_providers.iter() {
        let id = text(&provider.id).to_string();
        let resolved = SecretProvider {
            id: id.clone(),
            kind: SecretProviderKind::parse(text(&provider.kind))?,
            config: provider.config.clone().unwrap_or_default(),
            secret_names: provider.secret_names.clone().unwrap_or_default(),
        };
        secret_providers.insert(id, resolved);
    }

    let repository = spec.artifact_repository.clone().unwrap_or_default();
    let cluster = spec.kubernetes_cluster.clone().unwrap_or_default();
    Ok(Resources {
        artifact_repository: ArtifactRepository {
            host: repository.host.unwrap_or_default(),
            name: repository.name.unwrap_or_default(),
        },
        kubernetes_cluster: ClusterConfig {
            name: cluster.name.unwrap_or_default(),
            location: cluster.location.unwrap_or_default(),
        },
        cloud_provider,
        secret_providers,
    })
}

/// Mutable state of one resolution pass.
struct Resolver<'a> {
    args: &'a BuildArgs,
    resources: &'a Resources,
    repository: String,
    detection: Option<(String, Arc<ChangedPaths>)>,
    artifacts: IndexMap<String, Arc<Artifact>>,
    applications: IndexMap<String, Arc<Application>>,
}

impl Resolver<'_> {
    /// Detector watching `path`.
    fn detector(&self, path: &str) -> ChangeDetector {
        let detector = match &self.detection {
            None => ChangeDetector::Always(AlwaysChanged),
            Some((base, changes)) => {
                ChangeDetector::Diff(DiffChangeDetection::new(base.clone(), changes.clone()))
            }
        };
        detector.add_paths([path])
    }

    /// Look up an already resolved upstream and watch its path too.
    fn link<J: Job + 'static>(
        resolved: &IndexMap<String, Arc<J>>,
        job: &str,
        dependency: &str,
        detector: &mut ChangeDetector,
        upstreams: &mut Vec<Upstream>,
    ) -> Result<(), ConfigurationFailure> {
        let upstream = resolved
            .get(dependency)
            .ok_or_else(|| ConfigurationFailure::DependencyOrder {
                job: job.to_string(),
                dependency: dependency.to_string(),
            })?;
        *detector = detector.add_paths([upstream.path()]);
        upstreams.push(upstream.clone());
        Ok(())
    }

    fn resolve_artifact(
        &mut self,
        spec: &ArtifactSpec,
        kind: ArtifactKind,
    ) -> Result<(), ConfigurationFailure> {
        let id = text(&spec.id).to_string();
        let path = text(&spec.path).to_string();
        let mut detector = self.detector(&path);
        let mut upstreams = Vec::with_capacity(spec.dependencies.len());
        for dependency in &spec.dependencies {
            Self::link(&self.artifacts, &id, dependency, &mut detector, &mut upstreams)?;
        }

        let changed = detector.has_changed() || upstreams.iter().any(|u| u.has_changed());
        debug!(artifact = %id, changed, upstreams = upstreams.len(), "Resolved artifact");

        let artifact = Artifact {
            id: id.clone(),
            kind,
            path,
            project: self.args.project_id.clone(),
            repository: self.repository.clone(),
            host: self.resources.artifact_repository.host.clone(),
            current_sha: self.args.current_sha.clone(),
            cloud_provider: self.resources.cloud_provider.clone(),
            upstreams,
            changed,
        };
        self.artifacts.insert(id, Arc::new(artifact));
        Ok(())
    }

    fn resolve_application(
        &mut self,
        spec: &ApplicationSpec,
        kind: ApplicationKind,
    ) -> Result<(), ConfigurationFailure> {
        let id = text(&spec.id).to_string();
        let path = text(&spec.path).to_string();
        let mut detector = self.detector(&path);
        let mut upstreams = Vec::with_capacity(spec.artifacts.len() + spec.dependencies.len());
        for artifact in &spec.artifacts {
            Self::link(&self.artifacts, &id, artifact, &mut detector, &mut upstreams)?;
        }
        for dependency in &spec.dependencies {
            Self::link(&self.applications, &id, dependency, &mut detector, &mut upstreams)?;
        }

        let mut secrets: IndexMap<String, Vec<HelmSecretValue>> = IndexMap::new();
        for binding in &spec.secrets {
            let provider = text(&binding.provider);
            if !self.resources.secret_providers.contains_key(provider) {
                return Err(ConfigurationFailure::MissingSecretProvider {
                    application: id,
                    helm_key: text(&binding.helm_key).to_string(),
                    provider: provider.to_string(),
                });
            }
            secrets
                .entry(provider.to_string())
                .or_default()
                .push(HelmSecretValue {
                    helm_key: text(&binding.helm_key).to_string(),
                    secret_name: text(&binding.secret_name).to_string(),
                });
        }

        let changed = detector.has_changed() || upstreams.iter().any(|u| u.has_changed());
        debug!(
            application = %id,
            changed,
            upstreams = upstreams.len(),
            secret_providers = secrets.len(),
            "Resolved application"
        );

        let application = Application {
            id: id.clone(),
            kind,
            path,
            namespace: text(&spec.namespace).to_string(),
            project: self.args.project_id.clone(),
            repository: self.repository.clone(),
            current_sha: self.args.current_sha.clone(),
            values: spec.values.clone(),
            kubernetes_cluster: self.resources.kubernetes_cluster.clone(),
            cloud_provider: self.resources.cloud_provider.clone(),
            secrets,
            secret_providers: self.resources.secret_providers.clone(),
            upstreams,
            changed,
        };
        self.applications.insert(id, Arc::new(application));
        Ok(())
    }
}
