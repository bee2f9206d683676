//! Resolved pipeline jobs.
//!
//! Artifacts are built, applications are deployed. Both are [`Job`]s: they
//! have an id, a watched path, a changed flag and the upstream jobs they
//! depend on. Upstream references are shared pointers into the resolved
//! graph, so a job keeps its upstreams alive for as long as it lives.

use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::kind::{ApplicationKind, ArtifactKind};
use crate::resources::{CloudProvider, ClusterConfig, SecretProvider};

/// A job another job depends on.
pub type Upstream = Arc<dyn Job>;

/// Which half of the workflow a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    #[display("build")]
    Build,
    #[display("deploy")]
    Deploy,
}

/// Common view over artifacts and applications.
pub trait Job: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    /// Directory the job's sources live in.
    fn path(&self) -> &str;

    fn stage(&self) -> JobStage;

    /// Whether the job needs to run for the current revision.
    fn has_changed(&self) -> bool;

    fn upstreams(&self) -> &[Upstream];

    fn has_dependencies(&self) -> bool {
        !self.upstreams().is_empty()
    }

    /// Workflow job name, unique across both collections.
    fn job_name(&self) -> String {
        format!("{}-{}", self.stage(), self.id())
    }
}

fn upstream_names<S: Serializer>(
    upstreams: &[Upstream],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(upstreams.iter().map(|job| job.job_name()))
}

/// A helm value passed through to the chart unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmValue {
    pub key: String,
    pub value: String,
}

/// A chart value filled from a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmSecretValue {
    pub helm_key: String,
    pub secret_name: String,
}

/// A resolved build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    pub path: String,
    pub project: String,
    /// Fully-qualified repository the image is pushed to.
    pub repository: String,
    pub host: String,
    pub current_sha: String,
    pub cloud_provider: CloudProvider,
    #[serde(serialize_with = "upstream_names")]
    pub upstreams: Vec<Upstream>,
    pub changed: bool,
}

impl Artifact {
    /// Image reference for the current revision. Libraries have none.
    pub fn image(&self) -> Option<String> {
        if self.kind.is_library() {
            return None;
        }
        Some(format!("{}/{}:{}", self.repository, self.id, self.current_sha))
    }
}

impl Job for Artifact {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn stage(&self) -> JobStage {
        JobStage::Build
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }
}

/// A resolved deployment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub kind: ApplicationKind,
    pub path: String,
    pub namespace: String,
    pub project: String,
    pub repository: String,
    pub current_sha: String,
    pub values: Vec<HelmValue>,
    pub kubernetes_cluster: ClusterConfig,
    pub cloud_provider: CloudProvider,
    /// Secret bindings grouped by provider id, in declaration order.
    pub secrets: IndexMap<String, Vec<HelmSecretValue>>,
    pub secret_providers: IndexMap<String, SecretProvider>,
    #[serde(serialize_with = "upstream_names")]
    pub upstreams: Vec<Upstream>,
    pub changed: bool,
}

impl Job for Application {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn stage(&self) -> JobStage {
        JobStage::Deploy
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }
}
