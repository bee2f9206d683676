//! Shared infrastructure a pipeline builds and deploys against.

use indexmap::IndexMap;
use serde::Serialize;

use crate::config_map::ConfigMap;
use crate::kind::{CloudProviderKind, SecretProviderKind};

/// Kubernetes cluster applications are deployed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterConfig {
    pub name: String,
    pub location: String,
}

/// Container registry artifacts are pushed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactRepository {
    pub host: String,
    pub name: String,
}

impl ArtifactRepository {
    /// Fully-qualified repository, `host/project/name`.
    ///
    /// The project segment is left out when the cloud provider has none.
    pub fn qualified(&self, project: Option<&str>) -> String {
        [Some(self.host.as_str()), project, Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudProvider {
    pub kind: CloudProviderKind,
    pub config: ConfigMap,
}

impl CloudProvider {
    pub fn project(&self) -> Option<&str> {
        self.config.get("project")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretProvider {
    pub id: String,
    pub kind: SecretProviderKind,
    pub config: ConfigMap,
    pub secret_names: Vec<String>,
}

/// Resolved `resources` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub artifact_repository: ArtifactRepository,
    pub kubernetes_cluster: ClusterConfig,
    pub cloud_provider: CloudProvider,
    /// Keyed by provider id, in declaration order.
    pub secret_providers: IndexMap<String, SecretProvider>,
}

impl Resources {
    pub fn repository(&self) -> String {
        self.artifact_repository
            .qualified(self.cloud_provider.project())
    }
}
