//! The pipeline document as written by users.
//!
//! Everything here mirrors the YAML shape one to one. Fields are optional so
//! that a missing key can be reported by the validation pass instead of
//! failing the decode, and kinds stay plain strings until they are checked
//! against their enumerated sets.

use std::fmt;
use std::path::Path;

use pipewright_core::{ConfigMap, HelmValue};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigurationFailure;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resources: ResourcesSpec,
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
    #[serde(default)]
    pub applications: Vec<ApplicationSpec>,
}

impl PipelineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationFailure> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationFailure> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigurationFailure::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    pub artifact_repository: Option<ArtifactRepositorySpec>,
    pub kubernetes_cluster: Option<ClusterSpec>,
    pub cloud_provider: Option<CloudProviderSpec>,
    #[serde(default)]
    pub secret_providers: SecretProviderSpecs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactRepositorySpec {
    pub host: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterSpec {
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudProviderSpec {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub config: Option<ConfigMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretProviderSpec {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub config: Option<ConfigMap>,
    pub secret_names: Option<Vec<String>>,
}

impl SecretProviderSpec {
    /// Whether `secret_name` is listed under `secretNames`.
    pub fn supplies(&self, secret_name: &str) -> bool {
        self.secret_names
            .iter()
            .flatten()
            .any(|name| name == secret_name)
    }
}

/// Secret providers in declaration order.
///
/// Accepts either a mapping keyed by provider id or a list whose entries
/// carry their own `id`.
#[derive(Debug, Clone, Default)]
pub struct SecretProviderSpecs(pub Vec<SecretProviderSpec>);

impl SecretProviderSpecs {
    pub fn iter(&self) -> std::slice::Iter<'_, SecretProviderSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First provider declared under `id`.
    pub fn get(&self, id: &str) -> Option<&SecretProviderSpec> {
        self.0.iter().find(|spec| spec.id.as_deref() == Some(id))
    }
}

impl<'de> Deserialize<'de> for SecretProviderSpecs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecsVisitor;

        impl<'de> Visitor<'de> for SpecsVisitor {
            type Value = SecretProviderSpecs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of secret providers or a map keyed by provider id")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SecretProviderSpecs::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SecretProviderSpecs::default())
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut specs = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(spec) = seq.next_element()? {
                    specs.push(spec);
                }
                Ok(SecretProviderSpecs(specs))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut specs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, mut spec)) = map.next_entry::<String, SecretProviderSpec>()? {
                    spec.id.get_or_insert(id);
                    specs.push(spec);
                }
                Ok(SecretProviderSpecs(specs))
            }
        }

        deserializer.deserialize_any(SpecsVisitor)
    }
}

impl From<Vec<SecretProviderSpec>> for SecretProviderSpecs {
    fn from(specs: Vec<SecretProviderSpec>) -> Self {
        Self(specs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactSpec {
    pub id: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationSpec {
    pub id: Option<String>,
    pub path: Option<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub values: Vec<HelmValue>,
    #[serde(default)]
    pub secrets: Vec<SecretBindingSpec>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBindingSpec {
    pub helm_key: Option<String>,
    pub secret_name: Option<String>,
    pub provider: Option<String>,
}
