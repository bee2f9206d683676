//! Field-level checks for every section of the pipeline document.
//!
//! Kinds that are present but not part of their enumerated set are skipped
//! here; the graph builder rejects them separately.

use std::collections::HashSet;

use pipewright_core::{
    ApplicationKind, CloudProviderKind, ConfigMap, Enumerated, SecretProviderKind,
};

use crate::document::{
    ApplicationSpec, ArtifactRepositorySpec, ArtifactSpec, CloudProviderSpec, ClusterSpec,
    PipelineConfig, ResourcesSpec, SecretBindingSpec, SecretProviderSpec, SecretProviderSpecs,
};
use crate::validation::{FieldError, Validate, ValidationErrors};

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn require(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if is_blank(value) {
        errors.put(field, FieldError::MissingRequiredField);
    }
}

fn require_section<T: Validate>(errors: &mut ValidationErrors, field: &str, section: Option<&T>) {
    match section {
        Some(section) => {
            errors.put_child(section.validate(field));
        }
        None => {
            errors.put(field, FieldError::MissingRequiredField);
        }
    }
}

/// Key a list entry is reported under: its id when it has one.
fn entry_key(id: Option<&str>, index: usize) -> String {
    match id {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => index.to_string(),
    }
}

/// Reports each reference in `ids` that is not in `known`.
fn reference_errors(
    name: &str,
    ids: &[String],
    collection: &'static str,
    known: &HashSet<&str>,
    own_id: Option<&str>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new(name);
    for (index, id) in ids.iter().enumerate() {
        if own_id == Some(id.as_str()) {
            errors.put(index.to_string(), FieldError::SelfReference(id.clone()));
        } else if !known.contains(id.as_str()) {
            errors.put(
                index.to_string(),
                FieldError::UnknownReference {
                    collection,
                    id: id.clone(),
                },
            );
        }
    }
    errors
}

fn known_ids<'a, I>(ids: I) -> HashSet<&'a str>
where
    I: IntoIterator<Item = Option<&'a String>>,
{
    ids.into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|id| !id.trim().is_empty())
        .collect()
}

impl Validate for ArtifactRepositorySpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "host", self.host.as_deref());
        require(&mut errors, "name", self.name.as_deref());
        errors
    }
}

impl Validate for ClusterSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "name", self.name.as_deref());
        require(&mut errors, "location", self.location.as_deref());
        errors
    }
}

impl Validate for CloudProviderSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        if is_blank(self.kind.as_deref()) {
            errors.put("type", FieldError::MissingRequiredField);
            return errors;
        }

        let Ok(kind) = CloudProviderKind::parse(self.kind.as_deref().unwrap_or_default()) else {
            return errors;
        };
        let empty = ConfigMap::new();
        let config = self.config.as_ref().unwrap_or(&empty);
        let config_errors = errors.child("config");
        for key in kind.required_config() {
            if !config.contains_key(key) {
                config_errors.put(*key, FieldError::CloudProviderMissingField(kind));
            }
        }
        errors
    }
}

impl Validate for SecretProviderSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "id", self.id.as_deref());
        if self.secret_names.as_ref().is_none_or(Vec::is_empty) {
            errors.put("secretNames", FieldError::MissingRequiredField);
        }
        if is_blank(self.kind.as_deref()) {
            errors.put("type", FieldError::MissingRequiredField);
            return errors;
        }

        let Ok(kind) = SecretProviderKind::parse(self.kind.as_deref().unwrap_or_default()) else {
            return errors;
        };
        let required = kind.required_config();
        if required.is_empty() {
            return errors;
        }
        match &self.config {
            None => {
                errors.put("config", FieldError::MissingRequiredField);
            }
            Some(config) => {
                let config_errors = errors.child("config");
                for key in required {
                    if !config.contains_key(key) {
                        config_errors.put(*key, FieldError::SecretProviderMissingField(kind));
                    }
                }
            }
        }
        errors
    }
}

impl Validate for SecretProviderSpecs {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        let mut seen = HashSet::new();
        for (index, spec) in self.iter().enumerate() {
            let mut entry = spec.validate(&index.to_string());
            if let Some(id) = spec.id.as_deref().filter(|id| !id.trim().is_empty()) {
                if !seen.insert(id) {
                    entry.put("id", FieldError::DuplicateId(id.to_string()));
                }
            }
            errors.put_child(entry);
        }
        errors
    }
}

impl Validate for ResourcesSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require_section(&mut errors, "cloudProvider", self.cloud_provider.as_ref());
        require_section(
            &mut errors,
            "kubernetesCluster",
            self.kubernetes_cluster.as_ref(),
        );
        require_section(
            &mut errors,
            "artifactRepository",
            self.artifact_repository.as_ref(),
        );
        errors.put_child(self.secret_providers.validate("secretProviders"));
        errors
    }
}

impl Validate for ArtifactSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "id", self.id.as_deref());
        require(&mut errors, "path", self.path.as_deref());
        require(&mut errors, "type", self.kind.as_deref());
        errors
    }
}

impl Validate for ApplicationSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "id", self.id.as_deref());
        require(&mut errors, "path", self.path.as_deref());
        require(&mut errors, "type", self.kind.as_deref());

        let is_helm = self
            .kind
            .as_deref()
            .is_some_and(|kind| ApplicationKind::parse(kind) == Ok(ApplicationKind::Helm));
        if is_helm {
            require(&mut errors, "namespace", self.namespace.as_deref());
        }
        errors
    }
}

impl Validate for SecretBindingSpec {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        require(&mut errors, "helmKey", self.helm_key.as_deref());
        require(&mut errors, "secretName", self.secret_name.as_deref());
        require(&mut errors, "provider", self.provider.as_deref());
        errors
    }
}

impl PipelineConfig {
    fn validate_artifacts(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new("artifacts");
        let artifact_ids = known_ids(self.artifacts.iter().map(|a| a.id.as_ref()));
        let mut seen = HashSet::new();

        for (index, spec) in self.artifacts.iter().enumerate() {
            let id = spec.id.as_deref();
            let mut entry = spec.validate(&entry_key(id, index));
            if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
                if !seen.insert(id) {
                    entry.put("id", FieldError::DuplicateId(id.to_string()));
                }
            }
            entry.put_child(reference_errors(
                "dependencies",
                &spec.dependencies,
                "artifact",
                &artifact_ids,
                id,
            ));
            errors.put_child(entry);
        }
        errors
    }

    fn validate_applications(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new("applications");
        let artifact_ids = known_ids(self.artifacts.iter().map(|a| a.id.as_ref()));
        let application_ids = known_ids(self.applications.iter().map(|a| a.id.as_ref()));
        let mut seen = HashSet::new();

        for (index, spec) in self.applications.iter().enumerate() {
            let id = spec.id.as_deref();
            let mut entry = spec.validate(&entry_key(id, index));
            if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
                if !seen.insert(id) {
                    entry.put("id", FieldError::DuplicateId(id.to_string()));
                }
            }
            entry.put_child(reference_errors(
                "artifacts",
                &spec.artifacts,
                "artifact",
                &artifact_ids,
                None,
            ));
            entry.put_child(reference_errors(
                "dependencies",
                &spec.dependencies,
                "application",
                &application_ids,
                id,
            ));
            entry.put_child(self.validate_secret_bindings(spec));
            errors.put_child(entry);
        }
        errors
    }

    /// Bindings missing a field are reported by index; a secret the provider
    /// does not declare is reported under the binding's helm key.
    ///
    /// Bindings to an undeclared provider are left to the graph builder.
    fn validate_secret_bindings(&self, spec: &ApplicationSpec) -> ValidationErrors {
        let mut errors = ValidationErrors::new("secrets");
        for (index, binding) in spec.secrets.iter().enumerate() {
            let entry = binding.validate(&index.to_string());
            if entry.is_present() {
                errors.put_child(entry);
                continue;
            }

            let (Some(helm_key), Some(secret_name), Some(provider_id)) = (
                binding.helm_key.as_deref(),
                binding.secret_name.as_deref(),
                binding.provider.as_deref(),
            ) else {
                continue;
            };
            let Some(provider) = self.resources.secret_providers.get(provider_id) else {
                continue;
            };
            // A provider without secretNames is already reported on its own.
            if provider.secret_names.is_some() && !provider.supplies(secret_name) {
                errors.put(
                    helm_key,
                    FieldError::SecretNotConfigured {
                        secret: secret_name.to_string(),
                        provider: provider_id.to_string(),
                    },
                );
            }
        }
        errors
    }
}

impl Validate for PipelineConfig {
    fn validate(&self, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new(path);
        errors.put_child(self.resources.validate("resources"));
        errors.put_child(self.validate_artifacts());
        errors.put_child(self.validate_applications());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcp_cloud_provider(config: ConfigMap) -> CloudProviderSpec {
        CloudProviderSpec {
            kind: Some("gcp".to_string()),
            config: Some(config),
        }
    }

    fn valid_resources() -> ResourcesSpec {
        ResourcesSpec {
            artifact_repository: Some(ArtifactRepositorySpec {
                host: Some("us".to_string()),
                name: Some("repo".to_string()),
            }),
            kubernetes_cluster: Some(ClusterSpec {
                name: Some("cluster".to_string()),
                location: Some("new zealand".to_string()),
            }),
            cloud_provider: Some(gcp_cloud_provider(
                ConfigMap::new()
                    .with("serviceAccount", "yeehaw@yahoo.com")
                    .with("workloadIdentityProvider", "it me"),
            )),
            secret_providers: vec![
                SecretProviderSpec {
                    id: Some("github".to_string()),
                    kind: Some("github-actions".to_string()),
                    config: None,
                    secret_names: Some(vec!["yeehaw".to_string()]),
                },
                SecretProviderSpec {
                    id: Some("gcp-cool-proj".to_string()),
                    kind: Some("gcp".to_string()),
                    config: Some(ConfigMap::new().with("project", "cool-proj")),
                    secret_names: Some(vec!["hoowee".to_string()]),
                },
            ]
            .into(),
        }
    }

    #[test]
    fn test_complete_cloud_provider_is_valid() {
        let cp = gcp_cloud_provider(
            ConfigMap::new()
                .with("serviceAccount", "yeehaw@yahoo.com")
                .with("workloadIdentityProvider", "it me"),
        );
        let errors = cp.validate("cloudProvider");
        assert!(!errors.is_present());
        assert_eq!(errors, ValidationErrors::new("cloudProvider"));
    }

    #[test]
    fn test_cloud_provider_missing_both_keys() {
        let errors = gcp_cloud_provider(ConfigMap::new()).validate("cloudProvider");
        let missing = FieldError::CloudProviderMissingField(CloudProviderKind::Gcp);
        assert_eq!(
            errors,
            ValidationErrors::new("cloudProvider").with_child(
                ValidationErrors::new("config")
                    .with("serviceAccount", missing.clone())
                    .with("workloadIdentityProvider", missing),
            )
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_cloud_provider_missing_one_key() {
        let errors = gcp_cloud_provider(ConfigMap::new().with("serviceAccount", "sa"))
            .validate("cloudProvider");
        assert_eq!(errors.len(), 1);
        assert!(
            errors
                .lookup(&["config", "workloadIdentityProvider"])
                .is_some()
        );
    }

    #[test]
    fn test_cloud_provider_missing_service_account() {
        let errors =
            gcp_cloud_provider(ConfigMap::new().with("workloadIdentityProvider", "it me"))
                .validate("cloudProvider");
        assert_eq!(
            errors,
            ValidationErrors::new("cloudProvider").with_child(ValidationErrors::new("config").with(
                "serviceAccount",
                FieldError::CloudProviderMissingField(CloudProviderKind::Gcp),
            ))
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_cloud_provider_without_config_reports_keys() {
        let cp = CloudProviderSpec {
            kind: Some("gcp".to_string()),
            config: None,
        };
        assert_eq!(cp.validate("cloudProvider").len(), 2);
    }

    #[test]
    fn test_unknown_cloud_provider_kind_is_left_alone() {
        let cp = CloudProviderSpec {
            kind: Some("azure".to_string()),
            config: None,
        };
        assert!(!cp.validate("cloudProvider").is_present());
    }

    #[test]
    fn test_valid_resources() {
        assert!(!valid_resources().validate("resources").is_present());
    }

    #[test]
    fn test_secret_provider_errors_by_index() {
        let mut resources = valid_resources();
        resources.secret_providers = vec![
            SecretProviderSpec {
                kind: Some("github-actions".to_string()),
                ..Default::default()
            },
            SecretProviderSpec {
                id: Some("gcp-proj".to_string()),
                kind: Some("gcp".to_string()),
                config: Some(ConfigMap::new().with("region", "us")),
                secret_names: None,
            },
            SecretProviderSpec {
                id: Some("no-type".to_string()),
                secret_names: Some(vec!["x".to_string()]),
                ..Default::default()
            },
            SecretProviderSpec {
                id: Some("gcp-no-config".to_string()),
                kind: Some("gcp".to_string()),
                ..Default::default()
            },
        ]
        .into();

        let missing = FieldError::MissingRequiredField;
        let expected = ValidationErrors::new("resources").with_child(
            ValidationErrors::new("secretProviders")
                .with_child(
                    ValidationErrors::new("0")
                        .with("id", missing.clone())
                        .with("secretNames", missing.clone()),
                )
                .with_child(
                    ValidationErrors::new("1")
                        .with("secretNames", missing.clone())
                        .with_child(ValidationErrors::new("config").with(
                            "project",
                            FieldError::SecretProviderMissingField(SecretProviderKind::Gcp),
                        )),
                )
                .with_child(ValidationErrors::new("2").with("type", missing.clone()))
                .with_child(
                    ValidationErrors::new("3")
                        .with("secretNames", missing.clone())
                        .with("config", missing),
                ),
        );
        assert_eq!(resources.validate("resources"), expected);
    }

    #[test]
    fn test_duplicate_secret_provider_id() {
        let mut resources = valid_resources();
        let mut providers = resources.secret_providers.0.clone();
        providers.push(providers[0].clone());
        resources.secret_providers = providers.into();

        let errors = resources.validate("resources");
        assert_eq!(
            errors.lookup(&["secretProviders", "2", "id"]),
            Some(&FieldError::DuplicateId("github".to_string()))
        );
    }

    #[test]
    fn test_missing_sections() {
        let resources = ResourcesSpec {
            artifact_repository: Some(ArtifactRepositorySpec {
                host: None,
                name: Some("repo".to_string()),
            }),
            ..Default::default()
        };
        let errors = resources.validate("resources");
        let missing = Some(&FieldError::MissingRequiredField);
        assert_eq!(errors.lookup(&["cloudProvider"]), missing);
        assert_eq!(errors.lookup(&["kubernetesCluster"]), missing);
        assert_eq!(errors.lookup(&["artifactRepository", "host"]), missing);
        assert_eq!(errors.len(), 3);
    }

    fn artifact(id: &str, deps: &[&str]) -> ArtifactSpec {
        ArtifactSpec {
            id: Some(id.to_string()),
            path: Some(id.to_string()),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            kind: Some("app".to_string()),
        }
    }

    #[test]
    fn test_artifact_references() {
        let config = PipelineConfig {
            resources: valid_resources(),
            artifacts: vec![
                artifact("lib", &[]),
                artifact("api", &["lib", "ghost"]),
                artifact("loop", &["loop"]),
                artifact("lib", &[]),
            ],
            ..Default::default()
        };

        let errors = config.validate("");
        assert_eq!(
            errors.lookup(&["artifacts", "api", "dependencies", "1"]),
            Some(&FieldError::UnknownReference {
                collection: "artifact",
                id: "ghost".to_string(),
            })
        );
        assert_eq!(
            errors.lookup(&["artifacts", "loop", "dependencies", "0"]),
            Some(&FieldError::SelfReference("loop".to_string()))
        );
        assert_eq!(
            errors.lookup(&["artifacts", "lib", "id"]),
            Some(&FieldError::DuplicateId("lib".to_string()))
        );
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_entries_without_id_use_index() {
        let config = PipelineConfig {
            resources: valid_resources(),
            artifacts: vec![ArtifactSpec::default()],
            ..Default::default()
        };
        let errors = config.validate("");
        let entry = errors.get_child("artifacts").unwrap().get_child("0").unwrap();
        assert_eq!(entry.len(), 3);
    }

    #[test]
    fn test_secret_not_configured() {
        let config = PipelineConfig {
            resources: valid_resources(),
            applications: vec![ApplicationSpec {
                id: Some("db".to_string()),
                path: Some("charts/db".to_string()),
                namespace: Some("data".to_string()),
                kind: Some("helm".to_string()),
                secrets: vec![
                    SecretBindingSpec {
                        helm_key: Some("postgresql.auth.postgresPassword".to_string()),
                        secret_name: Some("beepboop".to_string()),
                        provider: Some("gcp-cool-proj".to_string()),
                    },
                    SecretBindingSpec {
                        helm_key: Some("token".to_string()),
                        secret_name: Some("whatever".to_string()),
                        provider: Some("vault".to_string()),
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let expected = ValidationErrors::new("").with_child(
            ValidationErrors::new("applications").with_child(
                ValidationErrors::new("db").with_child(ValidationErrors::new("secrets").with(
                    "postgresql.auth.postgresPassword",
                    FieldError::SecretNotConfigured {
                        secret: "beepboop".to_string(),
                        provider: "gcp-cool-proj".to_string(),
                    },
                )),
            ),
        );
        assert_eq!(config.validate(""), expected);
    }

    #[test]
    fn test_namespace_required_for_helm_only() {
        let mut app = ApplicationSpec {
            id: Some("infra".to_string()),
            path: Some("terraform".to_string()),
            kind: Some("terraform".to_string()),
            ..Default::default()
        };
        assert!(!app.validate("infra").is_present());

        app.kind = Some("helm".to_string());
        assert_eq!(
            app.validate("infra").field("namespace"),
            Some(&FieldError::MissingRequiredField)
        );
    }

    #[test]
    fn test_provider_without_secret_names_reported_once() {
        let mut resources = valid_resources();
        resources.secret_providers.0[0].secret_names = None;
        let config = PipelineConfig {
            resources,
            applications: vec![ApplicationSpec {
                id: Some("api".to_string()),
                path: Some("charts/api".to_string()),
                namespace: Some("web".to_string()),
                kind: Some("helm".to_string()),
                secrets: vec![SecretBindingSpec {
                    helm_key: Some("github.token".to_string()),
                    secret_name: Some("yeehaw".to_string()),
                    provider: Some("github".to_string()),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let flat: Vec<_> = config
            .validate("")
            .flatten()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(flat, vec!["resources.secretProviders.0.secretNames"]);
    }

    #[test]
    fn test_application_references() {
        let config = PipelineConfig {
            resources: valid_resources(),
            artifacts: vec![artifact("api", &[])],
            applications: vec![ApplicationSpec {
                id: Some("web".to_string()),
                path: Some("charts/web".to_string()),
                namespace: Some("web".to_string()),
                kind: Some("helm".to_string()),
                artifacts: vec!["api".to_string(), "frontend".to_string()],
                dependencies: vec!["db".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let errors = config.validate("");
        let flat: Vec<_> = errors.flatten().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            flat,
            vec![
                "applications.web.artifacts.1",
                "applications.web.dependencies.0"
            ]
        );
    }
}
