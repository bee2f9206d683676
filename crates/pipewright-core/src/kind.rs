//! Closed sets of kind literals accepted in a pipeline document.
//!
//! Every kind is a plain enum whose accepted literals are fixed at compile
//! time. [`Enumerated::parse`] is the single validation primitive: it either
//! returns the variant or an [`InvalidEnumValue`] naming the offending
//! literal.

use derive_more::Display;
use serde::Serialize;
use thiserror::Error;

/// A literal that is not part of an enumerated kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}'")]
pub struct InvalidEnumValue {
    /// Human-readable name of the enumerated type.
    pub kind: &'static str,
    /// The rejected literal.
    pub value: String,
}

/// A closed set of string literals.
pub trait Enumerated: Sized + Copy + 'static {
    /// Name used in error messages.
    const NAME: &'static str;

    /// Every accepted variant, in declaration order.
    const VARIANTS: &'static [Self];

    /// The literal this variant is written as.
    fn as_str(&self) -> &'static str;

    /// Build the error reported for a literal outside the set.
    fn invalid_enum_value(value: &str) -> InvalidEnumValue {
        InvalidEnumValue {
            kind: Self::NAME,
            value: value.to_string(),
        }
    }

    /// Parse a literal, rejecting anything outside the set.
    fn parse(value: &str) -> Result<Self, InvalidEnumValue> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.as_str() == value)
            .ok_or_else(|| Self::invalid_enum_value(value))
    }

    /// Validate a literal without keeping the parsed variant.
    fn validate(value: &str) -> Result<(), InvalidEnumValue> {
        Self::parse(value).map(|_| ())
    }
}

macro_rules! impl_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl std::str::FromStr for $ty {
                type Err = InvalidEnumValue;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    <$ty as Enumerated>::parse(s)
                }
            }
        )*
    };
}

/// Cloud provider hosting the cluster and the artifact repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum CloudProviderKind {
    #[display("gcp")]
    Gcp,
}

impl CloudProviderKind {
    /// Config keys a provider of this kind cannot work without.
    pub fn required_config(&self) -> &'static [&'static str] {
        match self {
            CloudProviderKind::Gcp => &["serviceAccount", "workloadIdentityProvider"],
        }
    }
}

impl Enumerated for CloudProviderKind {
    const NAME: &'static str = "cloud provider type";
    const VARIANTS: &'static [Self] = &[CloudProviderKind::Gcp];

    fn as_str(&self) -> &'static str {
        match self {
            CloudProviderKind::Gcp => "gcp",
        }
    }
}

/// Where deployable secrets are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum SecretProviderKind {
    #[display("gcp")]
    Gcp,
    #[display("github-actions")]
    GithubActions,
}

impl SecretProviderKind {
    /// Config keys a provider of this kind cannot work without.
    pub fn required_config(&self) -> &'static [&'static str] {
        match self {
            SecretProviderKind::Gcp => &["project"],
            SecretProviderKind::GithubActions => &[],
        }
    }
}

impl Enumerated for SecretProviderKind {
    const NAME: &'static str = "secret provider type";
    const VARIANTS: &'static [Self] =
        &[SecretProviderKind::Gcp, SecretProviderKind::GithubActions];

    fn as_str(&self) -> &'static str {
        match self {
            SecretProviderKind::Gcp => "gcp",
            SecretProviderKind::GithubActions => "github-actions",
        }
    }
}

/// What an artifact build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    #[display("lib-go")]
    LibGo,
    #[display("app-go")]
    AppGo,
    #[display("app")]
    App,
    #[display("lib")]
    Lib,
}

impl ArtifactKind {
    /// Libraries are built and tested but never pushed as images.
    pub fn is_library(&self) -> bool {
        matches!(self, ArtifactKind::LibGo | ArtifactKind::Lib)
    }
}

impl Enumerated for ArtifactKind {
    const NAME: &'static str = "artifact type";
    const VARIANTS: &'static [Self] = &[
        ArtifactKind::LibGo,
        ArtifactKind::AppGo,
        ArtifactKind::App,
        ArtifactKind::Lib,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::LibGo => "lib-go",
            ArtifactKind::AppGo => "app-go",
            ArtifactKind::App => "app",
            ArtifactKind::Lib => "lib",
        }
    }
}

/// How an application is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationKind {
    #[display("helm")]
    Helm,
    #[display("terraform")]
    Terraform,
}

impl Enumerated for ApplicationKind {
    const NAME: &'static str = "application type";
    const VARIANTS: &'static [Self] = &[ApplicationKind::Helm, ApplicationKind::Terraform];

    fn as_str(&self) -> &'static str {
        match self {
            ApplicationKind::Helm => "helm",
            ApplicationKind::Terraform => "terraform",
        }
    }
}

impl_from_str!(
    CloudProviderKind,
    SecretProviderKind,
    ArtifactKind,
    ApplicationKind,
);
