//! Path-addressed accumulator for field-level configuration errors.
//!
//! Every validatable section of the document produces a [`ValidationErrors`]
//! node named after the key it lives under. Field errors sit directly on the
//! node; nested objects, list entries (by index) and map entries (by key)
//! become child nodes. Parents attach children with
//! [`ValidationErrors::put_child`], so a whole document report is a single
//! tree whose rendering points at every offending field.

use std::fmt;

use indexmap::IndexMap;
use pipewright_core::{CloudProviderKind, SecretProviderKind};
use thiserror::Error;

/// A problem with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing required field")]
    MissingRequiredField,

    #[error("required for cloud provider of type {0}")]
    CloudProviderMissingField(CloudProviderKind),

    #[error("required for secret provider of type {0}")]
    SecretProviderMissingField(SecretProviderKind),

    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    #[error("unknown {collection} '{id}'")]
    UnknownReference { collection: &'static str, id: String },

    #[error("'{0}' cannot depend on itself")]
    SelfReference(String),

    #[error("secret '{secret}' not configured in secret provider '{provider}'")]
    SecretNotConfigured { secret: String, provider: String },
}

/// Anything that can check itself and report under a path segment.
pub trait Validate {
    fn validate(&self, path: &str) -> ValidationErrors;
}

/// One node of the error tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    name: String,
    fields: IndexMap<String, FieldError>,
    children: IndexMap<String, ValidationErrors>,
}

impl ValidationErrors {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record an error for `field` on this node.
    pub fn put(&mut self, field: impl Into<String>, error: FieldError) -> &mut Self {
        self.fields.insert(field.into(), error);
        self
    }

    /// Child node for `name`, created on first use.
    pub fn child(&mut self, name: impl Into<String>) -> &mut ValidationErrors {
        let name = name.into();
        self.children
            .entry(name.clone())
            .or_insert_with(|| ValidationErrors::new(name))
    }

    /// Attach an independently built subtree under its own name.
    ///
    /// Subtrees without errors are dropped. A subtree whose name is already
    /// taken is merged into the existing child.
    pub fn put_child(&mut self, child: ValidationErrors) -> &mut Self {
        if !child.is_present() {
            return self;
        }
        match self.children.get_mut(&child.name) {
            Some(existing) => existing.merge(child),
            None => {
                self.children.insert(child.name.clone(), child);
            }
        }
        self
    }

    /// Builder-style [`put`](Self::put).
    pub fn with(mut self, field: impl Into<String>, error: FieldError) -> Self {
        self.put(field, error);
        self
    }

    /// Builder-style [`put_child`](Self::put_child).
    pub fn with_child(mut self, child: ValidationErrors) -> Self {
        self.put_child(child);
        self
    }

    fn merge(&mut self, other: ValidationErrors) {
        self.fields.extend(other.fields);
        for (_, child) in other.children {
            self.put_child(child);
        }
    }

    /// Whether this node or any descendant holds an error.
    pub fn is_present(&self) -> bool {
        !self.fields.is_empty() || self.children.values().any(ValidationErrors::is_present)
    }

    /// Number of field errors in the subtree.
    pub fn len(&self) -> usize {
        self.fields.len() + self.children.values().map(ValidationErrors::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_present()
    }

    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.fields.get(name)
    }

    pub fn get_child(&self, name: &str) -> Option<&ValidationErrors> {
        self.children.get(name)
    }

    /// Follow `path` through child nodes; the last segment names the field.
    pub fn lookup(&self, path: &[&str]) -> Option<&FieldError> {
        let (field, parents) = path.split_last()?;
        let mut node = self;
        for segment in parents {
            node = node.children.get(*segment)?;
        }
        node.fields.get(*field)
    }

    /// Every error with its dotted location, in rendering order.
    pub fn flatten(&self) -> Vec<(String, &FieldError)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a FieldError)>) {
        let join = |segment: &str| {
            if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{prefix}.{segment}")
            }
        };
        for (field, error) in &self.fields {
            out.push((join(field), error));
        }
        for child in self.children.values() {
            child.collect(&join(&child.name), out);
        }
    }

    fn render(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        for (field, error) in &self.fields {
            lines.push(format!("{indent}{field}: {error}"));
        }
        for child in self.children.values().filter(|c| c.is_present()) {
            lines.push(format!("{indent}{}:", child.name));
            child.render(depth + 1, lines);
        }
    }
}

impl PartialEq for ValidationErrors {
    fn eq(&self, other: &Self) -> bool {
        let present = |errors: &ValidationErrors| {
            errors
                .children
                .values()
                .filter(|c| c.is_present())
                .count()
        };
        self.name == other.name
            && self.fields == other.fields
            && present(self) == present(other)
            && self
                .children
                .values()
                .filter(|c| c.is_present())
                .all(|c| other.children.get(&c.name) == Some(c))
    }
}

impl Eq for ValidationErrors {}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        if self.name.is_empty() {
            self.render(0, &mut lines);
        } else {
            lines.push(format!("{}:", self.name));
            self.render(1, &mut lines);
        }
        write!(f, "{}", lines.join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}
