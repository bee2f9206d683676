//! String-keyed provider settings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form `key: value` settings attached to a cloud or secret provider.
///
/// Lookups return `Option` so callers decide what a missing key means.
/// Insertion order is kept so rendering stays stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(IndexMap<String, String>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_reports_presence() {
        let config = ConfigMap::new().with("project", "cool-proj");
        assert_eq!(config.get("project"), Some("cool-proj"));
        assert_eq!(config.get("region"), None);
        assert!(config.contains_key("project"));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_empty_value_is_still_present() {
        let config: ConfigMap = [("serviceAccount", "")].into_iter().collect();
        assert_eq!(config.get("serviceAccount"), Some(""));
    }

    #[test]
    fn test_iteration_keeps_insertion_order() {
        let config = ConfigMap::new().with("b", "2").with("a", "1");
        let keys: Vec<_> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
