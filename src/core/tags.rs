//! Resource tags
//!
//! A [`TagMap`] is applied to every resource in the deployment. Stacks may
//! layer a small set of overrides on top (the `application` tag).

use crate::error::{IacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value substituted for blank tag values
pub const BLANK_TAG_VALUE: &str = " ";

/// Tag key set by each stack
pub const APPLICATION_TAG: &str = "application";

const MAX_KEY_LENGTH: usize = 128;
const MAX_VALUE_LENGTH: usize = 256;

/// Ordered mapping of tag key to tag value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, normalising a blank value to [`BLANK_TAG_VALUE`]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let mut value = value.into();

        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(IacError::MalformedTags(format!(
                "tag key '{}' must be between 1 and {} characters",
                key, MAX_KEY_LENGTH
            )));
        }
        if key.to_ascii_lowercase().starts_with("aws:") {
            return Err(IacError::MalformedTags(format!(
                "tag key '{}' uses the reserved 'aws:' prefix",
                key
            )));
        }
        if value.is_empty() {
            value = BLANK_TAG_VALUE.to_string();
        }
        if value.len() > MAX_VALUE_LENGTH {
            return Err(IacError::MalformedTags(format!(
                "tag '{}' value exceeds {} characters",
                key, MAX_VALUE_LENGTH
            )));
        }

        self.0.insert(key, value);
        Ok(())
    }

    /// Copy of this map with `overrides` layered on top
    pub fn with_overrides(&self, overrides: &TagMap) -> TagMap {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        TagMap(merged)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-stack overrides: only the `application` tag
pub fn application_overrides(application: &str) -> TagMap {
    let mut tags = BTreeMap::new();
    tags.insert(APPLICATION_TAG.to_string(), application.to_string());
    TagMap(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_value_normalised() {
        let mut tags = TagMap::new();
        tags.insert("owner", "").unwrap();
        assert_eq!(tags.get("owner"), Some(" "));
    }

    #[test]
    fn test_rejects_bad_keys() {
        let mut tags = TagMap::new();
        assert!(tags.insert("", "x").is_err());
        assert!(tags.insert("aws:cloudformation:stack-name", "x").is_err());
        assert!(tags.insert("k".repeat(129), "x").is_err());
        assert!(tags.insert("owner", "v".repeat(257)).is_err());
        assert!(tags.is_empty());
    }

    #[test]
    fn test_overrides_replace_only_named_keys() {
        let mut tags = TagMap::new();
        tags.insert("project", "B2B Marketplace").unwrap();
        tags.insert("application", "from-config").unwrap();

        let merged = tags.with_overrides(&application_overrides("IAM"));
        assert_eq!(merged.get("application"), Some("IAM"));
        assert_eq!(merged.get("project"), Some("B2B Marketplace"));
        assert_eq!(merged.len(), 2);

        // original map untouched
        assert_eq!(tags.get("application"), Some("from-config"));
    }
}
