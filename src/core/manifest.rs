//! Cloud assembly manifest
//!
//! `manifest.json` sits next to the stack templates and tells the
//! provisioning engine which templates exist, which account/region each
//! targets, and in which order they must be deployed.

use crate::error::{IacError, Result};
use crate::stack::Stack;
use crate::tags::TagMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Artifact type of a CloudFormation stack
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Manifest schema version written by this crate
pub fn schema_version() -> Version {
    Version::new(1, 0, 0)
}

/// Stack-specific artifact properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProperties {
    /// Template file, relative to the assembly directory
    pub template_file: String,

    /// Stack-level tags
    #[serde(default, skip_serializing_if = "TagMap::is_empty")]
    pub tags: TagMap,
}

/// One deployable artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,

    /// `aws://{account}/{region}`
    pub environment: String,

    pub properties: StackProperties,

    /// Artifacts that must be deployed first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// Cloud assembly manifest
///
/// # Examples
///
/// ```
/// use s3_exchange_stack::manifest::AssemblyManifest;
///
/// let manifest = AssemblyManifest::new();
/// assert!(manifest.artifacts.is_empty());
/// assert!(manifest.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    /// Manifest schema version
    pub version: Version,

    /// Artifacts keyed by stack name
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
}

impl AssemblyManifest {
    /// Manifest file name inside the assembly directory
    pub const PATH: &'static str = "manifest.json";

    pub fn new() -> Self {
        AssemblyManifest {
            version: schema_version(),
            artifacts: BTreeMap::new(),
        }
    }

    /// Register a stack
    pub fn add_stack(&mut self, stack: &Stack) {
        self.artifacts.insert(
            stack.name.clone(),
            Artifact {
                kind: STACK_ARTIFACT_TYPE.to_string(),
                environment: stack.env.environment_uri(),
                properties: StackProperties {
                    template_file: stack.template_file(),
                    tags: stack.tags.clone(),
                },
                dependencies: stack.dependencies.clone(),
            },
        );
    }

    /// Check that every dependency names another artifact
    pub fn validate(&self) -> Result<()> {
        for (name, artifact) in &self.artifacts {
            for dep in &artifact.dependencies {
                if dep == name {
                    return Err(IacError::DanglingReference(format!(
                        "artifact {} depends on itself",
                        name
                    )));
                }
                if !self.artifacts.contains_key(dep) {
                    return Err(IacError::DanglingReference(format!(
                        "artifact {} depends on unknown artifact {}",
                        name, dep
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for AssemblyManifest {
    fn default() -> Self {
        Self::new()
    }
}
