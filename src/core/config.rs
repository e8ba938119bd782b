//! Deployment configuration
//!
//! The deployment is driven by a flat tag document (`aws_tags.yaml` by
//! default). Two keys are required, `project` and `environment`; every key,
//! those two included, is applied as a tag to every resource.
//!
//! Nothing in this module reads process-wide state. The binary resolves the
//! target account/region and hands them in through [`DeployEnv`].

use crate::arn::Partition;
use crate::error::{IacError, Result};
use crate::tags::TagMap;
use crate::validation::NamePrefix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Default tag document file name
pub const DEFAULT_TAGS_FILE: &str = "aws_tags.yaml";

/// Supported tag document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(IacError::InvalidConfig(format!(
                "unsupported tag document '{}': expected .yaml, .yml, .toml or .json",
                path.display()
            ))),
        }
    }
}

/// Flat key/value document as read from disk
///
/// Scalars are stringified; `null` becomes an empty string (turned into a
/// blank tag value later). Nested values are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDocument {
    entries: BTreeMap<String, String>,
}

impl TagDocument {
    /// Read and parse a tag document, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        debug!("Loading {:?} tag document from {}", format, path.display());
        Self::parse(&content, format)
    }

    /// Parse a tag document from a string
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let entries = match format {
            ConfigFormat::Yaml => flatten_yaml(serde_yaml::from_str(content)?)?,
            ConfigFormat::Toml => flatten_toml(toml::from_str(content)?)?,
            ConfigFormat::Json => flatten_json(serde_json::from_str(content)?)?,
        };
        Ok(TagDocument { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| IacError::MissingConfigKey(key.to_string()))
    }

    /// Convert every entry into a resource tag
    pub fn to_tag_map(&self) -> Result<TagMap> {
        let mut tags = TagMap::new();
        for (key, value) in &self.entries {
            tags.insert(key.clone(), value.clone())?;
        }
        Ok(tags)
    }
}

fn flatten_yaml(doc: serde_yaml::Value) -> Result<BTreeMap<String, String>> {
    use serde_yaml::Value;

    let mapping = match doc {
        Value::Mapping(m) => m,
        Value::Null => return Ok(BTreeMap::new()),
        _ => {
            return Err(IacError::MalformedTags(
                "top level must be a mapping".to_string(),
            ))
        }
    };

    let mut entries = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(IacError::MalformedTags(format!(
                    "unsupported key {:?}",
                    other
                )))
            }
        };
        let value = match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            _ => {
                return Err(IacError::MalformedTags(format!(
                    "value of '{}' must be a scalar",
                    key
                )))
            }
        };
        entries.insert(key, value);
    }
    Ok(entries)
}

fn flatten_toml(table: toml::Table) -> Result<BTreeMap<String, String>> {
    use toml::Value;

    let mut entries = BTreeMap::new();
    for (key, value) in table {
        let value = match value {
            Value::String(s) => s,
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Datetime(d) => d.to_string(),
            Value::Array(_) | Value::Table(_) => {
                return Err(IacError::MalformedTags(format!(
                    "value of '{}' must be a scalar",
                    key
                )))
            }
        };
        entries.insert(key, value);
    }
    Ok(entries)
}

fn flatten_json(doc: serde_json::Value) -> Result<BTreeMap<String, String>> {
    use serde_json::Value;

    let object = match doc {
        Value::Object(o) => o,
        _ => {
            return Err(IacError::MalformedTags(
                "top level must be an object".to_string(),
            ))
        }
    };

    let mut entries = BTreeMap::new();
    for (key, value) in object {
        let value = match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            Value::Array(_) | Value::Object(_) => {
                return Err(IacError::MalformedTags(format!(
                    "value of '{}' must be a scalar",
                    key
                )))
            }
        };
        entries.insert(key, value);
    }
    Ok(entries)
}

/// Target account and region
///
/// Either may be absent, in which case the provisioning engine falls back
/// to whatever credentials context it runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployEnv {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl DeployEnv {
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        // blank environment variables count as unset
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        DeployEnv {
            account: non_blank(account),
            region: non_blank(region),
        }
    }

    /// `aws://{account}/{region}` with `unknown-*` placeholders
    pub fn environment_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }

    /// Pick the partition: explicit choice, else the region's, else the default
    pub fn resolve_partition(&self, explicit: Option<Partition>) -> Partition {
        if let Some(partition) = explicit {
            return partition;
        }
        match &self.region {
            Some(region) => Partition::for_region(region),
            None => {
                warn!(
                    "No region configured, defaulting ARNs to partition {}",
                    Partition::DEFAULT
                );
                Partition::DEFAULT
            }
        }
    }
}

/// The two required keys of the tag document
#[derive(Debug, Clone, Validate)]
struct ProjectIdentity {
    #[validate(length(min = 1, message = "project must not be blank"))]
    project: String,

    #[validate(length(min = 1, message = "environment must not be blank"))]
    environment: String,
}

/// Fully validated input to [`App`](crate::app::App)
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    project: String,
    environment: String,
    prefix: NamePrefix,
    tags: TagMap,
    env: DeployEnv,
    partition: Partition,
}

impl DeploymentConfig {
    /// Validate a tag document and bind it to a deployment target
    ///
    /// # Errors
    ///
    /// `MissingConfigKey` if `project` or `environment` is absent,
    /// `InvalidConfig` if either is blank, `InvalidNamePrefix` if they do not
    /// form a valid prefix, `MalformedTags` for bad tag keys/values.
    pub fn new(document: &TagDocument, env: DeployEnv, partition: Partition) -> Result<Self> {
        let identity = ProjectIdentity {
            project: document.required("project")?,
            environment: document.required("environment")?,
        };
        identity
            .validate()
            .map_err(|e| IacError::InvalidConfig(e.to_string()))?;

        let prefix = NamePrefix::new(&identity.project, &identity.environment)?;
        let tags = document.to_tag_map()?;

        debug!(
            "Configured prefix {} ({} tags, partition {})",
            prefix,
            tags.len(),
            partition
        );

        Ok(DeploymentConfig {
            project: identity.project,
            environment: identity.environment,
            prefix,
            tags,
            env,
            partition,
        })
    }

    /// Load the tag document at `path` and resolve the partition from `env`
    pub fn load(
        path: impl AsRef<Path>,
        env: DeployEnv,
        partition: Option<Partition>,
    ) -> Result<Self> {
        let document = TagDocument::load(path)?;
        let partition = env.resolve_partition(partition);
        Self::new(&document, env, partition)
    }

    /// Project title as written in the tag document
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn prefix(&self) -> &NamePrefix {
        &self.prefix
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn env(&self) -> &DeployEnv {
        &self.env
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }
}
