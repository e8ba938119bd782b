//! In-memory resource graph
//!
//! Builders produce plain value objects; a [`Stack`] gathers them together
//! with tags, outputs and dependencies so [`synth`](crate::synth) can render
//! the deployment template without knowing anything about the builders.

use crate::config::DeployEnv;
use crate::error::{IacError, Result};
use crate::iam::{AccessKey, Group, ManagedPolicy, User};
use crate::storage::Bucket;
use crate::tags::{application_overrides, TagMap};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

/// Template-unique resource identifier
///
/// The construct name with non-alphanumerics removed, followed by eight hex
/// digits of the SHA-256 of `{stack}/{construct}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(stack: &str, construct: &str) -> Self {
        let readable: String = construct
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let digest = Sha256::digest(format!("{}/{}", stack, construct).as_bytes());
        LogicalId(format!("{}{}", readable, hex::encode_upper(&digest[..4])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resource types this deployment declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Bucket(Bucket),
    Group(Group),
    ManagedPolicy(ManagedPolicy),
    User(User),
    AccessKey(AccessKey),
}

impl ResourceKind {
    pub fn logical_id(&self) -> &LogicalId {
        match self {
            ResourceKind::Bucket(b) => b.logical_id(),
            ResourceKind::Group(g) => &g.logical_id,
            ResourceKind::ManagedPolicy(p) => &p.logical_id,
            ResourceKind::User(u) => &u.logical_id,
            ResourceKind::AccessKey(k) => &k.logical_id,
        }
    }

    /// CloudFormation resource type
    pub fn cfn_type(&self) -> &'static str {
        match self {
            ResourceKind::Bucket(_) => "AWS::S3::Bucket",
            ResourceKind::Group(_) => "AWS::IAM::Group",
            ResourceKind::ManagedPolicy(_) => "AWS::IAM::ManagedPolicy",
            ResourceKind::User(_) => "AWS::IAM::User",
            ResourceKind::AccessKey(_) => "AWS::IAM::AccessKey",
        }
    }

    /// Whether CloudFormation accepts a `Tags` property for this type
    pub fn supports_tags(&self) -> bool {
        matches!(self, ResourceKind::Bucket(_) | ResourceKind::User(_))
    }

    /// Physical name and the namespace it must be unique in
    pub fn physical_name(&self) -> Option<(&'static str, &str)> {
        match self {
            ResourceKind::Bucket(b) => Some(("S3 bucket", b.name())),
            ResourceKind::Group(g) => Some(("IAM group", g.name.as_str())),
            ResourceKind::ManagedPolicy(p) => Some(("IAM managed policy", p.name.as_str())),
            ResourceKind::User(u) => Some(("IAM user", u.name.as_str())),
            ResourceKind::AccessKey(_) => None,
        }
    }
}

/// A resource with the tags it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub tags: TagMap,
}

impl Resource {
    pub fn logical_id(&self) -> &LogicalId {
        self.kind.logical_id()
    }
}

/// Value of a stack output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    /// `{"Ref": id}`
    Ref(LogicalId),
    /// `{"Fn::GetAtt": [id, attribute]}`
    GetAtt(LogicalId, &'static str),
}

/// Named, exported stack output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub logical_id: LogicalId,
    pub export_name: String,
    pub value: OutputValue,
}

impl Output {
    pub fn new(stack: &str, export_name: &str, value: OutputValue) -> Self {
        Output {
            logical_id: LogicalId::new(stack, &format!("{}Output", export_name)),
            export_name: export_name.to_string(),
            value,
        }
    }
}

/// Implemented by each resource group builder
pub trait StackDefinition {
    fn stack_name(&self) -> &str;

    /// Value of this stack's `application` tag
    fn application(&self) -> &'static str;

    fn resources(&self) -> Vec<ResourceKind>;

    fn outputs(&self) -> Vec<Output> {
        Vec::new()
    }

    /// Names of stacks that must be deployed first
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A fully tagged, deployable unit of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: String,
    pub env: DeployEnv,
    pub tags: TagMap,
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
    pub dependencies: Vec<String>,
}

impl Stack {
    /// Tag every resource of `definition` with `app_tags` plus the stack's
    /// `application` override
    pub fn assemble(
        definition: &dyn StackDefinition,
        env: &DeployEnv,
        app_tags: &TagMap,
    ) -> Result<Self> {
        let name = definition.stack_name().to_string();
        let tags = app_tags.with_overrides(&application_overrides(definition.application()));

        let mut seen = HashSet::new();
        let mut resources = Vec::new();
        for kind in definition.resources() {
            if !seen.insert(kind.logical_id().clone()) {
                return Err(IacError::collision(
                    format!("logical ids of stack {}", name),
                    kind.logical_id().as_str(),
                ));
            }
            resources.push(Resource {
                kind,
                tags: tags.clone(),
            });
        }

        let outputs = definition.outputs();
        for output in &outputs {
            if !seen.insert(output.logical_id.clone()) {
                return Err(IacError::collision(
                    format!("logical ids of stack {}", name),
                    output.logical_id.as_str(),
                ));
            }
        }

        debug!(
            "Assembled stack {} ({} resources, {} outputs)",
            name,
            resources.len(),
            outputs.len()
        );

        Ok(Stack {
            name,
            env: env.clone(),
            tags,
            resources,
            outputs,
            dependencies: definition.dependencies(),
        })
    }

    pub fn resource(&self, logical_id: &LogicalId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id() == logical_id)
    }

    pub fn output(&self, export_name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.export_name == export_name)
    }

    /// Template file name inside the cloud assembly
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }
}
