//! Synthesis: in-memory stacks to CloudFormation templates
//!
//! Rendering is a pure function of the [`Stack`] graph; the output is a
//! [`CloudAssembly`] that can be inspected in memory or written to a
//! directory for the provisioning engine.

use crate::error::Result;
use crate::iam::{AccessKey, Group, ManagedPolicy, User};
use crate::manifest::AssemblyManifest;
use crate::stack::{LogicalId, Output, OutputValue, Resource, ResourceKind, Stack};
use crate::storage::{Bucket, LifecycleRule, Transition};
use crate::tags::TagMap;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

fn render_tags(tags: &TagMap) -> Value {
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

fn render_transition(transition: &Transition) -> Value {
    json!({
        "StorageClass": transition.storage_class.as_str(),
        "TransitionInDays": transition.after_days,
    })
}

fn render_lifecycle_rule(rule: &LifecycleRule) -> Value {
    let mut props = Map::new();
    props.insert("Id".into(), json!(rule.id));
    props.insert(
        "Status".into(),
        json!(if rule.enabled { "Enabled" } else { "Disabled" }),
    );
    if let Some(days) = rule.abort_incomplete_multipart_upload_days {
        props.insert(
            "AbortIncompleteMultipartUpload".into(),
            json!({ "DaysAfterInitiation": days }),
        );
    }
    if !rule.transitions.is_empty() {
        props.insert(
            "Transitions".into(),
            rule.transitions.iter().map(render_transition).collect(),
        );
    }
    if !rule.noncurrent_version_transitions.is_empty() {
        props.insert(
            "NoncurrentVersionTransitions".into(),
            rule.noncurrent_version_transitions
                .iter()
                .map(render_transition)
                .collect(),
        );
    }
    if let Some(days) = rule.expiration_days {
        props.insert("ExpirationInDays".into(), json!(days));
    }
    if let Some(days) = rule.noncurrent_expiration_days {
        props.insert(
            "NoncurrentVersionExpiration".into(),
            json!({ "NoncurrentDays": days }),
        );
    }
    Value::Object(props)
}

fn bucket_properties(bucket: &Bucket) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("BucketName".into(), json!(bucket.name()));

    if bucket.versioned {
        props.insert(
            "VersioningConfiguration".into(),
            json!({ "Status": "Enabled" }),
        );
    }
    if !bucket.lifecycle_rules.is_empty() {
        let rules: Vec<Value> = bucket
            .lifecycle_rules
            .iter()
            .map(render_lifecycle_rule)
            .collect();
        props.insert("LifecycleConfiguration".into(), json!({ "Rules": rules }));
    }
    if let Some(target) = &bucket.access_logs {
        props.insert(
            "LoggingConfiguration".into(),
            json!({
                "DestinationBucketName": reference(target.bucket.logical_id()),
                "LogFilePrefix": target.prefix,
            }),
        );
    }
    if let Some(block) = &bucket.block_public_access {
        props.insert(
            "PublicAccessBlockConfiguration".into(),
            json!({
                "BlockPublicAcls": block.block_public_acls,
                "BlockPublicPolicy": block.block_public_policy,
                "IgnorePublicAcls": block.ignore_public_acls,
                "RestrictPublicBuckets": block.restrict_public_buckets,
            }),
        );
    }
    if let Some(acl) = &bucket.access_control {
        props.insert("AccessControl".into(), json!(acl.as_str()));
    }
    props
}

fn group_properties(group: &Group) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("GroupName".into(), json!(group.name));
    if !group.managed_policies.is_empty() {
        props.insert(
            "ManagedPolicyArns".into(),
            group.managed_policies.iter().map(reference).collect(),
        );
    }
    props
}

fn managed_policy_properties(policy: &ManagedPolicy) -> Result<Map<String, Value>> {
    let mut props = Map::new();
    props.insert("ManagedPolicyName".into(), json!(policy.name));
    props.insert("Description".into(), json!(policy.description));
    props.insert("Path".into(), json!("/"));
    props.insert(
        "PolicyDocument".into(),
        serde_json::to_value(&policy.document)?,
    );
    Ok(props)
}

fn user_properties(user: &User) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("UserName".into(), json!(user.name));
    props.insert(
        "Groups".into(),
        user.groups.iter().map(reference).collect(),
    );
    props
}

fn access_key_properties(key: &AccessKey) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("UserName".into(), reference(&key.user));
    props
}

/// Render one resource entry of the `Resources` section
pub fn render_resource(resource: &Resource) -> Result<Value> {
    let mut props = match &resource.kind {
        ResourceKind::Bucket(b) => bucket_properties(b),
        ResourceKind::Group(g) => group_properties(g),
        ResourceKind::ManagedPolicy(p) => managed_policy_properties(p)?,
        ResourceKind::User(u) => user_properties(u),
        ResourceKind::AccessKey(k) => access_key_properties(k),
    };

    if resource.kind.supports_tags() && !resource.tags.is_empty() {
        props.insert("Tags".into(), render_tags(&resource.tags));
    }

    let mut entry = Map::new();
    entry.insert("Type".into(), json!(resource.kind.cfn_type()));
    entry.insert("Properties".into(), Value::Object(props));

    if let ResourceKind::Bucket(b) = &resource.kind {
        let policy = b.removal_policy.as_cfn();
        entry.insert("UpdateReplacePolicy".into(), json!(policy));
        entry.insert("DeletionPolicy".into(), json!(policy));
    }

    Ok(Value::Object(entry))
}

fn render_output(output: &Output) -> Value {
    let value = match &output.value {
        OutputValue::Ref(id) => reference(id),
        OutputValue::GetAtt(id, attribute) => json!({ "Fn::GetAtt": [id.as_str(), attribute] }),
    };
    json!({
        "Value": value,
        "Export": { "Name": output.export_name },
    })
}

/// Render a complete stack template
pub fn render_template(stack: &Stack) -> Result<Value> {
    let mut resources = Map::new();
    for resource in &stack.resources {
        debug!(
            "Rendering {} {}",
            resource.kind.cfn_type(),
            resource.logical_id()
        );
        resources.insert(resource.logical_id().to_string(), render_resource(resource)?);
    }

    let mut template = Map::new();
    template.insert("Resources".into(), Value::Object(resources));

    if !stack.outputs.is_empty() {
        let outputs: Map<String, Value> = stack
            .outputs
            .iter()
            .map(|o| (o.logical_id.to_string(), render_output(o)))
            .collect();
        template.insert("Outputs".into(), Value::Object(outputs));
    }

    Ok(Value::Object(template))
}

/// Synthesized templates plus their manifest
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    manifest: AssemblyManifest,
    templates: BTreeMap<String, Value>,
}

impl CloudAssembly {
    pub fn synthesize(stacks: &[Stack]) -> Result<Self> {
        let mut manifest = AssemblyManifest::new();
        let mut templates = BTreeMap::new();

        for stack in stacks {
            templates.insert(stack.name.clone(), render_template(stack)?);
            manifest.add_stack(stack);
        }
        manifest.validate()?;

        Ok(CloudAssembly {
            manifest,
            templates,
        })
    }

    pub fn manifest(&self) -> &AssemblyManifest {
        &self.manifest
    }

    /// Template of the named stack
    pub fn template(&self, stack_name: &str) -> Option<&Value> {
        self.templates.get(stack_name)
    }

    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Write every template and `manifest.json` into `dir`
    ///
    /// Returns the written paths, manifest last.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (name, template) in &self.templates {
            let file = self
                .manifest
                .artifacts
                .get(name)
                .map(|a| a.properties.template_file.clone())
                .unwrap_or_else(|| format!("{}.template.json", name));
            let path = dir.join(file);
            std::fs::write(&path, serde_json::to_string_pretty(template)? + "\n")?;
            info!("Wrote template {}", path.display());
            written.push(path);
        }

        let path = dir.join(AssemblyManifest::PATH);
        std::fs::write(&path, self.manifest.to_json()? + "\n")?;
        info!("Wrote manifest {}", path.display());
        written.push(path);

        Ok(written)
    }
}
