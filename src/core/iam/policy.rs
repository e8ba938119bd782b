//! IAM policy document structure
//!
//! Serializes to the standard IAM JSON grammar (`Version` / `Statement` /
//! `Sid` / `Effect` / `Action` / `Resource`) so the same value is used for
//! evaluation and for the synthesized template.

use super::PatternMatcher;
use crate::error::{IacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Wins over any `Allow`
    Deny,
}

/// Whether an action targets a bucket, an object, or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Account,
    Bucket,
    Object,
}

/// S3 API verbs used by the exchange policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "s3:ListAllMyBuckets")]
    ListAllMyBuckets,
    #[serde(rename = "s3:GetBucketLocation")]
    GetBucketLocation,
    #[serde(rename = "s3:ListBucket")]
    ListBucket,
    #[serde(rename = "s3:GetObject")]
    GetObject,
    #[serde(rename = "s3:PutObject")]
    PutObject,
    #[serde(rename = "s3:DeleteObject")]
    DeleteObject,
    /// All S3 actions (wildcard)
    #[serde(rename = "s3:*")]
    All,
}

impl Action {
    /// `s3:*` matches every action
    pub fn matches(&self, other: &Action) -> bool {
        match (self, other) {
            (Action::All, _) => true,
            (_, Action::All) => true,
            (a, b) => a == b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ListAllMyBuckets => "s3:ListAllMyBuckets",
            Action::GetBucketLocation => "s3:GetBucketLocation",
            Action::ListBucket => "s3:ListBucket",
            Action::GetObject => "s3:GetObject",
            Action::PutObject => "s3:PutObject",
            Action::DeleteObject => "s3:DeleteObject",
            Action::All => "s3:*",
        }
    }

    pub fn scope(&self) -> ResourceScope {
        match self {
            Action::ListAllMyBuckets | Action::All => ResourceScope::Account,
            Action::GetBucketLocation | Action::ListBucket => ResourceScope::Bucket,
            Action::GetObject | Action::PutObject | Action::DeleteObject => ResourceScope::Object,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `Allow`/`Deny` clause of a policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Statement ID, unique within its policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    pub effect: Effect,

    pub action: Vec<Action>,

    /// Resource ARNs this statement applies to (supports wildcards)
    pub resource: Vec<String>,
}

impl Statement {
    pub fn new(effect: Effect, action: Vec<Action>, resource: Vec<String>) -> Self {
        Statement {
            sid: None,
            effect,
            action,
            resource,
        }
    }

    /// Allow statement with a sid
    pub fn allow(sid: &str, action: Vec<Action>, resource: Vec<String>) -> Self {
        Statement::new(Effect::Allow, action, resource).with_sid(sid)
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Whether `action` on `resource` falls under this statement
    pub fn applies_to(&self, action: &Action, resource: &str) -> bool {
        self.action.iter().any(|a| a.matches(action))
            && self
                .resource
                .iter()
                .any(|arn| PatternMatcher::matches(arn, resource))
    }
}

/// IAM policy document as attached to a managed policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version
    pub version: String,

    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Empty document at [`POLICY_VERSION`]
    pub fn new() -> Self {
        PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: Vec::new(),
        }
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statement.push(statement);
    }

    /// Find a statement by sid
    pub fn statement(&self, sid: &str) -> Option<&Statement> {
        self.statement
            .iter()
            .find(|s| s.sid.as_deref() == Some(sid))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed IAM JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject empty documents, statements without actions or resources,
    /// non-ARN resources and duplicate sids
    pub fn validate(&self) -> Result<()> {
        if self.statement.is_empty() {
            return Err(IacError::InvalidPolicy("document has no statements".to_string()));
        }

        let mut sids = HashSet::new();
        for (index, stmt) in self.statement.iter().enumerate() {
            let i = stmt.sid.clone().unwrap_or_else(|| format!("#{}", index));
            if stmt.action.is_empty() {
                return Err(IacError::InvalidPolicy(format!("statement {} has no actions", i)));
            }
            if stmt.resource.is_empty() {
                return Err(IacError::InvalidPolicy(format!("statement {} has no resources", i)));
            }
            if let Some(bad) = stmt.resource.iter().find(|r| !r.starts_with("arn:")) {
                return Err(IacError::InvalidPolicy(format!(
                    "statement {} resource '{}' is not an ARN",
                    i, bad
                )));
            }
            if let Some(sid) = &stmt.sid {
                if !sids.insert(sid.as_str()) {
                    return Err(IacError::InvalidPolicy(format!("duplicate sid '{}'", sid)));
                }
            }
        }

        Ok(())
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}
