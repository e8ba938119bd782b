//! Storage group: the access-log sink and the four exchange buckets
//!
//! Every bucket is versioned, private and destroyed together with its stack.
//! Data buckets write server access logs into the sink bucket under a
//! per-bucket prefix. Lifecycle rules come from one shared procedure,
//! [`lifecycle_rules`], parameterised per bucket by [`BucketSpec`].

use crate::arn::{self, Partition};
use crate::error::{IacError, Result};
use crate::stack::{LogicalId, ResourceKind, StackDefinition};
use crate::validation::{validate_bucket_name, NamePrefix};
use tracing::{debug, info};

/// Suffix of the storage stack name
pub const STACK_SUFFIX: &str = "s3";

/// Value of the `application` tag on the storage stack
pub const APPLICATION: &str = "S3 Bucket";

pub const ABORT_INCOMPLETE_RULE_ID: &str = "abort-incomplete-multipart-upload";
pub const TRANSITION_RULE_ID: &str = "transitions-to-glacier";
pub const EXPIRATION_RULE_ID: &str = "expiration";
pub const NONCURRENT_EXPIRATION_RULE_ID: &str = "noncurrent-version-expiration";

/// Target tier of a lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Glacier,
    GlacierInstantRetrieval,
    DeepArchive,
    InfrequentAccess,
    OneZoneInfrequentAccess,
    IntelligentTiering,
}

impl StorageClass {
    /// Cold tier used by the archival buckets
    pub const COLD: StorageClass = StorageClass::Glacier;

    /// CloudFormation storage class name
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Glacier => "GLACIER",
            StorageClass::GlacierInstantRetrieval => "GLACIER_IR",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
            StorageClass::InfrequentAccess => "STANDARD_IA",
            StorageClass::OneZoneInfrequentAccess => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
        }
    }
}

/// Move objects to `storage_class` after `after_days`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub storage_class: StorageClass,
    pub after_days: u32,
}

/// One lifecycle rule as attached to a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    pub abort_incomplete_multipart_upload_days: Option<u32>,
    pub transitions: Vec<Transition>,
    pub noncurrent_version_transitions: Vec<Transition>,
    pub expiration_days: Option<u32>,
    pub noncurrent_expiration_days: Option<u32>,
}

impl LifecycleRule {
    fn empty(id: &str) -> Self {
        LifecycleRule {
            id: id.to_string(),
            enabled: true,
            abort_incomplete_multipart_upload_days: None,
            transitions: Vec::new(),
            noncurrent_version_transitions: Vec::new(),
            expiration_days: None,
            noncurrent_expiration_days: None,
        }
    }

    /// Abort multipart uploads left incomplete for `days`
    pub fn abort_incomplete_multipart_upload(days: u32) -> Self {
        LifecycleRule {
            abort_incomplete_multipart_upload_days: Some(days),
            ..Self::empty(ABORT_INCOMPLETE_RULE_ID)
        }
    }

    /// Transition both current and noncurrent versions
    pub fn transition(transition: Transition) -> Self {
        LifecycleRule {
            transitions: vec![transition],
            noncurrent_version_transitions: vec![transition],
            ..Self::empty(TRANSITION_RULE_ID)
        }
    }

    /// Expire the current version after `days`
    pub fn expiration(days: u32) -> Self {
        LifecycleRule {
            expiration_days: Some(days),
            ..Self::empty(EXPIRATION_RULE_ID)
        }
    }

    /// Expire noncurrent versions `days` after they become noncurrent
    pub fn noncurrent_expiration(days: u32) -> Self {
        LifecycleRule {
            noncurrent_expiration_days: Some(days),
            ..Self::empty(NONCURRENT_EXPIRATION_RULE_ID)
        }
    }
}

/// Parameters of the shared lifecycle procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub incomplete_days: u32,
    pub transition: Option<Transition>,
    pub expiration_days: u32,
    pub noncurrent_expiration_days: u32,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        LifecycleOptions {
            incomplete_days: 7,
            transition: Some(Transition {
                storage_class: StorageClass::COLD,
                after_days: 30,
            }),
            expiration_days: 60,
            noncurrent_expiration_days: 60,
        }
    }
}

impl LifecycleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire outright instead of archiving
    pub fn without_transition(mut self) -> Self {
        self.transition = None;
        self
    }

    pub fn incomplete_after(mut self, days: u32) -> Self {
        self.incomplete_days = days;
        self
    }

    pub fn expire_after(mut self, days: u32) -> Self {
        self.expiration_days = days;
        self
    }

    pub fn expire_noncurrent_after(mut self, days: u32) -> Self {
        self.noncurrent_expiration_days = days;
        self
    }
}

/// Build the rule set for one bucket
///
/// Rules are additive: abort-incomplete-upload, the optional tier
/// transition, current-version expiration, noncurrent-version expiration.
pub fn lifecycle_rules(options: &LifecycleOptions) -> Result<Vec<LifecycleRule>> {
    let mut days = vec![
        ("incomplete multipart upload", options.incomplete_days),
        ("expiration", options.expiration_days),
        ("noncurrent expiration", options.noncurrent_expiration_days),
    ];
    if let Some(transition) = options.transition {
        days.push(("transition", transition.after_days));
    }
    if let Some((what, _)) = days.iter().find(|(_, d)| *d == 0) {
        return Err(IacError::InvalidLifecycle(format!(
            "{} must be at least one day",
            what
        )));
    }

    let mut rules = vec![LifecycleRule::abort_incomplete_multipart_upload(
        options.incomplete_days,
    )];
    if let Some(transition) = options.transition {
        rules.push(LifecycleRule::transition(transition));
    }
    rules.push(LifecycleRule::expiration(options.expiration_days));
    rules.push(LifecycleRule::noncurrent_expiration(
        options.noncurrent_expiration_days,
    ));
    Ok(rules)
}

/// What happens to a bucket when its stack is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Destroy,
    Retain,
}

impl RemovalPolicy {
    /// CloudFormation `DeletionPolicy` / `UpdateReplacePolicy` value
    pub fn as_cfn(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
        }
    }
}

/// Public access block settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPublicAccess {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl BlockPublicAccess {
    pub const BLOCK_ALL: BlockPublicAccess = BlockPublicAccess {
        block_public_acls: true,
        block_public_policy: true,
        ignore_public_acls: true,
        restrict_public_buckets: true,
    };
}

/// Canned ACL applied to a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedAcl {
    /// Lets the S3 log delivery group write access logs
    LogDeliveryWrite,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::LogDeliveryWrite => "LogDeliveryWrite",
        }
    }
}

/// Read-only reference to a defined bucket
///
/// Only the storage builder creates handles, so holding one proves the
/// bucket exists in the storage stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketHandle {
    stack: String,
    logical_id: LogicalId,
    name: String,
}

impl BucketHandle {
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn bucket_name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self, partition: Partition) -> String {
        arn::bucket_arn(partition, &self.name)
    }

    pub fn objects_arn(&self, partition: Partition) -> String {
        arn::bucket_objects_arn(partition, &self.name)
    }
}

/// Server access logging destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogTarget {
    pub bucket: BucketHandle,
    pub prefix: String,
}

/// A bucket definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub handle: BucketHandle,
    pub versioned: bool,
    pub removal_policy: RemovalPolicy,
    pub auto_delete_objects: bool,
    pub block_public_access: Option<BlockPublicAccess>,
    pub access_control: Option<CannedAcl>,
    pub access_logs: Option<AccessLogTarget>,
    pub lifecycle_rules: Vec<LifecycleRule>,
}

impl Bucket {
    /// Versioned bucket that is deleted with its stack
    pub fn new(stack: &str, construct: &str, name: String) -> Result<Self> {
        validate_bucket_name(&name)?;
        Ok(Bucket {
            handle: BucketHandle {
                stack: stack.to_string(),
                logical_id: LogicalId::new(stack, construct),
                name,
            },
            versioned: true,
            removal_policy: RemovalPolicy::Destroy,
            auto_delete_objects: false,
            block_public_access: None,
            access_control: None,
            access_logs: None,
            lifecycle_rules: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.handle.logical_id
    }

    pub fn handle(&self) -> BucketHandle {
        self.handle.clone()
    }

    /// Find a lifecycle rule by id
    pub fn rule(&self, id: &str) -> Option<&LifecycleRule> {
        self.lifecycle_rules.iter().find(|r| r.id == id)
    }
}

/// Per-bucket parameters of the storage group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpec {
    pub construct: &'static str,
    pub suffix: &'static str,
    pub log_prefix: Option<&'static str>,
    pub transition: bool,
    pub expiration_days: u32,
    pub noncurrent_expiration_days: u32,
}

impl BucketSpec {
    pub fn lifecycle(&self) -> LifecycleOptions {
        let options = LifecycleOptions::new()
            .expire_after(self.expiration_days)
            .expire_noncurrent_after(self.noncurrent_expiration_days);
        if self.transition {
            options
        } else {
            options.without_transition()
        }
    }
}

pub const ACCESS_LOGS: BucketSpec = BucketSpec {
    construct: "AccessLogsBucket",
    suffix: "bucket-access-logs",
    log_prefix: None,
    transition: true,
    expiration_days: 365,
    noncurrent_expiration_days: 14,
};

pub const TO_CASMART: BucketSpec = BucketSpec {
    construct: "ToCasmartBucket",
    suffix: "data-to-casmart",
    log_prefix: Some("casmart"),
    transition: false,
    expiration_days: 7,
    noncurrent_expiration_days: 7,
};

pub const TO_THERMOFISHER: BucketSpec = BucketSpec {
    construct: "ToThermoFisherBucket",
    suffix: "data-to-thermofisher",
    log_prefix: Some("thermofisher"),
    transition: false,
    expiration_days: 30,
    noncurrent_expiration_days: 30,
};

pub const CONFIG_DB: BucketSpec = BucketSpec {
    construct: "ConfigDbBucket",
    suffix: "config-db-backup",
    log_prefix: Some("config"),
    transition: false,
    expiration_days: 30,
    noncurrent_expiration_days: 30,
};

pub const LOGS: BucketSpec = BucketSpec {
    construct: "LogsBucket",
    suffix: "log",
    log_prefix: Some("log"),
    transition: true,
    expiration_days: 180,
    noncurrent_expiration_days: 14,
};

/// Handles to the four exchange buckets, consumed by the identity group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeBuckets {
    pub to_casmart: BucketHandle,
    pub to_thermofisher: BucketHandle,
    pub config_db: BucketHandle,
    pub logs: BucketHandle,
}

impl ExchangeBuckets {
    /// Labelled handles in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &BucketHandle)> {
        [
            ("to_casmart", &self.to_casmart),
            ("to_thermofisher", &self.to_thermofisher),
            ("config_db", &self.config_db),
            ("logs", &self.logs),
        ]
        .into_iter()
    }

    /// All handles must come from the same storage stack
    pub fn validate(&self) -> Result<()> {
        let stack = self.to_casmart.stack();
        for (label, handle) in self.iter() {
            if handle.stack() != stack {
                return Err(IacError::DanglingReference(format!(
                    "bucket handle {} belongs to stack '{}', expected '{}'",
                    label,
                    handle.stack(),
                    stack
                )));
            }
        }
        Ok(())
    }

    /// Name of the storage stack the handles belong to
    pub fn stack(&self) -> &str {
        self.to_casmart.stack()
    }
}

/// The storage group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStack {
    name: String,
    pub access_logs: Bucket,
    pub to_casmart: Bucket,
    pub to_thermofisher: Bucket,
    pub config_db: Bucket,
    pub logs: Bucket,
}

impl StorageStack {
    /// Define all five buckets for `prefix`
    pub fn build(prefix: &NamePrefix) -> Result<Self> {
        let name = prefix.name(STACK_SUFFIX);

        let mut access_logs = Bucket::new(&name, ACCESS_LOGS.construct, prefix.name(ACCESS_LOGS.suffix))?;
        access_logs.block_public_access = Some(BlockPublicAccess::BLOCK_ALL);
        access_logs.access_control = Some(CannedAcl::LogDeliveryWrite);
        access_logs.lifecycle_rules = lifecycle_rules(&ACCESS_LOGS.lifecycle())?;
        debug!("Defined log sink bucket {}", access_logs.name());

        let sink = access_logs.handle();
        let data_bucket = |spec: &BucketSpec| -> Result<Bucket> {
            let mut bucket = Bucket::new(&name, spec.construct, prefix.name(spec.suffix))?;
            bucket.access_logs = spec.log_prefix.map(|p| AccessLogTarget {
                bucket: sink.clone(),
                prefix: p.to_string(),
            });
            bucket.lifecycle_rules = lifecycle_rules(&spec.lifecycle())?;
            debug!(
                "Defined bucket {} with {} lifecycle rules",
                bucket.name(),
                bucket.lifecycle_rules.len()
            );
            Ok(bucket)
        };

        let stack = StorageStack {
            to_casmart: data_bucket(&TO_CASMART)?,
            to_thermofisher: data_bucket(&TO_THERMOFISHER)?,
            config_db: data_bucket(&CONFIG_DB)?,
            logs: data_bucket(&LOGS)?,
            access_logs,
            name,
        };

        info!("Built storage stack {} with 5 buckets", stack.name);
        Ok(stack)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All buckets, log sink first
    pub fn buckets(&self) -> [&Bucket; 5] {
        [
            &self.access_logs,
            &self.to_casmart,
            &self.to_thermofisher,
            &self.config_db,
            &self.logs,
        ]
    }

    /// Handles for the identity group
    pub fn exchange_buckets(&self) -> ExchangeBuckets {
        ExchangeBuckets {
            to_casmart: self.to_casmart.handle(),
            to_thermofisher: self.to_thermofisher.handle(),
            config_db: self.config_db.handle(),
            logs: self.logs.handle(),
        }
    }
}

impl StackDefinition for StorageStack {
    fn stack_name(&self) -> &str {
        &self.name
    }

    fn application(&self) -> &'static str {
        APPLICATION
    }

    fn resources(&self) -> Vec<ResourceKind> {
        self.buckets()
            .into_iter()
            .map(|b| ResourceKind::Bucket(b.clone()))
            .collect()
    }
}
