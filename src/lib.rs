//! # S3 Exchange Stack - Partner Data Exchange Infrastructure
//!
//! `s3-exchange-stack` declares the cloud resources two trading partners,
//! Casmart and ThermoFisher, use to hand files to each other, and
//! synthesizes them into CloudFormation templates:
//!
//! - **Storage group**: an access-log sink plus four versioned exchange
//!   buckets with lifecycle rules
//! - **Identity group**: one group, managed policy, user and access key per
//!   partner, granting read on its inbound bucket and write on the other
//! - **Policy evaluation**: check what the generated policies actually allow
//!   before anything is deployed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use s3_exchange_stack::{AppBuilder, Result};
//!
//! # fn main() -> Result<()> {
//! let assembly = AppBuilder::new()
//!     .config_path("aws_tags.yaml")
//!     .region("cn-north-1")
//!     .build()?
//!     .build()?;
//!
//! assembly.synth()?.write_to("cdk.out")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Inspecting Access
//!
//! ```rust
//! use s3_exchange_stack::config::ConfigFormat;
//! use s3_exchange_stack::{AppBuilder, Partner, Result, TagDocument};
//!
//! # fn main() -> Result<()> {
//! let doc = TagDocument::parse("project: shop\nenvironment: prod\n", ConfigFormat::Yaml)?;
//! let assembly = AppBuilder::new().document(doc).build()?.build()?;
//!
//! let report = assembly.access_report();
//! assert_eq!(report.readable_by(Partner::Casmart), vec!["to_casmart"]);
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    app, arn, config, error, iam, manifest, stack, storage, synth, tags, validation,
};

pub use crate::core::{
    app::{App, Assembly},
    arn::Partition,
    config::{DeployEnv, DeploymentConfig, TagDocument, DEFAULT_TAGS_FILE},
    error::{IacError, Result},
    iam::{AccessReport, Decision, IdentityStack, Partner, PolicyDocument, PolicyEngine},
    manifest::AssemblyManifest,
    stack::{LogicalId, Stack},
    storage::{ExchangeBuckets, StorageStack},
    synth::CloudAssembly,
    tags::TagMap,
    validation::NamePrefix,
};

use std::path::PathBuf;
use tracing::info;

/// Builder for [`App`] from a tag document and deployment target
///
/// Account and region are optional; when the partition is not set it is
/// derived from the region, falling back to [`Partition::DEFAULT`].
#[derive(Debug, Clone, Default)]
pub struct AppBuilder {
    config_path: Option<PathBuf>,
    document: Option<TagDocument>,
    account: Option<String>,
    region: Option<String>,
    partition: Option<Partition>,
}

impl AppBuilder {
    /// Create a builder reading [`DEFAULT_TAGS_FILE`] unless told otherwise
    pub fn new() -> Self {
        Self::default()
    }

    /// Read tags from this file (YAML, TOML or JSON by extension)
    pub fn config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use an already parsed tag document instead of a file
    pub fn document(mut self, document: TagDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn account<S: Into<String>>(mut self, account: S) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Load and validate the configuration
    pub fn build(self) -> Result<App> {
        let env = DeployEnv::new(self.account, self.region);
        let partition = env.resolve_partition(self.partition);

        let document = match self.document {
            Some(document) => document,
            None => {
                let path = self
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_TAGS_FILE));
                info!("Loading tags from {}", path.display());
                TagDocument::load(&path)?
            }
        };

        let config = DeploymentConfig::new(&document, env, partition)?;
        Ok(App::new(config))
    }
}
