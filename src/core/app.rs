//! Deployment application
//!
//! Builds both resource groups from a [`DeploymentConfig`], wires the
//! exchange buckets into the identity group, and checks the names that
//! must be unique across the whole deployment.

use crate::config::DeploymentConfig;
use crate::error::{IacError, Result};
use crate::iam::{AccessReport, IdentityStack, PolicyEngine};
use crate::stack::Stack;
use crate::storage::StorageStack;
use crate::synth::CloudAssembly;
use crate::validation::NamePrefix;
use std::collections::HashSet;
use tracing::{debug, info};

/// Entry point of the deployment
///
/// # Examples
///
/// ```
/// use s3_exchange_stack::{App, DeployEnv, DeploymentConfig, Partition, TagDocument};
/// use s3_exchange_stack::config::ConfigFormat;
///
/// # fn main() -> s3_exchange_stack::Result<()> {
/// let doc = TagDocument::parse("project: shop\nenvironment: dev\n", ConfigFormat::Yaml)?;
/// let config = DeploymentConfig::new(&doc, DeployEnv::default(), Partition::AwsCn)?;
///
/// let assembly = App::new(config).build()?;
/// assert_eq!(assembly.stack_names(), vec!["shop-dev-s3", "shop-dev-iam"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct App {
    config: DeploymentConfig,
}

impl App {
    pub fn new(config: DeploymentConfig) -> Self {
        App { config }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Build the storage group, then the identity group against its buckets
    pub fn build(&self) -> Result<Assembly> {
        let prefix = self.config.prefix().clone();
        info!(
            "Building deployment {} (partition {})",
            prefix,
            self.config.partition()
        );

        let storage = StorageStack::build(&prefix)?;
        let identity = IdentityStack::build(
            &prefix,
            self.config.project(),
            &storage.exchange_buckets(),
            self.config.partition(),
        )?;

        let stacks = vec![
            Stack::assemble(&storage, self.config.env(), self.config.tags())?,
            Stack::assemble(&identity, self.config.env(), self.config.tags())?,
        ];
        check_unique_names(&stacks)?;

        debug!("Deployment {} has {} stacks", prefix, stacks.len());

        Ok(Assembly {
            prefix,
            storage,
            identity,
            stacks,
        })
    }
}

/// Reject duplicate physical names, export names and stack names, and
/// dependencies on stacks not built earlier
fn check_unique_names(stacks: &[Stack]) -> Result<()> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for stack in stacks {
        for dep in &stack.dependencies {
            if !seen.contains(&("stack", dep.as_str())) {
                return Err(IacError::DanglingReference(format!(
                    "stack {} depends on {}, which is not built before it",
                    stack.name, dep
                )));
            }
        }

        if !seen.insert(("stack", stack.name.as_str())) {
            return Err(IacError::collision("stack", &stack.name));
        }

        for resource in &stack.resources {
            if let Some((namespace, name)) = resource.kind.physical_name() {
                if !seen.insert((namespace, name)) {
                    return Err(IacError::collision(namespace, name));
                }
            }
        }

        for output in &stack.outputs {
            if !seen.insert(("export", output.export_name.as_str())) {
                return Err(IacError::collision("export", &output.export_name));
            }
        }
    }

    Ok(())
}

/// The built deployment
#[derive(Debug, Clone)]
pub struct Assembly {
    prefix: NamePrefix,
    storage: StorageStack,
    identity: IdentityStack,
    stacks: Vec<Stack>,
}

impl Assembly {
    pub fn prefix(&self) -> &NamePrefix {
        &self.prefix
    }

    pub fn storage(&self) -> &StorageStack {
        &self.storage
    }

    pub fn identity(&self) -> &IdentityStack {
        &self.identity
    }

    /// Stacks in deployment order
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn stack_names(&self) -> Vec<&str> {
        self.stacks.iter().map(|s| s.name.as_str()).collect()
    }

    /// Effective partner permissions on the exchange buckets
    pub fn access_report(&self) -> AccessReport {
        AccessReport::evaluate(&self.identity, &PolicyEngine::new())
    }

    /// Render the templates and manifest
    pub fn synth(&self) -> Result<CloudAssembly> {
        let report = self.access_report();
        report.verify_handoff(&self.identity)?;
        CloudAssembly::synthesize(&self.stacks)
    }
}
