//! Identity group: one group, managed policy, user and access key per partner
//!
//! The partners hand data to each other through the exchange buckets. Each
//! partner reads only the bucket addressed to it and writes into the bucket
//! addressed to the other party; ThermoFisher additionally writes the
//! config and log buckets and can list them.

use super::{Action, PolicyDocument, Statement};
use crate::arn::{self, Partition};
use crate::error::Result;
use crate::stack::{LogicalId, Output, OutputValue, ResourceKind, StackDefinition};
use crate::storage::{BucketHandle, ExchangeBuckets};
use crate::validation::{validate_iam_name, NamePrefix};
use tracing::{debug, info};

/// Suffix of the identity stack name
pub const STACK_SUFFIX: &str = "iam";

/// Value of the `application` tag on the identity stack
pub const APPLICATION: &str = "IAM";

pub const CONSOLE_LISTING_SID: &str = "AllowUserToSeeBucketListInTheConsole";
pub const BUCKET_LISTING_SID: &str = "AllowListingOfSpecificBucket";
pub const GET_OBJECT_SID: &str = "AllowGetObjectOfSpecificBucket";
pub const PUT_OBJECT_SID: &str = "AllowPutObjectOfSpecificBucket";

const MAX_GROUP_NAME: usize = 128;
const MAX_POLICY_NAME: usize = 128;
const MAX_USER_NAME: usize = 64;

/// External party of the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partner {
    ThermoFisher,
    Casmart,
}

impl Partner {
    pub const ALL: [Partner; 2] = [Partner::ThermoFisher, Partner::Casmart];

    /// Lowercase form used in physical names
    pub fn slug(&self) -> &'static str {
        match self {
            Partner::ThermoFisher => "thermofisher",
            Partner::Casmart => "casmart",
        }
    }

    /// Display form used in descriptions, construct ids and export names
    pub fn display_name(&self) -> &'static str {
        match self {
            Partner::ThermoFisher => "ThermoFisher",
            Partner::Casmart => "Casmart",
        }
    }

    pub fn counterparty(&self) -> Partner {
        match self {
            Partner::ThermoFisher => Partner::Casmart,
            Partner::Casmart => Partner::ThermoFisher,
        }
    }

    /// The bucket addressed to this partner
    pub fn inbound<'a>(&self, buckets: &'a ExchangeBuckets) -> &'a BucketHandle {
        match self {
            Partner::ThermoFisher => &buckets.to_thermofisher,
            Partner::Casmart => &buckets.to_casmart,
        }
    }

    /// Buckets this partner may list, read and write
    pub fn grants<'a>(&self, buckets: &'a ExchangeBuckets) -> BucketGrants<'a> {
        match self {
            Partner::ThermoFisher => BucketGrants {
                list: vec![
                    &buckets.to_casmart,
                    &buckets.to_thermofisher,
                    &buckets.config_db,
                    &buckets.logs,
                ],
                get: vec![&buckets.to_thermofisher],
                put: vec![&buckets.to_casmart, &buckets.config_db, &buckets.logs],
            },
            Partner::Casmart => BucketGrants {
                list: vec![&buckets.to_casmart, &buckets.to_thermofisher],
                get: vec![&buckets.to_casmart],
                put: vec![&buckets.to_thermofisher],
            },
        }
    }

    pub fn username_export(&self) -> String {
        format!("{}Username", self.display_name())
    }

    pub fn access_key_id_export(&self) -> String {
        format!("{}AccessKeyId", self.display_name())
    }

    pub fn secret_access_key_export(&self) -> String {
        format!("{}SecretAccessKey", self.display_name())
    }
}

impl std::fmt::Display for Partner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which buckets a partner may list, read (`GetObject`) and write (`PutObject`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketGrants<'a> {
    pub list: Vec<&'a BucketHandle>,
    pub get: Vec<&'a BucketHandle>,
    pub put: Vec<&'a BucketHandle>,
}

/// Bucket ARN and `ARN/*` for each bucket, in order
fn bucket_resources(buckets: &[&BucketHandle], partition: Partition) -> Vec<String> {
    buckets
        .iter()
        .flat_map(|b| [b.arn(partition), b.objects_arn(partition)])
        .collect()
}

/// Build the managed policy document for `partner`
pub fn partner_policy(
    partner: Partner,
    buckets: &ExchangeBuckets,
    partition: Partition,
) -> PolicyDocument {
    let grants = partner.grants(buckets);
    let mut policy = PolicyDocument::new();

    policy.add_statement(Statement::allow(
        CONSOLE_LISTING_SID,
        vec![Action::ListAllMyBuckets, Action::GetBucketLocation],
        vec![arn::all_buckets_arn(partition)],
    ));
    policy.add_statement(Statement::allow(
        BUCKET_LISTING_SID,
        vec![Action::GetBucketLocation, Action::ListBucket],
        bucket_resources(&grants.list, partition),
    ));
    policy.add_statement(Statement::allow(
        GET_OBJECT_SID,
        vec![Action::GetObject],
        bucket_resources(&grants.get, partition),
    ));
    policy.add_statement(Statement::allow(
        PUT_OBJECT_SID,
        vec![Action::PutObject],
        bucket_resources(&grants.put, partition),
    ));

    policy
}

/// IAM group with its attached managed policies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub logical_id: LogicalId,
    pub name: String,
    pub managed_policies: Vec<LogicalId>,
}

/// Named, reusable policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub logical_id: LogicalId,
    pub name: String,
    pub description: String,
    pub document: PolicyDocument,
}

/// IAM user and the groups it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub logical_id: LogicalId,
    pub name: String,
    pub groups: Vec<LogicalId>,
}

/// Credential pair bound to one user
///
/// The secret is only readable through the stack output at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub logical_id: LogicalId,
    pub user: LogicalId,
}

/// Everything defined for one partner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerIdentity {
    pub partner: Partner,
    pub group: Group,
    pub policy: ManagedPolicy,
    pub user: User,
    pub access_key: AccessKey,
}

impl PartnerIdentity {
    fn build(
        stack: &str,
        prefix: &NamePrefix,
        project: &str,
        partner: Partner,
        buckets: &ExchangeBuckets,
        partition: Partition,
    ) -> Result<Self> {
        let label = partner.display_name();
        let base_name = prefix.name(&format!("{}-{}", STACK_SUFFIX, partner.slug()));
        let user_name = format!("{}-api-user", base_name);

        validate_iam_name("group", &base_name, MAX_GROUP_NAME)?;
        validate_iam_name("managed policy", &base_name, MAX_POLICY_NAME)?;
        validate_iam_name("user", &user_name, MAX_USER_NAME)?;

        let document = partner_policy(partner, buckets, partition);
        document.validate()?;

        let policy = ManagedPolicy {
            logical_id: LogicalId::new(stack, &format!("{}Policy", label)),
            name: base_name.clone(),
            description: format!(
                "The policy controls who can access {} S3 buckets on the {} side.",
                project, label
            ),
            document,
        };
        let group = Group {
            logical_id: LogicalId::new(stack, &format!("{}Group", label)),
            name: base_name,
            managed_policies: vec![policy.logical_id.clone()],
        };
        let user = User {
            logical_id: LogicalId::new(stack, &format!("{}User", label)),
            name: user_name,
            groups: vec![group.logical_id.clone()],
        };
        let access_key = AccessKey {
            logical_id: LogicalId::new(stack, &format!("{}UserKey", label)),
            user: user.logical_id.clone(),
        };

        debug!(
            "Defined {} identity: group {}, user {}",
            label, group.name, user.name
        );

        Ok(PartnerIdentity {
            partner,
            group,
            policy,
            user,
            access_key,
        })
    }

    /// Username, access key id and secret access key outputs
    pub fn outputs(&self, stack: &str) -> Vec<Output> {
        vec![
            Output::new(
                stack,
                &self.partner.username_export(),
                OutputValue::Ref(self.user.logical_id.clone()),
            ),
            Output::new(
                stack,
                &self.partner.access_key_id_export(),
                OutputValue::Ref(self.access_key.logical_id.clone()),
            ),
            Output::new(
                stack,
                &self.partner.secret_access_key_export(),
                OutputValue::GetAtt(self.access_key.logical_id.clone(), "SecretAccessKey"),
            ),
        ]
    }

    fn resources(&self) -> [ResourceKind; 4] {
        [
            ResourceKind::Group(self.group.clone()),
            ResourceKind::ManagedPolicy(self.policy.clone()),
            ResourceKind::User(self.user.clone()),
            ResourceKind::AccessKey(self.access_key.clone()),
        ]
    }
}

/// The identity group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityStack {
    name: String,
    buckets: ExchangeBuckets,
    partition: Partition,
    pub thermofisher: PartnerIdentity,
    pub casmart: PartnerIdentity,
}

impl IdentityStack {
    /// Define both partners' identities over the given bucket handles
    ///
    /// # Errors
    ///
    /// `DanglingReference` if the handles do not all come from one storage
    /// stack; `InvalidIamName` if a derived name exceeds IAM limits.
    pub fn build(
        prefix: &NamePrefix,
        project: &str,
        buckets: &ExchangeBuckets,
        partition: Partition,
    ) -> Result<Self> {
        buckets.validate()?;

        let name = prefix.name(STACK_SUFFIX);
        let thermofisher =
            PartnerIdentity::build(&name, prefix, project, Partner::ThermoFisher, buckets, partition)?;
        let casmart =
            PartnerIdentity::build(&name, prefix, project, Partner::Casmart, buckets, partition)?;

        info!(
            "Built identity stack {} over buckets of {}",
            name,
            buckets.stack()
        );

        Ok(IdentityStack {
            name,
            buckets: buckets.clone(),
            partition,
            thermofisher,
            casmart,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buckets(&self) -> &ExchangeBuckets {
        &self.buckets
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn partner(&self, partner: Partner) -> &PartnerIdentity {
        match partner {
            Partner::ThermoFisher => &self.thermofisher,
            Partner::Casmart => &self.casmart,
        }
    }

    pub fn partners(&self) -> [&PartnerIdentity; 2] {
        [&self.thermofisher, &self.casmart]
    }
}

impl StackDefinition for IdentityStack {
    fn stack_name(&self) -> &str {
        &self.name
    }

    fn application(&self) -> &'static str {
        APPLICATION
    }

    fn resources(&self) -> Vec<ResourceKind> {
        self.partners()
            .into_iter()
            .flat_map(|p| p.resources())
            .collect()
    }

    fn outputs(&self) -> Vec<Output> {
        self.partners()
            .into_iter()
            .flat_map(|p| p.outputs(&self.name))
            .collect()
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.buckets.stack().to_string()]
    }
}
