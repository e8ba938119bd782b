//! Identity and Access Management (IAM) for the exchange
//!
//! Provides:
//! - IAM JSON policy documents with S3 action verbs
//! - Allow/Deny evaluation with explicit deny precedence
//! - ARN wildcard matching (`*`, `?`)
//! - The per-partner group / managed policy / user / access key builder
//! - An access report that checks the read/write handoff

mod access;
mod engine;
mod identity;
mod pattern;
mod policy;

pub use access::{AccessReport, AccessRow, PROBE_KEY};
pub use engine::{Decision, PolicyEngine};
pub use identity::{
    partner_policy, AccessKey, BucketGrants, Group, IdentityStack, ManagedPolicy, Partner,
    PartnerIdentity, User, APPLICATION, BUCKET_LISTING_SID, CONSOLE_LISTING_SID, GET_OBJECT_SID,
    PUT_OBJECT_SID, STACK_SUFFIX,
};
pub use pattern::PatternMatcher;
pub use policy::{Action, Effect, PolicyDocument, ResourceScope, Statement, POLICY_VERSION};
