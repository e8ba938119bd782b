//! Effective access of each partner to each exchange bucket
//!
//! Evaluates the synthesized policies rather than the grant table, so the
//! report reflects exactly what the deployed documents permit.

use super::{Action, IdentityStack, Partner, PolicyEngine};
use crate::arn;
use crate::error::{IacError, Result};
use crate::storage::BucketHandle;
use std::fmt;

/// Object key used when probing object-level actions
pub const PROBE_KEY: &str = "exchange/probe.bin";

/// One partner's permissions on one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRow {
    pub partner: Partner,
    /// Role of the bucket in the exchange (`to_casmart`, `logs`, ...)
    pub bucket: &'static str,
    pub bucket_name: String,
    pub list: bool,
    pub get: bool,
    pub put: bool,
    pub delete: bool,
}

/// Partner x bucket permission matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReport {
    rows: Vec<AccessRow>,
}

impl AccessReport {
    pub fn evaluate(identity: &IdentityStack, engine: &PolicyEngine) -> Self {
        let partition = identity.partition();
        let mut rows = Vec::new();

        for partner in Partner::ALL {
            let policy = &identity.partner(partner).policy.document;
            for (label, bucket) in identity.buckets().iter() {
                let bucket_arn = bucket.arn(partition);
                let object_arn = arn::object_arn(partition, bucket.bucket_name(), PROBE_KEY);
                rows.push(AccessRow {
                    partner,
                    bucket: label,
                    bucket_name: bucket.bucket_name().to_string(),
                    list: engine.is_allowed(policy, &Action::ListBucket, &bucket_arn),
                    get: engine.is_allowed(policy, &Action::GetObject, &object_arn),
                    put: engine.is_allowed(policy, &Action::PutObject, &object_arn),
                    delete: engine.is_allowed(policy, &Action::DeleteObject, &object_arn),
                });
            }
        }

        AccessReport { rows }
    }

    pub fn rows(&self) -> &[AccessRow] {
        &self.rows
    }

    pub fn row(&self, partner: Partner, bucket: &str) -> Option<&AccessRow> {
        self.rows
            .iter()
            .find(|r| r.partner == partner && r.bucket == bucket)
    }

    fn buckets_where(&self, partner: Partner, pred: impl Fn(&AccessRow) -> bool) -> Vec<&'static str> {
        self.rows
            .iter()
            .filter(|r| r.partner == partner && pred(*r))
            .map(|r| r.bucket)
            .collect()
    }

    pub fn listable_by(&self, partner: Partner) -> Vec<&'static str> {
        self.buckets_where(partner, |r| r.list)
    }

    pub fn readable_by(&self, partner: Partner) -> Vec<&'static str> {
        self.buckets_where(partner, |r| r.get)
    }

    pub fn writable_by(&self, partner: Partner) -> Vec<&'static str> {
        self.buckets_where(partner, |r| r.put)
    }

    /// Check the read/write handoff
    ///
    /// Each partner reads exactly the bucket addressed to it, writes the
    /// bucket addressed to the other party, never writes its own inbound
    /// bucket, and deletes nothing. Listing, reading and writing must match
    /// [`Partner::grants`] exactly.
    pub fn verify_handoff(&self, identity: &IdentityStack) -> Result<()> {
        let buckets = identity.buckets();

        for partner in Partner::ALL {
            let inbound = label_of(identity, partner.inbound(buckets).bucket_name());
            let outbound = label_of(identity, partner.counterparty().inbound(buckets).bucket_name());

            let readable = self.readable_by(partner);
            if readable != [inbound] {
                return Err(IacError::InvalidPolicy(format!(
                    "{} may read {:?}, expected only {}",
                    partner, readable, inbound
                )));
            }

            let writable = self.writable_by(partner);
            if !writable.contains(&outbound) {
                return Err(IacError::InvalidPolicy(format!(
                    "{} cannot write {}",
                    partner, outbound
                )));
            }
            if writable.contains(&inbound) {
                return Err(IacError::InvalidPolicy(format!(
                    "{} may write its own inbound bucket {}",
                    partner, inbound
                )));
            }

            let grants = partner.grants(buckets);
            let checks = [
                ("list", self.listable_by(partner), &grants.list),
                ("read", readable, &grants.get),
                ("write", writable, &grants.put),
            ];
            for (verb, actual, granted) in checks {
                let expected = labels_in(identity, granted);
                if actual != expected {
                    return Err(IacError::InvalidPolicy(format!(
                        "{} may {} {:?}, expected {:?}",
                        partner, verb, actual, expected
                    )));
                }
            }

            if let Some(row) = self.rows.iter().find(|r| r.partner == partner && r.delete) {
                return Err(IacError::InvalidPolicy(format!(
                    "{} may delete from {}",
                    partner, row.bucket
                )));
            }
        }

        Ok(())
    }
}

/// Labels of `handles` in report order
fn labels_in(identity: &IdentityStack, handles: &[&BucketHandle]) -> Vec<&'static str> {
    identity
        .buckets()
        .iter()
        .filter(|(_, bucket)| handles.iter().any(|h| h.bucket_name() == bucket.bucket_name()))
        .map(|(label, _)| label)
        .collect()
}

fn label_of(identity: &IdentityStack, bucket_name: &str) -> &'static str {
    identity
        .buckets()
        .iter()
        .find(|(_, handle)| handle.bucket_name() == bucket_name)
        .map(|(label, _)| label)
        .unwrap_or("unknown")
}

impl fmt::Display for AccessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} {:<16} {:<48} {:^6} {:^6} {:^6} {:^6}",
            "PARTNER", "BUCKET", "NAME", "LIST", "GET", "PUT", "DELETE"
        )?;
        let mark = |allowed: bool| if allowed { "yes" } else { "-" };
        for row in &self.rows {
            writeln!(
                f,
                "{:<14} {:<16} {:<48} {:^6} {:^6} {:^6} {:^6}",
                row.partner.display_name(),
                row.bucket,
                row.bucket_name,
                mark(row.list),
                mark(row.get),
                mark(row.put),
                mark(row.delete)
            )?;
        }
        Ok(())
    }
}
