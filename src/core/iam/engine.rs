//! Policy evaluation engine with deny precedence
//!
//! Evaluates identity policies to determine if an action on a resource is
//! allowed. Explicit deny beats allow; no matching allow is an implicit
//! deny.

use super::{Action, Effect, PolicyDocument};
use tracing::trace;

/// Outcome of evaluating one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    ExplicitDeny,
    ImplicitDeny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Policy evaluation engine
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        PolicyEngine
    }

    /// Evaluate if an action on a resource is allowed by the policy
    ///
    /// # Examples
    ///
    /// ```
    /// use s3_exchange_stack::iam::{Action, Decision, PolicyDocument, PolicyEngine, Statement};
    ///
    /// let engine = PolicyEngine::new();
    /// let mut policy = PolicyDocument::new();
    /// policy.add_statement(Statement::allow(
    ///     "ReadInbox",
    ///     vec![Action::GetObject],
    ///     vec!["arn:aws:s3:::inbox/*".to_string()],
    /// ));
    ///
    /// assert_eq!(engine.evaluate(&policy, &Action::GetObject, "arn:aws:s3:::inbox/a.csv"), Decision::Allow);
    /// assert_eq!(engine.evaluate(&policy, &Action::PutObject, "arn:aws:s3:::inbox/a.csv"), Decision::ImplicitDeny);
    /// ```
    pub fn evaluate(&self, policy: &PolicyDocument, action: &Action, resource: &str) -> Decision {
        self.evaluate_all(std::iter::once(policy), action, resource)
    }

    /// Evaluate the union of several policies, as attached to one principal
    pub fn evaluate_all<'a>(
        &self,
        policies: impl IntoIterator<Item = &'a PolicyDocument>,
        action: &Action,
        resource: &str,
    ) -> Decision {
        let mut has_allow = false;

        for policy in policies {
            for statement in &policy.statement {
                if !statement.applies_to(action, resource) {
                    continue;
                }

                match statement.effect {
                    Effect::Deny => {
                        trace!(
                            "{} on {} denied by {:?}",
                            action,
                            resource,
                            statement.sid
                        );
                        return Decision::ExplicitDeny;
                    }
                    Effect::Allow => {
                        has_allow = true;
                    }
                }
            }
        }

        if has_allow {
            Decision::Allow
        } else {
            Decision::ImplicitDeny
        }
    }

    /// Shorthand for `evaluate(..).is_allowed()`
    pub fn is_allowed(&self, policy: &PolicyDocument, action: &Action, resource: &str) -> bool {
        self.evaluate(policy, action, resource).is_allowed()
    }
}
