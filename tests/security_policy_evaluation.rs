//! Policy evaluation security tests - deny precedence, wildcard edges and
//! escalation attempts against the synthesized partner policies

use s3_exchange_stack::iam::{
    Action, Decision, Effect, Partner, PolicyDocument, PolicyEngine, Statement, PUT_OBJECT_SID,
};
use s3_exchange_stack::{IdentityStack, NamePrefix, Partition, StorageStack};

fn identity() -> IdentityStack {
    let prefix = NamePrefix::parse("b2b-marketplace-prod").unwrap();
    let storage = StorageStack::build(&prefix).unwrap();
    IdentityStack::build(
        &prefix,
        "B2B Marketplace",
        &storage.exchange_buckets(),
        Partition::AwsCn,
    )
    .unwrap()
}

#[test]
fn test_explicit_deny_overrides_partner_grant() {
    let identity = identity();
    let engine = PolicyEngine::new();
    let casmart = &identity.partner(Partner::Casmart).policy.document;
    let target = "arn:aws-cn:s3:::b2b-marketplace-prod-data-to-thermofisher/in/order.csv";

    assert_eq!(
        engine.evaluate(casmart, &Action::PutObject, target),
        Decision::Allow
    );

    // A guardrail policy attached next to the partner policy wins
    let mut guardrail = PolicyDocument::new();
    guardrail.add_statement(Statement::new(
        Effect::Deny,
        vec![Action::All],
        vec!["arn:aws-cn:s3:::b2b-marketplace-prod-data-to-thermofisher/in/*".to_string()],
    ));

    assert_eq!(
        engine.evaluate_all([casmart, &guardrail], &Action::PutObject, target),
        Decision::ExplicitDeny
    );
    assert_eq!(
        engine.evaluate_all(
            [casmart, &guardrail],
            &Action::PutObject,
            "arn:aws-cn:s3:::b2b-marketplace-prod-data-to-thermofisher/other.csv"
        ),
        Decision::Allow
    );
}

#[test]
fn test_bucket_name_prefix_is_not_a_grant() {
    let identity = identity();
    let engine = PolicyEngine::new();
    let casmart = &identity.partner(Partner::Casmart).policy.document;

    // Names sharing a prefix with a granted bucket must not match
    for resource in [
        "arn:aws-cn:s3:::b2b-marketplace-prod-data-to-casmart-evil/x",
        "arn:aws-cn:s3:::b2b-marketplace-prod-data-to-casmartx/x",
        "arn:aws-cn:s3:::evil-b2b-marketplace-prod-data-to-casmart/x",
    ] {
        assert!(!engine.is_allowed(casmart, &Action::GetObject, resource), "{}", resource);
    }

    // Nested keys are covered by the trailing wildcard
    assert!(engine.is_allowed(
        casmart,
        &Action::GetObject,
        "arn:aws-cn:s3:::b2b-marketplace-prod-data-to-casmart/a/b/c.csv"
    ));
}

#[test]
fn test_partition_mismatch_denied() {
    let identity = identity();
    let engine = PolicyEngine::new();
    let casmart = &identity.partner(Partner::Casmart).policy.document;

    assert_eq!(
        engine.evaluate(
            casmart,
            &Action::GetObject,
            "arn:aws:s3:::b2b-marketplace-prod-data-to-casmart/a.csv"
        ),
        Decision::ImplicitDeny
    );
}

#[test]
fn test_no_partner_can_delete() {
    let identity = identity();
    let engine = PolicyEngine::new();

    for partner in identity.partners() {
        for (_, bucket) in identity.buckets().iter() {
            let object = format!("{}/{}", bucket.arn(Partition::AwsCn), "a.csv");
            assert_eq!(
                engine.evaluate(&partner.policy.document, &Action::DeleteObject, &object),
                Decision::ImplicitDeny
            );
        }
    }
}

#[test]
fn test_wildcard_action_statement() {
    let engine = PolicyEngine::new();
    let mut policy = PolicyDocument::new();
    policy.add_statement(Statement::new(
        Effect::Allow,
        vec![Action::All],
        vec!["arn:aws:s3:::scratch*".to_string()],
    ));

    // '*' in an ARN spans '/' so bucket and objects are both covered
    assert!(engine.is_allowed(&policy, &Action::ListBucket, "arn:aws:s3:::scratch"));
    assert!(engine.is_allowed(&policy, &Action::DeleteObject, "arn:aws:s3:::scratch/a/b"));
    assert!(!engine.is_allowed(&policy, &Action::GetObject, "arn:aws:s3:::other/scratch"));
}

#[test]
fn test_policy_document_round_trips_through_template_json() {
    let identity = identity();
    let document = &identity.partner(Partner::ThermoFisher).policy.document;

    let json = document.to_json().unwrap();
    assert!(json.contains("\"s3:PutObject\""));
    assert!(json.contains(&format!("\"Sid\": \"{}\"", PUT_OBJECT_SID)));

    let parsed = PolicyDocument::from_json(&json).unwrap();
    assert_eq!(&parsed, document);
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_malformed_policy_rejected() {
    let mut policy = PolicyDocument::new();
    assert!(policy.validate().is_err());

    policy.add_statement(Statement::new(
        Effect::Allow,
        vec![Action::GetObject],
        vec!["b2b-marketplace-prod-log/*".to_string()],
    ));
    assert!(policy.validate().is_err());

    assert!(PolicyDocument::from_json(r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:Teleport"],"Resource":["*"]}]}"#).is_err());
}
