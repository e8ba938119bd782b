//! End-to-end synthesis tests
//!
//! Builds the full deployment from a tag document and checks the rendered
//! templates and manifest, both in memory and on disk.

use s3_exchange_stack::config::ConfigFormat;
use s3_exchange_stack::{
    AppBuilder, Assembly, AssemblyManifest, CloudAssembly, IacError, Partition, TagDocument,
};
use serde_json::Value;

const TAGS: &str = "\
project: B2B Marketplace
environment: prod
owner: data-platform
cost-center:
";

fn assembly(partition: Partition) -> Assembly {
    let doc = TagDocument::parse(TAGS, ConfigFormat::Yaml).unwrap();
    AppBuilder::new()
        .document(doc)
        .account("123456789012")
        .region("cn-northwest-1")
        .partition(partition)
        .build()
        .unwrap()
        .build()
        .unwrap()
}

fn synth() -> CloudAssembly {
    assembly(Partition::AwsCn).synth().unwrap()
}

/// Find the single resource whose logical id starts with `construct`
fn resource<'a>(template: &'a Value, construct: &str) -> &'a Value {
    let resources = template["Resources"].as_object().unwrap();
    let matches: Vec<&Value> = resources
        .iter()
        .filter(|(id, _)| id.starts_with(construct) && id.len() == construct.len() + 8)
        .map(|(_, r)| r)
        .collect();
    assert_eq!(matches.len(), 1, "expected one {} resource", construct);
    matches[0]
}

fn tag<'a>(resource: &'a Value, key: &str) -> Option<&'a str> {
    resource["Properties"]["Tags"]
        .as_array()?
        .iter()
        .find(|t| t["Key"] == key)
        .and_then(|t| t["Value"].as_str())
}

#[test]
fn test_storage_template_buckets() {
    let cloud = synth();
    let template = cloud.template("b2b-marketplace-prod-s3").unwrap();
    let resources = template["Resources"].as_object().unwrap();
    assert_eq!(resources.len(), 5);
    assert!(resources
        .values()
        .all(|r| r["Type"] == "AWS::S3::Bucket"
            && r["DeletionPolicy"] == "Delete"
            && r["UpdateReplacePolicy"] == "Delete"
            && r["Properties"]["VersioningConfiguration"]["Status"] == "Enabled"));

    let expected = [
        ("AccessLogsBucket", "b2b-marketplace-prod-bucket-access-logs"),
        ("ToCasmartBucket", "b2b-marketplace-prod-data-to-casmart"),
        ("ToThermoFisherBucket", "b2b-marketplace-prod-data-to-thermofisher"),
        ("ConfigDbBucket", "b2b-marketplace-prod-config-db-backup"),
        ("LogsBucket", "b2b-marketplace-prod-log"),
    ];
    for (construct, name) in expected {
        assert_eq!(resource(template, construct)["Properties"]["BucketName"], name);
    }
}

#[test]
fn test_log_sink_and_delivery() {
    let cloud = synth();
    let template = cloud.template("b2b-marketplace-prod-s3").unwrap();

    let sink = resource(template, "AccessLogsBucket");
    assert_eq!(sink["Properties"]["AccessControl"], "LogDeliveryWrite");
    let block = &sink["Properties"]["PublicAccessBlockConfiguration"];
    for key in [
        "BlockPublicAcls",
        "BlockPublicPolicy",
        "IgnorePublicAcls",
        "RestrictPublicBuckets",
    ] {
        assert_eq!(block[key], true);
    }
    assert!(sink["Properties"].get("LoggingConfiguration").is_none());

    let sink_id = template["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .find(|(_, r)| std::ptr::eq(*r, sink))
        .map(|(id, _)| id.clone())
        .unwrap();

    for (construct, prefix) in [
        ("ToCasmartBucket", "casmart"),
        ("ToThermoFisherBucket", "thermofisher"),
        ("ConfigDbBucket", "config"),
        ("LogsBucket", "log"),
    ] {
        let logging = &resource(template, construct)["Properties"]["LoggingConfiguration"];
        assert_eq!(logging["DestinationBucketName"]["Ref"], sink_id.as_str());
        assert_eq!(logging["LogFilePrefix"], prefix);
    }
}

#[test]
fn test_lifecycle_windows() {
    let cloud = synth();
    let template = cloud.template("b2b-marketplace-prod-s3").unwrap();

    let rules = |construct: &str| -> Vec<Value> {
        resource(template, construct)["Properties"]["LifecycleConfiguration"]["Rules"]
            .as_array()
            .unwrap()
            .clone()
    };
    let rule = |rules: &[Value], id: &str| -> Value {
        rules.iter().find(|r| r["Id"] == id).cloned().unwrap()
    };

    for (construct, expire, noncurrent, transition) in [
        ("AccessLogsBucket", 365, 14, true),
        ("ToCasmartBucket", 7, 7, false),
        ("ToThermoFisherBucket", 30, 30, false),
        ("ConfigDbBucket", 30, 30, false),
        ("LogsBucket", 180, 14, true),
    ] {
        let rules = rules(construct);
        assert_eq!(rules.len(), if transition { 4 } else { 3 }, "{}", construct);
        assert!(rules.iter().all(|r| r["Status"] == "Enabled"));

        let abort = rule(&rules, "abort-incomplete-multipart-upload");
        assert_eq!(abort["AbortIncompleteMultipartUpload"]["DaysAfterInitiation"], 7);
        assert_eq!(rule(&rules, "expiration")["ExpirationInDays"], expire);
        assert_eq!(
            rule(&rules, "noncurrent-version-expiration")["NoncurrentVersionExpiration"]
                ["NoncurrentDays"],
            noncurrent
        );

        let glacier = rules.iter().find(|r| r["Id"] == "transitions-to-glacier");
        assert_eq!(glacier.is_some(), transition, "{}", construct);
        if let Some(glacier) = glacier {
            assert_eq!(glacier["Transitions"][0]["StorageClass"], "GLACIER");
            assert_eq!(glacier["Transitions"][0]["TransitionInDays"], 30);
            assert_eq!(glacier["NoncurrentVersionTransitions"][0]["TransitionInDays"], 30);
        }
    }
}

#[test]
fn test_tags_on_buckets_and_users() {
    let cloud = synth();

    let storage = cloud.template("b2b-marketplace-prod-s3").unwrap();
    let bucket = resource(storage, "LogsBucket");
    assert_eq!(tag(bucket, "application"), Some("S3 Bucket"));
    assert_eq!(tag(bucket, "owner"), Some("data-platform"));
    assert_eq!(tag(bucket, "project"), Some("B2B Marketplace"));
    assert_eq!(tag(bucket, "environment"), Some("prod"));
    assert_eq!(tag(bucket, "cost-center"), Some(" "));

    let identity = cloud.template("b2b-marketplace-prod-iam").unwrap();
    let user = resource(identity, "CasmartUser");
    assert_eq!(tag(user, "application"), Some("IAM"));
    assert_eq!(tag(user, "owner"), Some("data-platform"));

    for construct in ["CasmartGroup", "CasmartPolicy", "CasmartUserKey"] {
        assert!(resource(identity, construct)["Properties"]
            .get("Tags")
            .is_none());
    }
}

#[test]
fn test_identity_template() {
    let cloud = synth();
    let template = cloud.template("b2b-marketplace-prod-iam").unwrap();
    assert_eq!(template["Resources"].as_object().unwrap().len(), 8);

    let group = resource(template, "ThermoFisherGroup");
    assert_eq!(group["Type"], "AWS::IAM::Group");
    assert_eq!(
        group["Properties"]["GroupName"],
        "b2b-marketplace-prod-iam-thermofisher"
    );

    let policy = resource(template, "ThermoFisherPolicy");
    assert_eq!(policy["Type"], "AWS::IAM::ManagedPolicy");
    assert_eq!(
        policy["Properties"]["ManagedPolicyName"],
        "b2b-marketplace-prod-iam-thermofisher"
    );
    assert_eq!(
        policy["Properties"]["Description"],
        "The policy controls who can access B2B Marketplace S3 buckets on the ThermoFisher side."
    );
    assert_eq!(policy["Properties"]["PolicyDocument"]["Version"], "2012-10-17");
    assert_eq!(
        policy["Properties"]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .len(),
        4
    );

    let user = resource(template, "ThermoFisherUser");
    assert_eq!(
        user["Properties"]["UserName"],
        "b2b-marketplace-prod-iam-thermofisher-api-user"
    );
    let group_ref = user["Properties"]["Groups"][0]["Ref"].as_str().unwrap();
    assert!(group_ref.starts_with("ThermoFisherGroup"));

    let key = resource(template, "ThermoFisherUserKey");
    assert_eq!(key["Type"], "AWS::IAM::AccessKey");
    assert!(key["Properties"]["UserName"]["Ref"]
        .as_str()
        .unwrap()
        .starts_with("ThermoFisherUser"));
}

#[test]
fn test_identity_outputs() {
    let cloud = synth();
    let template = cloud.template("b2b-marketplace-prod-iam").unwrap();
    let outputs = template["Outputs"].as_object().unwrap();
    assert_eq!(outputs.len(), 6);

    let export = |name: &str| -> &Value {
        outputs
            .values()
            .find(|o| o["Export"]["Name"] == name)
            .unwrap_or_else(|| panic!("missing export {}", name))
    };

    for partner in ["ThermoFisher", "Casmart"] {
        let username = export(&format!("{}Username", partner));
        assert!(username["Value"]["Ref"]
            .as_str()
            .unwrap()
            .starts_with(&format!("{}User", partner)));

        let key_id = export(&format!("{}AccessKeyId", partner));
        assert!(key_id["Value"]["Ref"]
            .as_str()
            .unwrap()
            .starts_with(&format!("{}UserKey", partner)));

        let secret = export(&format!("{}SecretAccessKey", partner));
        assert_eq!(secret["Value"]["Fn::GetAtt"][1], "SecretAccessKey");
    }

    let storage = cloud.template("b2b-marketplace-prod-s3").unwrap();
    assert!(storage.get("Outputs").is_none());
}

#[test]
fn test_partition_in_policy_arns() {
    for (partition, prefix) in [
        (Partition::AwsCn, "arn:aws-cn:s3:::"),
        (Partition::Aws, "arn:aws:s3:::"),
        (Partition::AwsUsGov, "arn:aws-us-gov:s3:::"),
    ] {
        let cloud = assembly(partition).synth().unwrap();
        let template = cloud.template("b2b-marketplace-prod-iam").unwrap();
        let statements = resource(template, "CasmartPolicy")["Properties"]["PolicyDocument"]
            ["Statement"]
            .as_array()
            .unwrap();
        for statement in statements {
            for arn in statement["Resource"].as_array().unwrap() {
                assert!(arn.as_str().unwrap().starts_with(prefix), "{}", arn);
            }
        }
    }
}

#[test]
fn test_write_assembly_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cdk.out");

    let cloud = synth();
    let written = cloud.write_to(&out).unwrap();
    assert_eq!(written.len(), 3);
    assert!(out.join("b2b-marketplace-prod-s3.template.json").exists());
    assert!(out.join("b2b-marketplace-prod-iam.template.json").exists());

    let manifest =
        AssemblyManifest::from_json(&std::fs::read_to_string(out.join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest, *cloud.manifest());

    let iam = &manifest.artifacts["b2b-marketplace-prod-iam"];
    assert_eq!(iam.kind, "aws:cloudformation:stack");
    assert_eq!(iam.environment, "aws://123456789012/cn-northwest-1");
    assert_eq!(iam.dependencies, vec!["b2b-marketplace-prod-s3"]);
    assert_eq!(iam.properties.tags.get("application"), Some("IAM"));
    assert!(manifest.artifacts["b2b-marketplace-prod-s3"]
        .dependencies
        .is_empty());

    let on_disk: Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("b2b-marketplace-prod-iam.template.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(&on_disk, cloud.template("b2b-marketplace-prod-iam").unwrap());
}

#[test]
fn test_synthesis_is_byte_stable() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    synth().write_to(first.path()).unwrap();
    synth().write_to(second.path()).unwrap();

    for file in [
        "manifest.json",
        "b2b-marketplace-prod-s3.template.json",
        "b2b-marketplace-prod-iam.template.json",
    ] {
        assert_eq!(
            std::fs::read(first.path().join(file)).unwrap(),
            std::fs::read(second.path().join(file)).unwrap(),
            "{} differs between runs",
            file
        );
    }
}

#[test]
fn test_invalid_project_rejected() {
    let doc = TagDocument::parse("project: 'shop!'\nenvironment: dev\n", ConfigFormat::Yaml)
        .unwrap();
    let err = AppBuilder::new().document(doc).build().unwrap_err();
    assert!(matches!(err, IacError::InvalidNamePrefix(_)));
}
