//! ARN construction for S3 resources

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// AWS partition the deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    #[serde(rename = "aws")]
    Aws,
    #[serde(rename = "aws-cn")]
    AwsCn,
    #[serde(rename = "aws-us-gov")]
    AwsUsGov,
}

impl Partition {
    /// Partition used when neither a flag nor a region says otherwise
    pub const DEFAULT: Partition = Partition::AwsCn;

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Aws => "aws",
            Partition::AwsCn => "aws-cn",
            Partition::AwsUsGov => "aws-us-gov",
        }
    }

    /// Infer the partition from a region name
    pub fn for_region(region: &str) -> Partition {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Partition::Aws),
            "aws-cn" => Ok(Partition::AwsCn),
            "aws-us-gov" => Ok(Partition::AwsUsGov),
            _ => Err(format!(
                "Invalid partition '{}'. Valid options: aws, aws-cn, aws-us-gov",
                s
            )),
        }
    }
}

/// `arn:{partition}:s3:::{bucket}`
pub fn bucket_arn(partition: Partition, bucket: &str) -> String {
    format!("arn:{}:s3:::{}", partition, bucket)
}

/// `arn:{partition}:s3:::{bucket}/*`, every object in the bucket
pub fn bucket_objects_arn(partition: Partition, bucket: &str) -> String {
    format!("{}/*", bucket_arn(partition, bucket))
}

/// `arn:{partition}:s3:::{bucket}/{key}`
pub fn object_arn(partition: Partition, bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket_arn(partition, bucket), key)
}

/// `arn:{partition}:s3:::*`, every bucket in the account
pub fn all_buckets_arn(partition: Partition) -> String {
    bucket_arn(partition, "*")
}
