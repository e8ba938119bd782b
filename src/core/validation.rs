//! Validation for resource names
//!
//! Every physical name in the deployment is derived from a single
//! [`NamePrefix`] (`{project}-{environment}`). This module owns the rules for
//! that prefix and for the cloud-side names built from it.

use crate::error::{IacError, Result};
use regex::Regex;

/// Validated `{project}-{environment}` naming prefix
///
/// # Rules
/// - Lowercase letters (a-z), numbers (0-9), hyphens (-) only
/// - Must start and end with letter or number (not hyphen)
/// - No consecutive hyphens
///
/// # Examples
///
/// ```
/// use s3_exchange_stack::NamePrefix;
///
/// let prefix = NamePrefix::new("B2B Marketplace", "prod").unwrap();
/// assert_eq!(prefix.as_str(), "b2b-marketplace-prod");
/// assert_eq!(prefix.name("log"), "b2b-marketplace-prod-log");
///
/// assert!(NamePrefix::new("B2B Marketplace", "Prod").is_err()); // uppercase environment
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePrefix(String);

impl NamePrefix {
    /// Pattern for valid kebab-case prefixes
    const PATTERN: &'static str = r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$";

    /// Longest prefix that still leaves room for the longest bucket suffix
    /// (`-data-to-thermofisher`, 21 characters) inside the 63 character
    /// bucket name limit. IAM user names are checked against their own limit.
    pub const MAX_LENGTH: usize = 42;

    /// Build a prefix from a raw project title and an environment name
    ///
    /// The project is normalised with [`normalize_project`]; the environment
    /// is used verbatim.
    pub fn new(project: &str, environment: &str) -> Result<Self> {
        let prefix = format!("{}-{}", normalize_project(project), environment);
        Self::parse(prefix)
    }

    /// Validate an already-joined prefix
    pub fn parse(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        Self::validate_prefix(&prefix)?;
        Ok(NamePrefix(prefix))
    }

    fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.is_empty() {
            return Err(IacError::InvalidNamePrefix(
                "prefix cannot be empty".to_string(),
            ));
        }

        if prefix.len() > Self::MAX_LENGTH {
            return Err(IacError::InvalidNamePrefix(format!(
                "prefix '{}' too long (max {} characters)",
                prefix,
                Self::MAX_LENGTH
            )));
        }

        let re = Regex::new(Self::PATTERN)
            .map_err(|e| IacError::InvalidNamePrefix(e.to_string()))?;
        if !re.is_match(prefix) {
            return Err(IacError::InvalidNamePrefix(format!(
                "prefix '{}' must be kebab-case: lowercase letters, numbers, and hyphens only",
                prefix
            )));
        }

        if prefix.contains("--") {
            return Err(IacError::InvalidNamePrefix(format!(
                "prefix '{}' cannot contain consecutive hyphens",
                prefix
            )));
        }

        Ok(())
    }

    /// Derive a resource name: `{prefix}-{suffix}`
    pub fn name(&self, suffix: &str) -> String {
        format!("{}-{}", self.0, suffix)
    }

    /// Get the prefix as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NamePrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-case a project title and replace spaces with hyphens
///
/// ```
/// use s3_exchange_stack::core::validation::normalize_project;
///
/// assert_eq!(normalize_project("B2B Marketplace"), "b2b-marketplace");
/// ```
pub fn normalize_project(project: &str) -> String {
    project.to_lowercase().replace(' ', "-")
}

/// Validate an S3 bucket name
///
/// Checks the general-purpose bucket rules: 3-63 characters, lowercase
/// letters, numbers, dots and hyphens, starting and ending with a letter or
/// number, no adjacent dots, and none of the reserved prefixes/suffixes.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(IacError::InvalidBucketName(format!(
            "'{}' must be between 3 and 63 characters",
            name
        )));
    }

    let re = Regex::new(r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$")
        .map_err(|e| IacError::InvalidBucketName(e.to_string()))?;
    if !re.is_match(name) {
        return Err(IacError::InvalidBucketName(format!(
            "'{}' may only contain lowercase letters, numbers, dots and hyphens",
            name
        )));
    }

    if name.contains("..") {
        return Err(IacError::InvalidBucketName(format!(
            "'{}' cannot contain adjacent dots",
            name
        )));
    }

    if name.starts_with("xn--") || name.ends_with("-s3alias") || name.ends_with("--ol-s3") {
        return Err(IacError::InvalidBucketName(format!(
            "'{}' uses a reserved prefix or suffix",
            name
        )));
    }

    Ok(())
}

/// Validate an IAM group, user or managed-policy name against its length limit
pub fn validate_iam_name(kind: &str, name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() || name.len() > max_len {
        return Err(IacError::InvalidIamName(format!(
            "{} name '{}' must be between 1 and {} characters",
            kind, name, max_len
        )));
    }

    let re = Regex::new(r"^[\w+=,.@-]+$").map_err(|e| IacError::InvalidIamName(e.to_string()))?;
    if !re.is_match(name) {
        return Err(IacError::InvalidIamName(format!(
            "{} name '{}' contains characters outside [A-Za-z0-9+=,.@_-]",
            kind, name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_project_title() {
        let prefix = NamePrefix::new("B2B Marketplace", "prod").unwrap();
        assert_eq!(prefix.as_str(), "b2b-marketplace-prod");
        assert_eq!(prefix.to_string(), "b2b-marketplace-prod");
    }

    #[test]
    fn test_invalid_prefixes() {
        assert!(NamePrefix::parse("").is_err()); // empty
        assert!(NamePrefix::new("shop", "Prod").is_err()); // uppercase environment
        assert!(NamePrefix::new("shop", "prod_eu").is_err()); // underscore
        assert!(NamePrefix::new("shop", "").is_err()); // trailing hyphen
        assert!(NamePrefix::new("two  spaces", "prod").is_err()); // consecutive hyphens
        assert!(NamePrefix::new("shop.io", "prod").is_err()); // dot
        assert!(NamePrefix::new(&"x".repeat(38), "prod").is_err()); // too long
    }

    #[test]
    fn test_name_derivation() {
        let prefix = NamePrefix::parse("shop-dev").unwrap();
        assert_eq!(prefix.name("bucket-access-logs"), "shop-dev-bucket-access-logs");
        assert_eq!(prefix.name("iam-casmart"), "shop-dev-iam-casmart");
    }

    #[test]
    fn test_max_prefix_fits_every_bucket() {
        use crate::storage::{ACCESS_LOGS, CONFIG_DB, LOGS, TO_CASMART, TO_THERMOFISHER};

        let prefix = NamePrefix::parse("a".repeat(NamePrefix::MAX_LENGTH)).unwrap();
        for spec in [ACCESS_LOGS, TO_CASMART, TO_THERMOFISHER, CONFIG_DB, LOGS] {
            assert!(
                validate_bucket_name(&prefix.name(spec.suffix)).is_ok(),
                "{} does not fit",
                spec.suffix
            );
        }

        // One more character pushes the longest bucket name past 63
        let longest = format!("{}-{}", "a".repeat(NamePrefix::MAX_LENGTH + 1), TO_THERMOFISHER.suffix);
        assert!(validate_bucket_name(&longest).is_err());
        assert!(NamePrefix::parse("a".repeat(NamePrefix::MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_bucket_names() {
        assert!(validate_bucket_name("b2b-marketplace-prod-log").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("Upper-case").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("double..dot").is_err());
        assert!(validate_bucket_name("xn--punycode").is_err());
    }

    #[test]
    fn test_iam_names() {
        assert!(validate_iam_name("user", "shop-prod-iam-casmart-api-user", 64).is_ok());
        assert!(validate_iam_name("user", &"u".repeat(65), 64).is_err());
        assert!(validate_iam_name("group", "has space", 128).is_err());
        assert!(validate_iam_name("group", "", 128).is_err());
    }
}
