use thiserror::Error;

#[derive(Error, Debug)]
pub enum IacError {
    #[error("Missing required configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed tag document: {0}")]
    MalformedTags(String),

    #[error("Invalid name prefix: {0} (must be kebab-case: lowercase, hyphens, no spaces)")]
    InvalidNamePrefix(String),

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Invalid IAM name: {0}")]
    InvalidIamName(String),

    #[error("Invalid lifecycle rule: {0}")]
    InvalidLifecycle(String),

    #[error("Invalid policy document: {0}")]
    InvalidPolicy(String),

    #[error("Name collision in {namespace}: '{name}' is defined more than once")]
    NameCollision { namespace: String, name: String },

    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl IacError {
    pub(crate) fn collision(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        IacError::NameCollision {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IacError>;
