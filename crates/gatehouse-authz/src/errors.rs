use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("model has no usable `{0}` definition")]
    MissingDefinition(&'static str),
    #[error("malformed model line {line}: {text}")]
    MalformedModelLine { line: usize, text: String },
    #[error("invalid effect: {0}")]
    InvalidEffect(String),
    #[error("deny rule {subject} {object} {action} needs an `eft` column in the policy definition")]
    DenyWithoutEffect {
        subject: String,
        object: String,
        action: String,
    },
    #[error("grouping policy links {0} to itself")]
    SelfGrouping(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("policy document error: {0}")]
    PolicyDocument(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("policy engine error: {0}")]
    Engine(#[from] casbin::Error),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
