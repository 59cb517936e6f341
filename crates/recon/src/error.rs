use std::fmt;

#[derive(Debug)]
pub enum MergeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty schema, bad column reference, etc.).
    ConfigValidation(String),
    /// A mandatory input dataset is empty or absent.
    EmptyDataset { role: &'static str },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyDataset { role } => {
                write!(f, "dataset '{role}' is empty — nothing to reconcile")
            }
        }
    }
}

impl std::error::Error for MergeError {}
