//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file or secrets.yaml couldn't be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid YAML: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `!include`, `!secret` or `!env_var` tag that can't be resolved
    #[error("cannot resolve {tag} {argument}: {reason}")]
    Tag {
        tag: &'static str,
        argument: String,
        reason: String,
    },

    /// A section is missing keys or has values of the wrong type
    #[error("invalid {section} section: {reason}")]
    Section { section: String, reason: String },

    /// A key is present but its value is out of range
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
