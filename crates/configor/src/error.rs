//! error types returned while resolving a configuration
use crate::format::Format;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    UnmatchedKeys(#[from] UnmatchedKeysError),
    #[error("{0} is required, but blank")]
    MissingRequiredField(String),
    #[error("invalid config, {0} should be a struct")]
    InvalidTarget(String),
    #[error("Unable to parse value from {origin}")]
    Literal {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Unable to convert configuration")]
    Convert(#[source] serde_yaml::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Unable to parse json")]
    Json(#[from] serde_json::Error),
    #[error("Unable to parse toml")]
    Toml(#[from] toml::de::Error),
    #[error("Unable to parse yaml")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unable to read {key} as the type of its field")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0} document must be a mapping at its root")]
    NotAMapping(Format),
    #[error(transparent)]
    UnmatchedKeys(#[from] UnmatchedKeysError),
    #[error("failed to decode config")]
    Unrecognized,
}

/// Keys found in a file that the target does not declare
///
/// Only produced when unmatched keys are configured to be an error.
#[derive(thiserror::Error, derive_new::new, Debug, Clone, PartialEq)]
#[error("There are keys in the config file that do not match any field in the given struct: {keys:?}")]
pub struct UnmatchedKeysError {
    pub keys: Vec<String>,
}

impl UnmatchedKeysError {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}
