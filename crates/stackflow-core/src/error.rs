use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("context value '{0}' is not set")]
    MissingSelector(&'static str),

    #[error("unknown environment type '{0}' (expected one of test, dev, stage, prod, common)")]
    UnknownEnvType(String),

    #[error("no context entry for environment '{0}'")]
    EnvironmentNotFound(String),

    #[error("malformed context entry for environment '{env}': {message}")]
    MalformedEntry { env: String, message: String },

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
