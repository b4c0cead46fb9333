use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "configuration file not found. Looked in:\n\
        - current directory: stackflow.local.kdl, stackflow.kdl, stackflow.json, cdk.json\n\
        - ./.stackflow/ directory\n\
        - ~/.config/stackflow/stackflow.kdl\n\
        Set STACKFLOW_CONFIG_PATH or pass --config to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
