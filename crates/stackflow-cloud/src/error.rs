//! Resource graph error types

use thiserror::Error;

/// Errors raised while building or synthesizing the resource graph
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid logical id '{0}': only ASCII letters and digits are allowed")]
    InvalidLogicalId(String),

    #[error("Stack '{stack}' already contains a resource named '{logical_id}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("Stack name '{0}' is used by more than one stack")]
    DuplicateStack(String),

    #[error("Stack '{stack}' references unknown stack '{referenced}'")]
    UnknownStack { stack: String, referenced: String },

    #[error(
        "Stack '{consumer}' references stack '{producer}', which is added after it; \
         producers must be added before their consumers"
    )]
    ForwardReference { consumer: String, producer: String },

    #[error("Resource '{logical_id}' in stack '{stack}' depends on unknown resource '{depends_on}'")]
    UnknownDependency {
        stack: String,
        logical_id: String,
        depends_on: String,
    },

    #[error("Resource '{logical_id}' in stack '{stack}' references unknown resource '{referenced}'")]
    UnknownResource {
        stack: String,
        logical_id: String,
        referenced: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
