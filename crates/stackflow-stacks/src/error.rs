//! Stack construction errors

use stackflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Invalid environment context: {0}")]
    InvalidContext(String),

    #[error("Invalid construct '{id}': {message}")]
    InvalidConstruct { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, StackError>;
