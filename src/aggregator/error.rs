use crate::media::Handle;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Invalid arguments: no usable image source")]
    InvalidArguments,

    #[error("No valid items to show")]
    NoValidItems,

    #[error("Node not found: {0}")]
    NodeNotFound(Handle),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}
