use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Rendition unavailable: {0}")]
    Unavailable(String),

    #[error("Transfer backend error: {0}")]
    BackendError(String),
}
