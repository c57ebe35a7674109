use thiserror::Error;

pub type OrdrfsResult<T> = Result<T, OrdrfsError>;

#[derive(Debug, Error)]
pub enum OrdrfsError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
