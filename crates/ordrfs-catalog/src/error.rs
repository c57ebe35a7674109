use ordrfs_core::OrdrfsError;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("not found in catalog: {0}")]
    NotFound(String),

    #[error("malformed catalog document {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog returned no restaurants")]
    Empty,

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("not supported by this catalog backend: {0}")]
    Unsupported(String),
}

impl CatalogError {
    /// Classify an OpenDAL error raised while touching `path`.
    pub fn from_opendal(path: &str, err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => CatalogError::NotFound(path.to_string()),
            opendal::ErrorKind::Unsupported => {
                CatalogError::Unsupported(format!("{path}: {err}"))
            }
            _ => CatalogError::RemoteUnavailable(format!("{path}: {err}")),
        }
    }
}

impl From<CatalogError> for OrdrfsError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::RemoteUnavailable(msg) => OrdrfsError::RemoteUnavailable(msg),
            other => OrdrfsError::Catalog(other.to_string()),
        }
    }
}
