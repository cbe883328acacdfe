use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BundleError {
    #[error("failed to get '{url}' ({status})")]
    Fetch {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to download '{url}': {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract bundle archive '{path}': {source}")]
    Extract {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("bundle task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
