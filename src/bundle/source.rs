use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::BundleError;

/// Where a bundle archive comes from.
#[async_trait]
pub trait BundleSource: Send + Sync + std::fmt::Debug {
    /// Writes the complete archive to `archive`.
    async fn fetch(&self, archive: &Path) -> Result<(), BundleError>;
}

/// Downloads the archive over HTTP(S), following redirects.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BundleSource for HttpSource {
    async fn fetch(&self, archive: &Path) -> Result<(), BundleError> {
        let transport = |source: reqwest::Error| BundleError::Transport {
            url: self.url.clone(),
            source,
        };

        let mut response = self.client.get(&self.url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BundleError::Fetch {
                url: self.url.clone(),
                status,
            });
        }
        debug!(
            url = %self.url,
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            content_length = ?response.content_length(),
            "downloading bundle"
        );

        let mut file = tokio::fs::File::create(archive)
            .await
            .map_err(BundleError::io(archive))?;
        let written = async {
            while let Some(chunk) = response.chunk().await.map_err(transport)? {
                file.write_all(&chunk)
                    .await
                    .map_err(BundleError::io(archive))?;
            }
            file.flush().await.map_err(BundleError::io(archive))
        }
        .await;

        if written.is_err() {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(archive).await {
                warn!(archive = %archive.display(), error = %e, "failed to remove partial bundle download");
            }
        }
        written
    }
}
