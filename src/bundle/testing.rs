//! Bundle sources for tests.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;

use super::{BundleError, BundleSource};

pub(crate) fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Serves the same archive bytes on every fetch.
#[derive(Debug)]
pub(crate) struct StaticSource(pub(crate) Vec<u8>);

#[async_trait]
impl BundleSource for StaticSource {
    async fn fetch(&self, archive: &Path) -> Result<(), BundleError> {
        tokio::fs::write(archive, &self.0)
            .await
            .map_err(BundleError::io(archive))
    }
}

#[derive(Debug)]
pub(crate) struct FailingSource;

#[async_trait]
impl BundleSource for FailingSource {
    async fn fetch(&self, _archive: &Path) -> Result<(), BundleError> {
        Err(BundleError::Fetch {
            url: "https://example.invalid/bundle.zip".into(),
            status: reqwest::StatusCode::NOT_FOUND,
        })
    }
}
