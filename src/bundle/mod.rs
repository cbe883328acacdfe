//! Fetching and unpacking the live bundle.
//!
//! A refresh is destructive: the previous extraction and any stale archive
//! are removed before the new archive is downloaded and unpacked. There is
//! no rollback if extraction fails halfway.

mod error;
mod source;
#[cfg(test)]
pub(crate) mod testing;

use std::ffi::OsString;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use error::BundleError;
pub use source::{BundleSource, HttpSource};

pub const CONSTANTS_FILE: &str = "constants.yaml";
pub const CONFIG_FILE: &str = "config.yaml";
pub const TRIGGERS_FILE: &str = "triggers.yaml";
pub const COMMANDS_DIR: &str = "commands";
pub const INTERACTIONS_DIR: &str = "interactions";

const BUNDLE_ENTRIES: [&str; 5] = [
    CONSTANTS_FILE,
    CONFIG_FILE,
    TRIGGERS_FILE,
    COMMANDS_DIR,
    INTERACTIONS_DIR,
];

/// Path the archive is downloaded to: the extraction directory with a
/// `.zip` suffix.
pub fn archive_path(dest: &Path) -> PathBuf {
    let mut path = OsString::from(dest.as_os_str());
    path.push(".zip");
    PathBuf::from(path)
}

/// Replaces the extraction at `dest` with a freshly fetched archive and
/// returns the bundle root inside it (see [`locate_root`]).
pub async fn refresh_bundle(
    source: &dyn BundleSource,
    dest: &Path,
    folder: Option<&str>,
) -> Result<PathBuf, BundleError> {
    let archive = archive_path(dest);

    match tokio::fs::remove_dir_all(dest).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(BundleError::io(dest)(e));
        }
        _ => {}
    }
    match tokio::fs::remove_file(&archive).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(BundleError::io(&archive)(e));
        }
        _ => {}
    }
    debug!(dest = %dest.display(), "removed previous bundle");

    source.fetch(&archive).await?;
    info!(archive = %archive.display(), "downloaded bundle");

    let target = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&archive, &target)).await??;
    info!(dest = %dest.display(), "extracted bundle");
    Ok(locate_root(dest, folder))
}

/// Unpacks every entry of the zip at `archive` into `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<(), BundleError> {
    let file = std::fs::File::open(archive).map_err(BundleError::io(archive))?;
    let extract_error = |source| BundleError::Extract {
        path: archive.to_path_buf(),
        source,
    };

    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(extract_error)?;
    zip.extract(dest).map_err(extract_error)
}

/// Finds the folder holding the bundle documents inside an extraction.
///
/// An explicit `folder` always wins. Otherwise the extraction itself is the
/// root when it holds any bundle entry, or its only subdirectory when it
/// holds nothing else (repository archives wrap their content in one
/// top-level folder).
pub fn locate_root(dest: &Path, folder: Option<&str>) -> PathBuf {
    if let Some(folder) = folder {
        return dest.join(folder);
    }
    if BUNDLE_ENTRIES.iter().any(|entry| dest.join(entry).exists()) {
        return dest.to_path_buf();
    }

    let entries: Vec<PathBuf> = match std::fs::read_dir(dest) {
        Ok(dir) => dir.filter_map(Result::ok).map(|e| e.path()).collect(),
        Err(_) => return dest.to_path_buf(),
    };
    match entries.as_slice() {
        [only] if only.is_dir() => only.clone(),
        _ => dest.to_path_buf(),
    }
}
