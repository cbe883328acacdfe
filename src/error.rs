use thiserror::Error;

use crate::bundle::BundleError;
use crate::platform::PlatformError;
use crate::settings::SettingsError;

/// Top-level error type for the livebot library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("bot requires settings")]
    MissingSettings,

    #[error("bot requires a platform client")]
    MissingPlatform,
}
