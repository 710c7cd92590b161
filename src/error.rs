use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZvmError>;

/// Every failure the engine can report. Each kind carries the identifier
/// (version, url, path) it is about so the CLI can surface it verbatim.
#[derive(Debug, Error)]
pub enum ZvmError {
    #[error("version catalog at {url} is unavailable: {reason}")]
    CatalogUnavailable { url: String, reason: String },

    #[error("unknown zig version {0:?}")]
    UnknownVersion(String),

    #[error("zig {version} has no build for platform {platform}")]
    UnsupportedPlatform { version: String, platform: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("integrity check failed for {version}: {reason}")]
    Integrity { version: String, reason: String },

    #[error("could not extract {version}: {reason}")]
    Extract { version: String, reason: String },

    #[error("{0} is busy: another zvm process is installing it")]
    Busy(String),

    #[error("version {0} is not installed")]
    NotInstalled(String),

    #[error("installed toolchain is missing its binary at {}", .0.display())]
    BinaryMissing(PathBuf),

    #[error("no zig version specified")]
    NoVersionSpecified,

    #[error("no zls release for zig {zig_version}: {reason}")]
    ZlsUnavailable { zig_version: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ZvmError {
    pub(crate) fn extract(version: &str, reason: impl std::fmt::Display) -> Self {
        ZvmError::Extract {
            version: version.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors that indicate tampering with the install root rather than a
    /// routine user mistake.
    pub fn is_defect(&self) -> bool {
        matches!(self, ZvmError::BinaryMissing(_))
    }
}
