use crate::catalog::Catalog;
use crate::error::{Result, ZvmError};

/// The rolling catalog entry. Its store directory keeps the alias name; the
/// concrete build id travels separately in [`ArtifactRef::build`].
pub const MASTER: &str = "master";

/// A platform-bound download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Store name: the normalized token, alias included.
    pub version: String,
    /// Concrete build id, what `zig version` prints once installed.
    pub build: String,
    pub url: String,
    pub shasum: Option<String>,
    pub size: Option<u64>,
}

impl ArtifactRef {
    pub fn is_rolling(&self) -> bool {
        self.version == MASTER
    }
}

/// Trim whitespace and drop one leading `v`.
pub fn normalize(token: &str) -> &str {
    let token = token.trim();
    token.strip_prefix('v').unwrap_or(token)
}

/// Exact, case-sensitive lookup of `token` for `platform_key`.
pub fn resolve(token: &str, catalog: &Catalog, platform_key: &str) -> Result<ArtifactRef> {
    let version = normalize(token);
    let Some(set) = catalog.get(version) else {
        return Err(ZvmError::UnknownVersion(version.to_string()));
    };
    let Some(artifact) = set.artifact(platform_key) else {
        return Err(ZvmError::UnsupportedPlatform {
            version: version.to_string(),
            platform: platform_key.to_string(),
        });
    };
    let build = match (&set.version, version == MASTER) {
        (Some(build), true) => build.clone(),
        _ => version.to_string(),
    };
    Ok(ArtifactRef {
        version: version.to_string(),
        build,
        url: artifact.url.clone(),
        shasum: artifact.shasum.clone(),
        size: artifact.size,
    })
}
