//! Optional ZLS (Zig language server) install alongside a toolchain.
//!
//! The release worker answers `v1/zls/select-version` with either an artifact
//! set for the matching ZLS release or a `{code, message}` failure.

use crate::catalog::ArtifactSet;
use crate::error::{Result, ZvmError};
use crate::installer::{unpack, InstallOutcome, Installer};
use crate::platform::platform;
use crate::resolver::ArtifactRef;
use fs_err as fs;
use reqwest::Url;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZlsCompat {
    /// Only guarantee runtime compatibility with the toolchain.
    #[default]
    OnlyRuntime,
    Full,
}

impl ZlsCompat {
    pub fn as_str(self) -> &'static str {
        match self {
            ZlsCompat::OnlyRuntime => "only-runtime",
            ZlsCompat::Full => "full",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Selection {
    Failure { code: i64, message: String },
    Release(ArtifactSet),
}

/// What to install ZLS for.
#[derive(Debug, Clone)]
pub struct ZlsRequest<'r> {
    /// Store name of the installed toolchain, e.g. `0.11.0` or `master`.
    pub version: &'r str,
    /// Concrete build id of that toolchain.
    pub zig_build: &'r str,
    pub platform_key: &'r str,
    pub release_worker: &'r str,
    pub compat: ZlsCompat,
    pub force: bool,
}

pub fn select_version_url(release_worker: &str, zig_build: &str, compat: ZlsCompat) -> Result<String> {
    let bad_url = |reason: String| ZvmError::ZlsUnavailable {
        zig_version: zig_build.to_string(),
        reason,
    };
    let base = if release_worker.ends_with('/') {
        release_worker.to_string()
    } else {
        format!("{release_worker}/")
    };
    let mut url = Url::parse(&base)
        .and_then(|u| u.join("v1/zls/select-version"))
        .map_err(|e| bad_url(format!("invalid release worker url {release_worker}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("zig_version", zig_build)
        .append_pair("compatibility", compat.as_str());
    Ok(url.into())
}

/// Install the matching `zls` binary into an installed toolchain directory.
/// The binary is staged and renamed into place under the version lock.
pub fn install_zls(installer: &Installer<'_>, request: &ZlsRequest<'_>) -> Result<InstallOutcome> {
    let store = installer.store();
    let version = request.version;
    if !store.is_installed(version) {
        return Err(ZvmError::NotInstalled(version.to_string()));
    }
    let unavailable = |reason: String| ZvmError::ZlsUnavailable {
        zig_version: request.zig_build.to_string(),
        reason,
    };

    let url = select_version_url(request.release_worker, request.zig_build, request.compat)?;
    let mut body = Vec::new();
    installer.transport().get(&url, &mut body).map_err(unavailable)?;
    let set = match serde_json::from_slice::<Selection>(&body) {
        Ok(Selection::Release(set)) => set,
        Ok(Selection::Failure { code, message }) => return Err(unavailable(format!("{message} (code {code})"))),
        Err(e) => return Err(unavailable(e.to_string())),
    };
    let zls_version = set.version.clone().unwrap_or_default();
    let Some(descriptor) = set.artifact(request.platform_key) else {
        return Err(ZvmError::UnsupportedPlatform {
            version: format!("zls {zls_version}"),
            platform: request.platform_key.to_string(),
        });
    };
    let artifact = ArtifactRef {
        version: version.to_string(),
        build: zls_version.clone(),
        url: descriptor.url.clone(),
        shasum: descriptor.shasum.clone(),
        size: descriptor.size,
    };

    let binary = platform().final_binary_name("zls");
    let _lock = store.lock_version(version)?;
    // An uninstall may have won the lock since the check above.
    if !store.is_installed(version) {
        return Err(ZvmError::NotInstalled(version.to_string()));
    }
    store.reap_staging(version)?;
    let target = store.path_for(version).join(&binary);
    let existing = target.is_file();
    if existing && !request.force {
        return Ok(InstallOutcome::AlreadyInstalled(target));
    }
    let staging = store.staging_tempdir(version)?;
    let archive = staging.path().join("zls-archive");
    installer.download(&artifact, &archive)?;
    let tree = unpack(
        version,
        &artifact.url,
        &archive,
        &staging.path().join("unpacked"),
        &binary,
    )?;
    fs::rename(tree.join(&binary), &target)?;
    info!(version, zls = %zls_version, "installed zls");
    Ok(if existing {
        InstallOutcome::Reinstalled(target)
    } else {
        InstallOutcome::Installed(target)
    })
}
