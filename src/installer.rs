use crate::error::{Result, ZvmError};
use crate::http::Transport;
use crate::platform::{platform, zig_binary_name};
use crate::resolver::ArtifactRef;
use crate::store::{is_version_name, Store};
use flate2::read::GzDecoder;
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(PathBuf),
    /// `force` replaced an existing tree.
    Reinstalled(PathBuf),
    AlreadyInstalled(PathBuf),
}

impl InstallOutcome {
    pub fn path(&self) -> &Path {
        match self {
            InstallOutcome::Installed(p)
            | InstallOutcome::Reinstalled(p)
            | InstallOutcome::AlreadyInstalled(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveKind {
    TarXz,
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub(crate) fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".tar.xz") {
            Some(ArchiveKind::TarXz)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if path.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

/// Downloads artifacts and publishes them into the store.
///
/// Concurrent installs of one version are serialized on the store's version
/// lock: a second caller waits, then sees the first caller's result.
pub struct Installer<'a> {
    store: &'a Store,
    transport: &'a dyn Transport,
}

impl<'a> Installer<'a> {
    pub fn new(store: &'a Store, transport: &'a dyn Transport) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport
    }

    pub fn install(&self, artifact: &ArtifactRef, force: bool) -> Result<InstallOutcome> {
        let version = artifact.version.as_str();
        if !is_version_name(version) {
            return Err(ZvmError::UnknownVersion(version.to_string()));
        }
        let _lock = self.store.lock_version(version)?;
        for stale in self.store.reap_staging(version)? {
            warn!(version, path = %stale.display(), "removed staging tree of an interrupted install");
        }
        let target = self.store.path_for(version);
        let existing = self.store.is_installed(version);
        if existing && !force {
            info!(version, "already installed");
            return Ok(InstallOutcome::AlreadyInstalled(target));
        }

        info!(version, build = %artifact.build, url = %artifact.url, "installing");
        let staging = self.store.staging_tempdir(version)?;
        let archive = staging.path().join(archive_file_name(&artifact.url));
        self.download(artifact, &archive)?;
        let tree = unpack(
            version,
            &artifact.url,
            &archive,
            &staging.path().join("unpacked"),
            &zig_binary_name(),
        )?;
        publish(&tree, &target, existing, staging.path())?;
        if let Err(e) = staging.close() {
            warn!(version, error = %e, "could not remove staging directory");
        }
        info!(version, path = %target.display(), "installed");
        Ok(if existing {
            InstallOutcome::Reinstalled(target)
        } else {
            InstallOutcome::Installed(target)
        })
    }

    /// Stream `artifact` into `dest`, checking size and sha256 when the
    /// catalog supplies them.
    pub(crate) fn download(&self, artifact: &ArtifactRef, dest: &Path) -> Result<()> {
        let mut file = fs::File::create(dest)?;
        let mut sink = HashingWriter {
            inner: &mut file,
            hasher: Sha256::new(),
        };
        let written = self
            .transport
            .get(&artifact.url, &mut sink)
            .map_err(|reason| ZvmError::Download {
                url: artifact.url.clone(),
                reason,
            })?;
        let digest = hex::encode(sink.hasher.finalize());
        file.flush()?;
        debug!(url = %artifact.url, bytes = written, sha256 = %digest, "downloaded");

        if let Some(expected) = artifact.size {
            if written != expected {
                return Err(ZvmError::Integrity {
                    version: artifact.version.clone(),
                    reason: format!("expected {expected} bytes, got {written}"),
                });
            }
        }
        if let Some(expected) = &artifact.shasum {
            verify_sha256(&artifact.version, &digest, expected)?;
        }
        Ok(())
    }
}

struct HashingWriter<'w, W: Write> {
    inner: &'w mut W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn verify_sha256(version: &str, actual: &str, expected: &str) -> Result<()> {
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ZvmError::Integrity {
            version: version.to_string(),
            reason: format!("checksum mismatch expected {expected} got {actual}"),
        });
    }
    Ok(())
}

fn archive_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && is_version_name(name) => name.to_string(),
        _ => "artifact".to_string(),
    }
}

/// Extract `archive` into `dest` and return the directory holding `binary`.
/// A single top-level directory in the archive is treated as the tree root.
pub(crate) fn unpack(
    version: &str,
    url: &str,
    archive: &Path,
    dest: &Path,
    binary: &str,
) -> Result<PathBuf> {
    let kind = ArchiveKind::from_url(url)
        .ok_or_else(|| ZvmError::extract(version, format!("unsupported archive type for {url}")))?;
    fs::create_dir_all(dest)?;
    let file = BufReader::new(File::open(archive)?);
    let unpacked = match kind {
        ArchiveKind::TarXz => Archive::new(XzDecoder::new(file)).unpack(dest),
        ArchiveKind::TarGz => Archive::new(GzDecoder::new(file)).unpack(dest),
        ArchiveKind::Zip => unzip(file, dest),
    };
    unpacked.map_err(|e| ZvmError::extract(version, e))?;

    let root = content_root(dest)?;
    let bin = root.join(binary);
    if !bin.is_file() {
        return Err(ZvmError::extract(
            version,
            format!("archive does not contain {binary}"),
        ));
    }
    platform().make_executable(&bin)?;
    Ok(root)
}

fn unzip<R: io::Read + io::Seek>(reader: R, dest: &Path) -> io::Result<()> {
    let invalid = |e: zip::result::ZipError| io::Error::new(io::ErrorKind::InvalidData, e);
    let mut zip = ZipArchive::new(reader).map_err(invalid)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(invalid)?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsafe path in archive: {}", entry.name()),
            ));
        };
        let out = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&out)?;
        io::copy(&mut entry, &mut file)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out, std::fs::Permissions::from_mode(mode & 0o777))?;
        }
    }
    Ok(())
}

fn content_root(dest: &Path) -> Result<PathBuf> {
    let mut entries = fs::read_dir(dest)?.collect::<io::Result<Vec<_>>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries.remove(0).path());
    }
    Ok(dest.to_path_buf())
}

/// The commit point: one rename makes `tree` visible at `target`. When
/// replacing, the old tree is moved aside first and restored if the swap
/// fails; it is deleted together with the staging directory.
fn publish(tree: &Path, target: &Path, replace: bool, staging: &Path) -> Result<()> {
    if !replace {
        fs::rename(tree, target)?;
        return Ok(());
    }
    let previous = staging.join("previous");
    fs::rename(target, &previous)?;
    if let Err(e) = fs::rename(tree, target) {
        if let Err(restore) = fs::rename(&previous, target) {
            warn!(target = %target.display(), error = %restore, "could not restore previous install");
        }
        return Err(e.into());
    }
    Ok(())
}
