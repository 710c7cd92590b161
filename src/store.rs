//! Filesystem view of the installation root.
//!
//! Layout:
//!   `<root>/<version>/`        one directory per installed toolchain
//!   `<root>/bin` | `.active`   the active-version pointer
//!   `<root>/.staging/`         private staging trees and per-version lock files
//!
//! A version directory only ever appears through a single rename out of
//! `.staging`, so its presence means the install completed.

use crate::error::{Result, ZvmError};
use crate::platform::{platform, zig_binary_name};
use fs4::FileExt;
use fs_err as fs;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

const STAGING_DIR: &str = ".staging";
const LOCK_SUFFIX: &str = ".lock";
/// Prefix of pointer files written before being renamed over the live pointer.
pub(crate) const POINTER_TMP_PREFIX: &str = ".pointer-";
/// Names under the root that are never toolchains.
const RESERVED: &[&str] = &["bin", "self"];
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.xz", ".tar.gz", ".tgz", ".zip"];

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

/// Exclusive advisory lock on one version; released on drop.
#[derive(Debug)]
pub struct VersionLock {
    _file: File,
    version: String,
}

impl VersionLock {
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// What `clean` deleted and what it had to leave alone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub skipped_busy: Vec<PathBuf>,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn path_for(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    pub fn binary_path(&self, version: &str) -> PathBuf {
        self.path_for(version).join(zig_binary_name())
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.root.join(platform().pointer_name())
    }

    pub fn is_installed(&self, version: &str) -> bool {
        is_version_name(version)
            && std::fs::symlink_metadata(self.path_for(version))
                .map(|m| m.is_dir())
                .unwrap_or(false)
    }

    /// Installed versions in lexicographic order. A missing root is empty.
    pub fn list_installed(&self) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            // file_type does not follow symlinks, so the pointer is skipped.
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_version_name(&name) {
                out.insert(name);
            }
        }
        Ok(out)
    }

    /// Block until this process owns the install lock for `version`.
    pub fn lock_version(&self, version: &str) -> Result<VersionLock> {
        let file = self.open_lock_file(version)?;
        debug!(version, "waiting for version lock");
        file.lock_exclusive()?;
        Ok(VersionLock {
            _file: file,
            version: version.to_string(),
        })
    }

    /// Like [`Store::lock_version`] but returns `None` when someone else holds it.
    pub fn try_lock_version(&self, version: &str) -> Result<Option<VersionLock>> {
        let file = self.open_lock_file(version)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(VersionLock {
                _file: file,
                version: version.to_string(),
            })),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn open_lock_file(&self, version: &str) -> Result<File> {
        let staging = self.staging_dir();
        fs::create_dir_all(&staging)?;
        let path = staging.join(format!("{version}{LOCK_SUFFIX}"));
        let (file, _) = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?
            .into_parts();
        Ok(file)
    }

    /// A private, uniquely named directory under `.staging` for `version`.
    /// Dropping it deletes it.
    pub fn staging_tempdir(&self, version: &str) -> Result<tempfile::TempDir> {
        let staging = self.staging_dir();
        fs::create_dir_all(&staging)?;
        Ok(tempfile::Builder::new()
            .prefix(&format!("{version}."))
            .tempdir_in(&staging)?)
    }

    /// Delete an installed version. The directory is first renamed into
    /// staging so it vanishes in one step, then deleted.
    pub fn remove(&self, version: &str) -> Result<()> {
        if !self.is_installed(version) {
            return Err(ZvmError::NotInstalled(version.to_string()));
        }
        let Some(_lock) = self.try_lock_version(version)? else {
            return Err(ZvmError::Busy(version.to_string()));
        };
        if !self.is_installed(version) {
            return Err(ZvmError::NotInstalled(version.to_string()));
        }
        let trash = self.staging_tempdir(version)?;
        fs::rename(self.path_for(version), trash.path().join("tree"))?;
        trash.close()?;
        debug!(version, "removed version directory");
        Ok(())
    }

    /// Delete staging trees an earlier, interrupted install of `version` left
    /// behind. Only call this while holding the version lock: then no live
    /// install can own them.
    pub fn reap_staging(&self, version: &str) -> Result<Vec<PathBuf>> {
        let staging = self.staging_dir();
        let mut reaped = Vec::new();
        if !staging.is_dir() {
            return Ok(reaped);
        }
        for entry in fs::read_dir(&staging)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if staging_owner(&name) == version {
                fs::remove_dir_all(entry.path())?;
                reaped.push(entry.path());
            }
        }
        Ok(reaped)
    }

    /// What `zig version` prints for an installed version, `None` when it is
    /// not installed or the binary does not answer.
    pub fn installed_build(&self, version: &str) -> Option<String> {
        if !self.is_installed(version) {
            return None;
        }
        let output = Command::new(self.binary_path(version))
            .arg("version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let build = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!build.is_empty()).then_some(build)
    }

    /// Remove abandoned staging trees, orphaned pointer temp files and
    /// downloaded archives left in the root. Installed versions and trees of
    /// in-flight installs are never touched.
    pub fn clean(&self) -> Result<CleanReport> {
        let mut report = CleanReport::default();
        let staging = self.staging_dir();
        if staging.is_dir() {
            for entry in fs::read_dir(&staging)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    // Lock files stay: deleting one another process has open
                    // would let two installers lock different inodes.
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let version = staging_owner(&name);
                match self.try_lock_version(version)? {
                    Some(_lock) => {
                        fs::remove_dir_all(entry.path())?;
                        report.removed.push(entry.path());
                    }
                    None => {
                        warn!(version, "install in progress, leaving its staging tree");
                        report.skipped_busy.push(entry.path());
                    }
                }
            }
        }
        if self.root.is_dir() {
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let stray = name.starts_with(POINTER_TMP_PREFIX)
                    || ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s));
                if stray {
                    fs::remove_file(entry.path())?;
                    report.removed.push(entry.path());
                }
            }
        }
        Ok(report)
    }
}

/// Version a staging tree belongs to: trees are named `<version>.<suffix>`.
fn staging_owner(name: &str) -> &str {
    name.rsplit_once('.').map(|(v, _)| v).unwrap_or(name)
}

/// Names that can denote an installed version: no separators, not hidden,
/// not reserved.
pub fn is_version_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !RESERVED.contains(&name)
}
