use crate::catalog::Catalog;
use crate::error::{Result, ZvmError};
use crate::installer::Installer;
use crate::platform::platform;
use crate::resolver::{resolve, MASTER};
use crate::store::{Store, POINTER_TMP_PREFIX};
use fs_err as fs;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// `master` is active and already at the catalog's build.
    UpToDate { build: String },
    /// The installed `master` was current but another version was active.
    Activated { build: String },
    /// A new `master` build was installed and activated.
    Updated {
        build: String,
        previous: Option<String>,
    },
}

/// Owns the active-version pointer.
pub struct ActivationManager<'a> {
    store: &'a Store,
}

impl<'a> ActivationManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Point the active version at `version`. A new pointer is written beside
    /// the old one and renamed over it, so readers see either pointer whole.
    pub fn activate(&self, version: &str) -> Result<()> {
        if !self.store.is_installed(version) {
            return Err(ZvmError::NotInstalled(version.to_string()));
        }
        let root = self.store.root();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let tmp = root.join(format!(
            "{POINTER_TMP_PREFIX}{}-{nanos}",
            std::process::id()
        ));
        platform().write_pointer(&tmp, version)?;
        if let Err(e) = fs::rename(&tmp, self.store.pointer_path()) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        info!(version, "activated");
        Ok(())
    }

    /// The active version, or `None` when no pointer exists or it names a
    /// version that is no longer installed.
    pub fn current(&self) -> Result<Option<String>> {
        let Some(version) = platform().read_pointer(&self.store.pointer_path())? else {
            return Ok(None);
        };
        if self.store.is_installed(&version) {
            Ok(Some(version))
        } else {
            debug!(version, "active pointer is dangling");
            Ok(None)
        }
    }

    /// Bring `master` up to the catalog's build and make it active.
    /// Reinstalls only when the installed build differs.
    pub fn sync(
        &self,
        catalog: &Catalog,
        platform_key: &str,
        installer: &Installer<'_>,
    ) -> Result<SyncOutcome> {
        let artifact = resolve(MASTER, catalog, platform_key)?;
        let build = artifact.build.clone();
        let installed = self.store.installed_build(MASTER);
        if installed.as_deref() == Some(build.as_str()) {
            if self.current()?.as_deref() == Some(MASTER) {
                debug!(build, "master already up to date");
                return Ok(SyncOutcome::UpToDate { build });
            }
            self.activate(MASTER)?;
            return Ok(SyncOutcome::Activated { build });
        }

        installer.install(&artifact, true)?;
        match self.store.installed_build(MASTER) {
            Some(found) if found == build => {}
            found => warn!(expected = %build, ?found, "installed master reports a different build"),
        }
        self.activate(MASTER)?;
        Ok(SyncOutcome::Updated {
            build,
            previous: installed,
        })
    }
}
