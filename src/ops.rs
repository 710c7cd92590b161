//! Engine entry points consumed by the command handlers. Everything returns
//! values; printing is left to the caller.

use crate::activation::{ActivationManager, SyncOutcome};
use crate::catalog::CatalogClient;
use crate::config::Settings;
use crate::error::{Result, ZvmError};
use crate::executor::{Confirm, Executor};
use crate::http::Transport;
use crate::installer::{InstallOutcome, Installer};
use crate::platform::platform_key;
use crate::resolver::{normalize, resolve};
use crate::store::{CleanReport, Store};
use crate::zls::{install_zls, ZlsCompat, ZlsRequest};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;

/// Extra pieces installed next to a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Zls(ZlsCompat),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub zig: InstallOutcome,
    pub zls: Option<InstallOutcome>,
}

pub struct Zvm {
    settings: Settings,
    store: Store,
    transport: Box<dyn Transport>,
    platform_key: String,
}

impl Zvm {
    pub fn new(settings: Settings, root: impl Into<PathBuf>, transport: Box<dyn Transport>) -> Self {
        Self {
            settings,
            store: Store::new(root),
            transport,
            platform_key: platform_key(),
        }
    }

    /// Resolve against a platform other than the host's.
    pub fn with_platform_key(mut self, key: impl Into<String>) -> Self {
        self.platform_key = key.into();
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn platform_key(&self) -> &str {
        &self.platform_key
    }

    fn client(&self) -> CatalogClient<'_> {
        CatalogClient::new(self.transport.as_ref())
    }

    fn installer(&self) -> Installer<'_> {
        Installer::new(&self.store, self.transport.as_ref())
    }

    fn activation(&self) -> ActivationManager<'_> {
        ActivationManager::new(&self.store)
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(
            &self.store,
            self.client(),
            self.installer(),
            &self.settings.version_map_url,
            &self.platform_key,
        )
    }

    /// Install `token` (and any `components`). `force` is also implied by the
    /// `alwaysForceInstall` setting. An installed version with nothing else
    /// requested is answered without touching the network.
    pub fn resolve_and_install(
        &self,
        token: &str,
        force: bool,
        components: &[Component],
    ) -> Result<InstallReport> {
        let version = normalize(token);
        if version.is_empty() {
            return Err(ZvmError::NoVersionSpecified);
        }
        let force = force || self.settings.always_force_install;
        if !force && components.is_empty() && self.store.is_installed(version) {
            return Ok(InstallReport {
                zig: InstallOutcome::AlreadyInstalled(self.store.path_for(version)),
                zls: None,
            });
        }

        let catalog = self.client().fetch(&self.settings.version_map_url)?;
        let artifact = resolve(version, &catalog, &self.platform_key)?;
        let installer = self.installer();
        let zig = installer.install(&artifact, force)?;
        // An untouched rolling install may be older than the catalog entry.
        let zig_build = match &zig {
            InstallOutcome::AlreadyInstalled(_) if artifact.is_rolling() => self
                .store
                .installed_build(&artifact.version)
                .unwrap_or_else(|| artifact.build.clone()),
            _ => artifact.build.clone(),
        };

        let mut zls = None;
        for component in components {
            match *component {
                Component::Zls(compat) => {
                    let request = ZlsRequest {
                        version: &artifact.version,
                        zig_build: &zig_build,
                        platform_key: &self.platform_key,
                        release_worker: &self.settings.zls_version_map_url,
                        compat,
                        force,
                    };
                    zls = Some(install_zls(&installer, &request)?);
                }
            }
        }
        Ok(InstallReport { zig, zls })
    }

    pub fn activate(&self, token: &str) -> Result<()> {
        let version = normalize(token);
        if version.is_empty() {
            return Err(ZvmError::NoVersionSpecified);
        }
        self.activation().activate(version)
    }

    pub fn current(&self) -> Result<Option<String>> {
        self.activation().current()
    }

    pub fn sync(&self) -> Result<SyncOutcome> {
        let catalog = self.client().fetch(&self.settings.version_map_url)?;
        self.activation()
            .sync(&catalog, &self.platform_key, &self.installer())
    }

    pub fn run(&self, token: &str, args: &[OsString], confirm: &dyn Confirm) -> Result<i32> {
        self.executor().run(token, args, confirm)
    }

    pub fn run_active(&self, args: &[OsString]) -> Result<i32> {
        self.executor().run_active(args)
    }

    pub fn list_installed(&self) -> Result<BTreeSet<String>> {
        self.store.list_installed()
    }

    /// Versions offered by the configured catalog, `master` first.
    pub fn list_remote(&self) -> Result<Vec<String>> {
        let catalog = self.client().fetch(&self.settings.version_map_url)?;
        Ok(catalog.sorted_names())
    }

    /// Remove an installed version. An active pointer to it is left dangling
    /// and reads as "no active version".
    pub fn uninstall(&self, token: &str) -> Result<()> {
        let version = normalize(token);
        if version.is_empty() {
            return Err(ZvmError::NoVersionSpecified);
        }
        self.store.remove(version)
    }

    pub fn clean(&self) -> Result<CleanReport> {
        self.store.clean()
    }
}
