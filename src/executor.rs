use crate::activation::ActivationManager;
use crate::catalog::CatalogClient;
use crate::error::{Result, ZvmError};
use crate::installer::Installer;
use crate::resolver::{normalize, resolve};
use crate::store::Store;
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::Command;
use tracing::debug;

/// Yes/no question asked before an implicit install.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on stderr, answers from stdin. Anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        eprint!("{question} [y/n] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Fixed answer, for non-interactive use.
impl Confirm for bool {
    fn confirm(&self, _question: &str) -> bool {
        *self
    }
}

/// The `run` flow: find or install a version, then run its `zig`.
pub struct Executor<'a> {
    store: &'a Store,
    client: CatalogClient<'a>,
    installer: Installer<'a>,
    catalog_url: &'a str,
    platform_key: &'a str,
}

impl<'a> Executor<'a> {
    pub fn new(
        store: &'a Store,
        client: CatalogClient<'a>,
        installer: Installer<'a>,
        catalog_url: &'a str,
        platform_key: &'a str,
    ) -> Self {
        Self {
            store,
            client,
            installer,
            catalog_url,
            platform_key,
        }
    }

    /// Run `zig` from `token` with `args` and return its exit code. A version
    /// that is not installed is resolved and, once `confirm` agrees, installed
    /// first. Declining leaves the store untouched.
    pub fn run(&self, token: &str, args: &[OsString], confirm: &dyn Confirm) -> Result<i32> {
        let version = normalize(token);
        if version.is_empty() {
            return Err(ZvmError::NoVersionSpecified);
        }
        if !self.store.list_installed()?.contains(version) {
            let catalog = self.client.fetch(self.catalog_url)?;
            let artifact = resolve(version, &catalog, self.platform_key)?;
            let question =
                format!("It looks like {version} isn't installed. Would you like to install it?");
            if !confirm.confirm(&question) {
                return Err(ZvmError::NotInstalled(version.to_string()));
            }
            self.installer.install(&artifact, false)?;
        }
        self.exec(version, args)
    }

    /// Run the active version.
    pub fn run_active(&self, args: &[OsString]) -> Result<i32> {
        let Some(version) = ActivationManager::new(self.store).current()? else {
            return Err(ZvmError::NoVersionSpecified);
        };
        self.exec(&version, args)
    }

    fn exec(&self, version: &str, args: &[OsString]) -> Result<i32> {
        let bin = self.store.binary_path(version);
        if !bin.is_file() {
            return Err(ZvmError::BinaryMissing(bin));
        }
        debug!(bin = %bin.display(), ?args, "exec");
        let status = Command::new(&bin).args(args).status()?;
        Ok(exit_code(status))
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
