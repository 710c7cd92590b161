mod cli;
mod command_handlers;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use zvm::config::{self, Settings};
use zvm::http::HttpTransport;
use zvm::{Zvm, ZvmError};

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = config::data_dir()?;
    let settings = Settings::load(&data_dir)?;
    init_logging(settings.use_color && !cli.no_color);
    match Settings::write_defaults_if_missing(&data_dir) {
        Ok(true) => debug!(dir = %data_dir.display(), "wrote default settings"),
        Ok(false) => {}
        Err(e) => warn!(dir = %data_dir.display(), error = %e, "unable to create settings file"),
    }

    let transport = HttpTransport::new(Duration::from_secs(settings.http_timeout_secs))
        .context("building HTTP client")?
        .with_progress(true);
    let zvm = Zvm::new(settings, data_dir.clone(), Box::new(transport));

    match command_handlers::dispatch::dispatch(cli.command, &zvm, &data_dir) {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if e.downcast_ref::<ZvmError>().is_some_and(ZvmError::is_defect) {
                eprintln!("The install directory looks damaged.");
                eprintln!("Reinstall the version with 'zvm install --force <version>'.");
            }
            Err(e)
        }
    }
}

// ZVM_LOG takes a full filter; ZVM_DEBUG is a shortcut for debug output.
fn init_logging(color: bool) {
    let default = if std::env::var_os("ZVM_DEBUG").is_some() {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("ZVM_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .init();
}
