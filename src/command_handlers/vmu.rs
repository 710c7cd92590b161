use crate::cli::VmuTarget;
use anyhow::{Context, Result};
use std::path::Path;
use zvm::config::Settings;

/// Rewrite the version map URL for `target` in the settings file.
pub fn set_vmu(data_dir: &Path, target: VmuTarget, value: &str) -> Result<()> {
    let mut settings = Settings::load(data_dir)?;
    let (what, url) = match target {
        VmuTarget::Zig => {
            settings
                .set_version_map_url(value)
                .context("run `zvm vmu zig default` to reset your version map")?;
            ("Zig", &settings.version_map_url)
        }
        VmuTarget::Zls => {
            settings
                .set_zls_version_map_url(value)
                .context("run `zvm vmu zls default` to reset your version map")?;
            ("ZLS", &settings.zls_version_map_url)
        }
    };
    settings.save(data_dir)?;
    println!("{what} version map set to {url}");
    Ok(())
}
