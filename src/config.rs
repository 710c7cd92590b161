use anyhow::{bail, Context, Result};
use fs_err as fs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_VERSION_MAP_URL: &str = "https://ziglang.org/download/index.json";
pub const MACH_VERSION_MAP_URL: &str = "https://machengine.org/zig/index.json";
pub const DEFAULT_ZLS_RELEASE_WORKER: &str = "https://releases.zigtools.org/";
const SETTINGS_FILE: &str = "settings.json";

/// User settings, loaded once per invocation and handed to the engine by
/// value. The engine never writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub version_map_url: String,
    #[serde(alias = "zlsVMU")]
    pub zls_version_map_url: String,
    pub always_force_install: bool,
    pub use_color: bool,
    /// Upper bound for any single HTTP request.
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version_map_url: DEFAULT_VERSION_MAP_URL.to_string(),
            zls_version_map_url: DEFAULT_ZLS_RELEASE_WORKER.to_string(),
            always_force_install: false,
            use_color: true,
            http_timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Read `<data_dir>/settings.json`; a missing file means defaults. Empty
    /// URLs fall back to the defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(&path)?;
        let mut settings: Settings = serde_json::from_str(&data)
            .with_context(|| format!("parsing {}", path.display()))?;
        if settings.version_map_url.trim().is_empty() {
            settings.version_map_url = DEFAULT_VERSION_MAP_URL.to_string();
        }
        if settings.zls_version_map_url.trim().is_empty() {
            settings.zls_version_map_url = DEFAULT_ZLS_RELEASE_WORKER.to_string();
        }
        Ok(settings)
    }

    /// Write the defaults to `<data_dir>/settings.json` unless the file
    /// exists. Returns whether a file was created.
    pub fn write_defaults_if_missing(data_dir: &Path) -> Result<bool> {
        if data_dir.join(SETTINGS_FILE).exists() {
            return Ok(false);
        }
        Settings::default().save(data_dir)?;
        Ok(true)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self).context("serializing settings")?;
        fs::write(data_dir.join(SETTINGS_FILE), json)?;
        Ok(())
    }

    /// Set the Zig version map from a URL, `default` or `mach`.
    pub fn set_version_map_url(&mut self, value: &str) -> Result<()> {
        self.version_map_url = match value.trim() {
            "default" => DEFAULT_VERSION_MAP_URL.to_string(),
            "mach" => MACH_VERSION_MAP_URL.to_string(),
            url => checked_url(url)?,
        };
        Ok(())
    }

    /// Set the ZLS release worker from a URL or `default`.
    pub fn set_zls_version_map_url(&mut self, value: &str) -> Result<()> {
        self.zls_version_map_url = match value.trim() {
            "default" => DEFAULT_ZLS_RELEASE_WORKER.to_string(),
            url => checked_url(url)?,
        };
        Ok(())
    }
}

fn checked_url(value: &str) -> Result<String> {
    let url = Url::parse(value).with_context(|| format!("{value:?} is not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{value:?} must be an http or https URL");
    }
    Ok(url.into())
}

/// Where zvm keeps toolchains: `$ZVM_PATH`, else `$XDG_DATA_DIR/zvm`, else
/// `~/.zvm`.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("ZVM_PATH") {
        return Ok(PathBuf::from(path));
    }
    if let Some(xdg) = std::env::var_os("XDG_DATA_DIR") {
        return Ok(PathBuf::from(xdg).join("zvm"));
    }
    let home = dirs::home_dir().context("cannot determine home directory; set ZVM_PATH")?;
    Ok(home.join(".zvm"))
}
