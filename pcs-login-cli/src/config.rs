use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pcs_login::LoginConfig;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "pcs-login";
const CONFIG_FILE: &str = "config.toml";
const ACCOUNTS_FILE: &str = "accounts.json";
const IMAGE_FILE: &str = "qrcode.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Passport host, only changed for testing.
    pub passport_base: String,

    /// Account store file. Defaults to `<config dir>/pcs-login/accounts.json`.
    pub store_path: Option<PathBuf>,

    /// QR code image output. Defaults to `./qrcode.png`.
    pub image_path: Option<PathBuf>,

    pub poll_interval_secs: u64,

    /// `None` waits until confirmed or interrupted.
    pub poll_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let login = LoginConfig::default();
        Self {
            passport_base: login.passport_base,
            store_path: None,
            image_path: None,
            poll_interval_secs: login.poll_interval.as_secs(),
            poll_timeout_secs: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the configuration, falling back to defaults when the file is
    /// missing.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Writes the default configuration to `path`.
    pub fn reset(path: Option<&Path>) -> anyhow::Result<()> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::default_path)
            .context("No configuration directory available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn show(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join(ACCOUNTS_FILE)
        })
    }

    pub fn image_path(&self) -> PathBuf {
        self.image_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(IMAGE_FILE))
    }

    pub fn login_config(&self) -> LoginConfig {
        LoginConfig::default()
            .with_passport_base(self.passport_base.clone())
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .with_poll_timeout(self.poll_timeout_secs.map(Duration::from_secs))
    }
}
