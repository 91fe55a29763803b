//! Host configuration.
//!
//! [`AppConfig`] is read from a TOML file with two tables:
//!
//! ```toml
//! [fetch]
//! timeout_seconds = 10
//! max_attempts = 3
//! proxy = "socks5://127.0.0.1:7890"
//!
//! [report]
//! api_base = "https://www.virustotal.com/ui"
//! ```
//!
//! Missing fields fall back to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;
use vantage_fetch::FetchConfig;

use crate::error::{AppError, Result};

/// Settings for indicator reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Base URL of the lookup API; plan paths are appended to it.
    pub api_base: String,
    /// Headers the lookup API expects on every call. Entries in
    /// `[fetch.headers]` with the same name take precedence.
    pub headers: BTreeMap<String, String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let headers = [
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Referer", "https://www.virustotal.com/"),
            ("X-Tool", "vt-ui-main"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            api_base: "https://www.virustotal.com/ui".to_string(),
            headers,
        }
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session settings shared by every report.
    pub fetch: FetchConfig,
    /// Lookup API settings.
    pub report: ReportSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// An explicit `path` that cannot be loaded is an error; a missing
    /// default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_config_path();
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Validate both tables.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.fetch
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let base = Url::parse(&self.report.api_base)
            .map_err(|e| AppError::Config(format!("invalid report.api_base: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "report.api_base must be http or https".into(),
            ));
        }
        Ok(())
    }

    /// The session configuration with report headers merged in.
    pub fn session_config(&self) -> FetchConfig {
        let mut fetch = self.fetch.clone();
        for (name, value) in &self.report.headers {
            let present = fetch.headers.keys().any(|k| k.eq_ignore_ascii_case(name));
            if !present {
                fetch.headers.insert(name.clone(), value.clone());
            }
        }
        fetch
    }
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/vantage/` by default. Override with
/// the `VANTAGE_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VANTAGE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("vantage"))
        .unwrap_or_else(|| PathBuf::from("/tmp/vantage-config"))
}
