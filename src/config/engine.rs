//! Engine configuration file.
//!
//! # Location
//!
//! The first of these that applies is used:
//!
//! 1. A path passed explicitly (the CLI's `--config`)
//! 2. The `PVIEW_CONFIG` environment variable
//! 3. `~/.pview/config.toml` (`%LOCALAPPDATA%\pview\config.toml` on Windows)
//!
//! An absent file at locations 2 or 3 means defaults. An explicitly
//! requested file must exist.
//!
//! # File Format
//!
//! ```toml
//! default_currency = "EUR"
//! date_format = "%d.%m.%Y"
//! datetime_format = "%d.%m.%Y %H:%M"
//! schema_timeout_ms = 1500
//! gap_section_title = "Weitere Angaben"
//! ```
//!
//! Every key is optional.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::schema::gaps::{DEFAULT_DATETIME_FORMAT, DEFAULT_SECTION_TITLE, GapOptions};
use crate::templating::filters::{self, DEFAULT_CURRENCY, DEFAULT_DATE_FORMAT, FormatContext};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PVIEW_CONFIG";

const DEFAULT_SCHEMA_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ISO 4217 code used by `currency` without an argument.
    pub default_currency: String,

    /// Pattern used by `date` without an argument.
    pub date_format: String,

    /// Pattern written into gap-fill snippets for date-time attributes.
    pub datetime_format: String,

    /// Upper bound on one external schema lookup.
    pub schema_timeout_ms: u64,

    /// Heading of the generated gap-fill section.
    pub gap_section_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            schema_timeout_ms: DEFAULT_SCHEMA_TIMEOUT_MS,
            gap_section_title: DEFAULT_SECTION_TITLE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `explicit` is given but does not exist
    /// - The file cannot be read or is not valid TOML
    /// - A value fails [`EngineConfig::validate`]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from(path);
        }

        let path = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate().with_context(|| format!("Invalid config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("pview")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".pview")
        };
        Ok(config_dir.join("config.toml"))
    }

    /// Check values that would otherwise only fail once a template uses them.
    pub fn validate(&self) -> Result<()> {
        if !filters::is_currency_code(&self.default_currency) {
            bail!("default_currency '{}' is not a three-letter uppercase code", self.default_currency);
        }
        filters::validate_pattern(&self.date_format).map_err(|e| anyhow::anyhow!("date_format: {}", e))?;
        filters::validate_pattern(&self.datetime_format).map_err(|e| anyhow::anyhow!("datetime_format: {}", e))?;
        if self.schema_timeout_ms == 0 {
            bail!("schema_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn format_context(&self) -> FormatContext {
        FormatContext {
            default_currency: self.default_currency.clone(),
            date_format: self.date_format.clone(),
        }
    }

    pub fn gap_options(&self) -> GapOptions {
        GapOptions {
            section_title: self.gap_section_title.clone(),
            datetime_format: self.datetime_format.clone(),
        }
    }

    pub fn schema_timeout(&self) -> Duration {
        Duration::from_millis(self.schema_timeout_ms)
    }
}
