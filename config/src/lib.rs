//! Configuration loading for fairkeep.
//!
//! The file lives at `~/.fairkeep/config.toml` unless `FAIRKEEP_CONFIG`
//! points elsewhere. Raw TOML tables are deserialized into the private
//! `Raw*` structs below and resolved into validated
//! [`EngineSettings`](fairkeep_types::settings::EngineSettings) here, so
//! nothing downstream ever sees a half-checked value.

use std::io;
use std::path::{Path, PathBuf};
use std::{env, fs};

use fairkeep_types::settings::{EngineSettings, HandoffSettings, SettingsError, TickSettings};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "FAIRKEEP_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] SettingsError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ticking: Option<RawTicking>,
    handoff: Option<RawHandoff>,
    storage: Option<RawStorage>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTicking {
    interval_ticks: Option<u64>,
    player_seconds: Option<u32>,
    ender_seconds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHandoff {
    timeout_ms: Option<u64>,
    fallback_delay_ticks: Option<u64>,
    stale_after_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStorage {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    filter: Option<String>,
}

impl RawTicking {
    fn resolve(self) -> Result<TickSettings, SettingsError> {
        let defaults = TickSettings::default();
        TickSettings::new(
            self.interval_ticks.unwrap_or(defaults.interval_ticks()),
            self.player_seconds.unwrap_or(defaults.player_seconds()),
            self.ender_seconds.unwrap_or(defaults.ender_seconds()),
        )
    }
}

impl RawHandoff {
    fn resolve(self) -> Result<HandoffSettings, SettingsError> {
        let defaults = HandoffSettings::default();
        HandoffSettings::new(
            self.timeout_ms
                .unwrap_or(defaults.timeout().as_millis() as u64),
            self.fallback_delay_ticks
                .unwrap_or(defaults.fallback_delay_ticks()),
            self.stale_after_ms
                .unwrap_or(defaults.stale_after().as_millis() as u64),
        )
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FairkeepConfig {
    pub settings: EngineSettings,
    /// Snapshot database location. `None` means the binary's default.
    pub storage_path: Option<PathBuf>,
    /// `tracing-subscriber` filter directive, e.g. `"info,fairkeep_core=debug"`.
    pub log_filter: Option<String>,
}

impl FairkeepConfig {
    /// Load from [`config_path`]. A missing file yields `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let raw: RawConfig = match toml::from_str(&content) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        Self::resolve(raw).map(Some)
    }

    /// Parse and validate a TOML document that did not come from disk.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self, ConfigError> {
        let settings = EngineSettings {
            ticking: raw.ticking.unwrap_or_default().resolve()?,
            handoff: raw.handoff.unwrap_or_default().resolve()?,
        };
        Ok(Self {
            settings,
            storage_path: raw.storage.and_then(|storage| storage.path),
            log_filter: raw
                .logging
                .and_then(|logging| logging.filter)
                .filter(|filter| !filter.trim().is_empty()),
        })
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".fairkeep").join("config.toml"))
}

/// Default snapshot database location, next to the default config file.
#[must_use]
pub fn default_storage_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fairkeep").join("fairkeep.db"))
}
