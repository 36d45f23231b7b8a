//! `devis.toml` configuration.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [store]
//! backend = "http"                        # or "memory"
//! base_url = "http://localhost:8000/api/"
//!
//! [geocoder]
//! endpoint = "https://api-adresse.data.gouv.fr/search/"
//! latitude = 48.866667
//! longitude = 2.333333
//! limit = 5
//! debounce_ms = 250
//!
//! [downloads]
//! directory = "."
//!
//! [logging]
//! level = "info"
//! file = "devis.log"
//! console = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use devis_core::store::StoreConfig;
use devis_core::{AddressQuery, GeoPoint};
use devis_http::DEFAULT_GEOCODER_URL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::AddressSearchSettings;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "devis.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub geocoder: GeocoderConfig,
    pub downloads: DownloadsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub latitude: f64,
    pub longitude: f64,
    pub limit: usize,
    pub debounce_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEOCODER_URL.to_string(),
            latitude: GeoPoint::PARIS.latitude,
            longitude: GeoPoint::PARIS.longitude,
            limit: AddressQuery::DEFAULT_LIMIT,
            debounce_ms: 250,
        }
    }
}

impl GeocoderConfig {
    pub fn search_settings(&self) -> AddressSearchSettings {
        AddressSearchSettings {
            bias: GeoPoint {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            limit: self.limit,
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub directory: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `None` keeps RUST_LOG or the built-in default.
    pub level: Option<String>,
    pub file: Option<PathBuf>,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            file: None,
            console: true,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<String>,
    pub api_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), backend = %config.store.backend, "config loaded");
        Ok(config)
    }

    /// Loads `explicit` when given (it must exist), otherwise
    /// [`DEFAULT_CONFIG_FILE`] when present, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn with_overrides(
        mut self,
        overrides: ConfigOverrides,
    ) -> Self {
        if let Some(backend) = overrides.backend {
            self.store.backend = backend;
        }
        if let Some(url) = overrides.api_url {
            self.store.base_url = url;
        }
        if let Some(dir) = overrides.download_dir {
            self.downloads.directory = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = Some(level);
        }
        self
    }
}
