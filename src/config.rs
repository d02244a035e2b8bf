//! Runtime settings.
//!
//! Settings are resolved once at startup from built-in defaults, an optional
//! TOML file, and finally command-line flags or environment variables. The
//! resulting [`Settings`] value is never mutated afterwards; components that
//! need it receive a shared reference.
//!
//! ```toml
//! api_url = "https://offers.example.com/api"
//! production = false
//! debug = true
//! ```

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("api_url must be an http(s) URL, got {0:?}")]
    InvalidApiUrl(String),
}

/// Process-wide settings, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base URL for every backend request
    pub api_url: String,
    pub production: bool,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            production: true,
            debug: false,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_url: Option<String>,
    pub production: Option<bool>,
    pub debug: Option<bool>,
}

impl Settings {
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validated()
    }

    /// Load from an optional file, then apply overrides
    pub fn load(path: Option<&Path>, overrides: SettingsOverrides) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&contents)?
            }
            None => Settings::default(),
        };

        if let Some(api_url) = overrides.api_url {
            settings.api_url = api_url;
        }
        if let Some(production) = overrides.production {
            settings.production = production;
        }
        if let Some(debug) = overrides.debug {
            settings.debug = debug;
        }

        settings.validated()
    }

    fn validated(mut self) -> Result<Self, SettingsError> {
        let url = self.api_url.trim().trim_end_matches('/');
        let usable = Url::parse(url).is_ok_and(|parsed| {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some_and(|h| !h.is_empty())
        });
        if !usable {
            return Err(SettingsError::InvalidApiUrl(self.api_url));
        }
        self.api_url = url.to_string();
        Ok(self)
    }

    /// Default log directive when `RUST_LOG` is not set
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "offer_scout=debug,info"
        } else {
            "info"
        }
    }
}
