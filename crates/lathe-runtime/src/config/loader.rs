//! Layered configuration loading.
//!
//! Later layers win:
//!
//! | layer | source |
//! |-------|--------|
//! | 1 | [`LatheConfig::default`] |
//! | 2 | `lathe.{profile}.toml` next to the chosen `lathe.toml` |
//! | 3 | `lathe.toml` (first search path that has one) or an explicit [`ConfigLoader::file`] |
//! | 4 | `LATHE_` environment variables, `__` separating sections |
//! | 5 | [`ConfigLoader::merge`] |
//!
//! So `LATHE_API__ACCESS_TOKEN=xxx` sets `api.access_token` and
//! `LATHE_RUNTIME__MAX_IN_FLIGHT=16` sets `runtime.max_in_flight`.
//! Reading TOML needs the `toml-config` feature, which is on by default.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/lathe.toml")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::LatheConfig;
use super::validation::validate_config;

const FILE_STEM: &str = "lathe";
const ENV_PREFIX: &str = "LATHE_";

/// Selects the `lathe.{profile}.toml` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Accepts the short forms `dev` and `prod`.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Custom(name),
        }
    }

    /// `LATHE_PROFILE`, or development when unset.
    pub fn from_env() -> Self {
        std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`LatheConfig`] from defaults, files, environment and overrides.
pub struct ConfigLoader {
    profile: Profile,
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    read_env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            explicit_file: None,
            search_paths: Vec::new(),
            read_env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Directory to look for `lathe.toml` in. Searched in insertion order;
    /// the current directory is used when none are given.
    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Reads exactly this file; search paths are ignored and a missing file
    /// is an error.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over every other source.
    pub fn merge(mut self, config: LatheConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<LatheConfig> {
        let profile = self.profile.clone();
        let config: LatheConfig = self.figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            %profile,
            level = %config.logging.level,
            api_version = %config.api.version,
            max_in_flight = config.runtime.max_in_flight,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(LatheConfig::default()));

        figment = match &self.explicit_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                info!(path = %path.display(), "Reading configuration file");
                merge_file(figment, path)?
            }
            None => self.merge_found_files(figment),
        };

        if self.read_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    fn candidate_dirs(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            std::env::current_dir().into_iter().collect()
        } else {
            self.search_paths.clone()
        }
    }

    #[cfg(feature = "toml-config")]
    fn merge_found_files(&self, figment: Figment) -> Figment {
        let overlay = format!("{FILE_STEM}.{}.toml", self.profile);
        let base = format!("{FILE_STEM}.toml");

        let Some(dir) = self
            .candidate_dirs()
            .into_iter()
            .find(|dir| dir.join(&base).is_file())
        else {
            warn!(file = %base, "No configuration file found, using defaults");
            return figment;
        };

        let overlay = dir.join(overlay);
        let figment = if overlay.is_file() {
            debug!(path = %overlay.display(), "Reading profile overlay");
            figment.merge(Toml::file(overlay))
        } else {
            figment
        };

        let base = dir.join(base);
        info!(path = %base.display(), "Reading configuration file");
        figment.merge(Toml::file(base))
    }

    #[cfg(not(feature = "toml-config"))]
    fn merge_found_files(&self, figment: Figment) -> Figment {
        debug!(
            dirs = self.candidate_dirs().len(),
            "toml-config disabled, not searching for configuration files"
        );
        figment
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|ext| ext.to_str()) {
        #[cfg(feature = "toml-config")]
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Current directory plus environment.
pub fn load_config() -> ConfigResult<LatheConfig> {
    ConfigLoader::new().with_current_dir().load()
}

/// A specific file plus environment.
pub fn load_config_from_file(path: impl Into<PathBuf>) -> ConfigResult<LatheConfig> {
    ConfigLoader::new().file(path).load()
}
