//! Global configuration.
//!
//! Loaded once from `viewdoo.toml` in the working directory, if it exists.
//! Missing settings use their defaults, and environment variables
//! override the file.
//!
//! ```toml
//! [general]
//! discipline = "batched"
//! scope_prefix = "app-"
//! escape_values = true
//! cache_views = true
//! ```
use once_cell::sync::OnceCell;
use std::env::var;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use thiserror::Error;
use tracing::info;

use crate::view::scheduler::Discipline;

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found")]
    Io(#[from] std::io::Error),

    #[error("\"{0}\" is not a render discipline, expected \"sync\" or \"batched\"")]
    Discipline(String),

    #[error("config is already loaded")]
    ConfigLoaded,

    #[error("config not found")]
    NoConfig,
}

/// Global configuration.
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    pub general: General,
}

#[derive(Debug, Clone)]
pub struct General {
    /// Logging and terminal output use colors.
    pub tty: bool,
    /// How dirty writes are turned into renders, unless the view overrides it.
    pub discipline: Discipline,
    /// Prefix of generated scope attributes.
    pub scope_prefix: String,
    /// HTML-escape interpolated strings.
    pub escape_values: bool,
    /// Cache compiled views by their source text.
    pub cache_views: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            tty: std::io::stderr().is_terminal(),
            discipline: Discipline::default(),
            scope_prefix: GeneralConfig::default_scope_prefix(),
            escape_values: false,
            cache_views: GeneralConfig::default_cache_views(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            general: General::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found in the working directory.
    pub fn load() -> Result<Config, Error> {
        for name in ["viewdoo.toml", "Viewdoo.toml"] {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Err(Error::NoConfig)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<Path> + Copy) -> Result<Config, Error> {
        let config_file = ConfigFile::load(path)?;
        let general = config_file.general;

        let mut config = Config::default();
        config.path = Some(path.as_ref().to_owned());
        config.general.discipline = general.discipline;
        config.general.scope_prefix = general.scope_prefix;
        config.general.escape_values = general.escape_values;
        config.general.cache_views = general.cache_views;

        config.from_env()
    }

    // Environment overrides.
    fn from_env(mut self) -> Result<Self, Error> {
        if let Ok(discipline) = var("VIEWDOO_DISCIPLINE") {
            self.general.discipline = discipline
                .parse()
                .map_err(|_| Error::Discipline(discipline))?;
        }

        if let Ok(prefix) = var("VIEWDOO_SCOPE_PREFIX") {
            self.general.scope_prefix = prefix;
        }

        Ok(self)
    }

    /// Install the configuration globally. Fails if it's already been loaded.
    pub fn set(self) -> Result<(), Error> {
        CONFIG.set(self).map_err(|_| Error::ConfigLoaded)
    }

    pub fn get() -> &'static Config {
        get_config()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log_info(&self) {
        match self.path {
            Some(ref path) => info!("Configuration loaded from \"{}\"", path.display()),
            None => info!("Using default configuration"),
        }
        info!(
            "Render discipline: {}, view cache {}",
            self.general.discipline,
            if self.general.cache_views {
                "enabled"
            } else {
                "disabled"
            }
        );
    }
}

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| match Config::load() {
        Ok(config) => config,
        Err(_) => Config::default().from_env().unwrap_or_default(),
    })
}

#[derive(Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    general: GeneralConfig,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path> + Copy) -> Result<ConfigFile, Error> {
        let file = read_to_string(path)?;
        let config: Self = toml::from_str(&file)?;

        Ok(config)
    }
}

#[derive(Serialize, Deserialize)]
struct GeneralConfig {
    #[serde(default)]
    discipline: Discipline,
    #[serde(default = "GeneralConfig::default_scope_prefix")]
    scope_prefix: String,
    #[serde(default)]
    escape_values: bool,
    #[serde(default = "GeneralConfig::default_cache_views")]
    cache_views: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::default(),
            scope_prefix: Self::default_scope_prefix(),
            escape_values: false,
            cache_views: Self::default_cache_views(),
        }
    }
}

impl GeneralConfig {
    fn default_scope_prefix() -> String {
        String::from("viewdoo-")
    }

    fn default_cache_views() -> bool {
        #[cfg(debug_assertions)]
        return false;
        #[cfg(not(debug_assertions))]
        return true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_load_from() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewdoo")?;
        let path = dir.path().join("viewdoo.toml");
        let mut file = std::fs::File::create(&path)?;
        file.write_all(
            br#"
            [general]
            discipline = "batched"
            scope_prefix = "app-"
            escape_values = true
            "#,
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.path(), Some(path.as_path()));
        assert_eq!(config.general.scope_prefix, "app-");
        assert!(config.general.escape_values);
        if var("VIEWDOO_DISCIPLINE").is_err() {
            assert_eq!(config.general.discipline, Discipline::Batched);
        }

        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewdoo")?;
        let path = dir.path().join("viewdoo.toml");
        std::fs::File::create(&path)?;

        let config = Config::load_from(&path)?;
        assert!(!config.general.escape_values);
        if var("VIEWDOO_SCOPE_PREFIX").is_err() {
            assert_eq!(config.general.scope_prefix, "viewdoo-");
        }

        Ok(())
    }

    #[test]
    fn test_bad_config() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewdoo")?;
        let path = dir.path().join("viewdoo.toml");
        let mut file = std::fs::File::create(&path)?;
        file.write_all(b"[general]\ndiscipline = \"eventually\"\n")?;

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.toml")),
            Err(Error::Io(_))
        ));
        Ok(())
    }
}
