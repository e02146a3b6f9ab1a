//! Runtime configuration.
//!
//! Priority, highest first: command-line flags, environment variables,
//! `studytrack.toml`, built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

pub const CONFIG_FILE: &str = "studytrack.toml";
pub const CONFIG_ENV: &str = "STUDYTRACK_CONFIG";
pub const DATA_DIR_ENV: &str = "STUDYTRACK_DATA_DIR";
pub const PORT_ENV: &str = "STUDYTRACK_PORT";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Reads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Config> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
        let mut config = Config::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// A missing file gives the defaults; a malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Config::parse(&contents)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.trim().parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!("ignoring invalid {PORT_ENV}: {port}"),
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
