// src/config/loader.rs

//! Finding and reading the TOML config.
//!
//! Lookup order: `--config`, then `$CLOUDY_CONFIG`, then `cloudy.toml` in
//! the working directory. With none of those the built-in defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CLOUDY_CONFIG";

/// File picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cloudy.toml";

/// Where the effective configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Flag(PathBuf),
    /// Named by `$CLOUDY_CONFIG`.
    Env(PathBuf),
    /// `cloudy.toml` found in the working directory.
    WorkingDir(PathBuf),
    /// No file; every value is a default.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Flag(path)
            | ConfigSource::Env(path)
            | ConfigSource::WorkingDir(path) => Some(path.as_path()),
            ConfigSource::Defaults => None,
        }
    }
}

/// Decide which config file to read.
///
/// `env` is the value of [`CONFIG_ENV`]; blank values count as unset. A flag
/// or env path is returned even if missing, so reading it reports the error;
/// the working-directory file is only used when it exists.
pub fn locate_config(flag: Option<&Path>, env: Option<&str>, working_dir: &Path) -> ConfigSource {
    if let Some(path) = flag {
        return ConfigSource::Flag(path.to_path_buf());
    }
    if let Some(path) = env.map(str::trim).filter(|p| !p.is_empty()) {
        return ConfigSource::Env(PathBuf::from(path));
    }
    let local = working_dir.join(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        ConfigSource::WorkingDir(local)
    } else {
        ConfigSource::Defaults
    }
}

/// Read the raw config for `source`; [`ConfigSource::Defaults`] needs no IO.
pub fn load_source(source: &ConfigSource) -> Result<RawConfigFile> {
    match source.path() {
        Some(path) => load_from_path(path),
        None => Ok(RawConfigFile::default()),
    }
}

/// Deserialize TOML text. Missing sections and keys take their defaults.
pub fn parse_config(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Read and deserialize a file without semantic validation; see
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = contents.len(), "read config file");
    parse_config(&contents)
}

/// Read, deserialize and validate a file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}
