//! Configuration discovery.
//!
//! The config file declares external providers layered over the built-ins.
//! Search order: an explicit path, `$RSD_CONFIG`, `./rsd.json`, then
//! `$XDG_CONFIG_HOME/rsd/config.json` (with `~/.config` standing in when
//! `XDG_CONFIG_HOME` is unset). A missing config yields the built-in
//! registry only.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::element::Kind;
use crate::provider::external::ExternalProvider;
use crate::provider::{ProviderRegistry, Schema};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "RSD_CONFIG";

/// Config file name searched in the working directory.
const LOCAL_CONFIG: &str = "rsd.json";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    source: io::Error,
  },

  #[error("malformed config {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/// The on-disk config document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
  #[serde(default)]
  pub providers: Vec<ExternalProviderConfig>,
}

/// Declaration of one external provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExternalProviderConfig {
  /// Stable provider id, e.g. `packages.pacman`.
  pub id: String,
  /// The executable implementing the provider protocol.
  pub program: PathBuf,
  /// Element name to kind, the provider's component schema.
  pub schema: BTreeMap<String, Kind>,
}

impl ConfigFile {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Locate the config file, if any exists.
pub fn discover_config() -> Option<PathBuf> {
  if let Ok(path) = env::var(CONFIG_ENV) {
    return Some(PathBuf::from(path));
  }

  let local = PathBuf::from(LOCAL_CONFIG);
  if local.exists() {
    return Some(local);
  }

  let config_home = env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .ok()
    .or_else(|| env::var("HOME").ok().map(|home| PathBuf::from(home).join(".config")))?;
  let path = config_home.join("rsd").join("config.json");
  path.exists().then_some(path)
}

/// Build the provider registry: built-ins plus the externals declared in
/// the config at `explicit`, or at the discovered location.
pub fn load_registry(explicit: Option<&Path>) -> Result<ProviderRegistry, ConfigError> {
  let mut registry = ProviderRegistry::with_builtins();

  let path = match explicit {
    Some(path) => Some(path.to_path_buf()),
    None => discover_config(),
  };
  let Some(path) = path else {
    debug!("no config file found, using built-in providers only");
    return Ok(registry);
  };

  debug!(path = %path.display(), "loading config");
  let config = ConfigFile::load(&path)?;
  for declared in config.providers {
    let schema = Schema::new(declared.schema);
    registry.register(Box::new(ExternalProvider::new(declared.id, declared.program, schema)));
  }
  Ok(registry)
}
