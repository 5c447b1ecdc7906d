//! Subcommand implementations and shared state-file plumbing.

mod apply_local;
mod combine;
mod commands;
mod diff;
mod gather;
mod gather_all;
mod providers;
mod validate;

pub use apply_local::cmd_apply_local;
pub use combine::cmd_combine;
pub use commands::cmd_commands;
pub use diff::cmd_diff;
pub use gather::cmd_gather;
pub use gather_all::cmd_gather_all;
pub use providers::cmd_providers;
pub use validate::cmd_validate;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use rsd_lib::System;
use rsd_lib::state;

/// Load a state document from a file, or from stdin when the path is `-`.
pub(crate) fn load_state(path: &Path) -> Result<System> {
  let result = if path == Path::new("-") {
    state::read_system(io::stdin().lock())
  } else {
    state::load_system(path)
  };
  result
    .map_err(rsd_lib::Error::from)
    .with_context(|| format!("failed to load state from {}", path.display()))
}

/// Write a state document to stdout.
pub(crate) fn write_state(system: &System) -> Result<()> {
  state::write_system(io::stdout().lock(), system)
    .map_err(rsd_lib::Error::from)
    .context("failed to write state")
}

/// Split a slash-separated qualifier into its segments.
pub(crate) fn parse_qualifier(qualifier: &str) -> Vec<String> {
  if qualifier.is_empty() {
    Vec::new()
  } else {
    qualifier.split('/').map(str::to_string).collect()
  }
}
