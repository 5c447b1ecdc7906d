//! Commands command: render a diff state into ordered shell commands.

use std::path::Path;

use anyhow::Result;
use rsd_lib::Error;
use rsd_lib::config::load_registry;
use rsd_lib::render::render_system;

use super::load_state;

pub fn cmd_commands(config: Option<&Path>, diff: &Path, host: Option<&Path>) -> Result<()> {
  let registry = load_registry(config).map_err(Error::from)?;
  let diff = load_state(diff)?;
  let host = host.map(load_state).transpose()?;

  for line in render_system(&registry, &diff, host.as_ref())? {
    println!("{}", line);
  }
  Ok(())
}
