//! Providers command: list the provider/qualifier pairs of a state file.
//!
//! The output is the input format of `rsd gather-all`, so the two compose:
//!
//!   rsd providers role.json | rsd gather-all

use std::path::Path;

use anyhow::Result;

use super::load_state;

pub fn cmd_providers(state: &Path) -> Result<()> {
  let system = load_state(state)?;
  for component in system.components() {
    println!("p={}", component.provider);
    println!("q={}", component.qualifier.join("/"));
  }
  Ok(())
}
