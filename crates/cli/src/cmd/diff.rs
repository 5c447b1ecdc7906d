//! Diff command: compute the partial state that moves HOST to ROLE.

use std::path::Path;

use anyhow::Result;
use rsd_lib::Error;

use super::{load_state, write_state};

pub fn cmd_diff(host: &Path, role: &Path) -> Result<()> {
  let host = load_state(host)?;
  let role = load_state(role)?;

  let diff = host.diff(&role).map_err(Error::from)?;
  write_state(&diff)
}
