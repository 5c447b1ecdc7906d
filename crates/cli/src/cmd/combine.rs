//! Combine command: fold state files left to right.

use std::path::PathBuf;

use anyhow::Result;
use rsd_lib::{Error, System};

use super::{load_state, write_state};

pub fn cmd_combine(states: &[PathBuf]) -> Result<()> {
  let mut combined = System::new();
  for path in states {
    let state = load_state(path)?;
    combined = combined.combine(&state).map_err(Error::from)?;
  }
  write_state(&combined)
}
