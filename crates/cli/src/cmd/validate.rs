//! Validate command: check a state file against provider schemas and
//! dependency resolution.

use std::path::Path;

use anyhow::Result;
use rsd_lib::Error;
use rsd_lib::config::load_registry;
use rsd_lib::system::SystemError;

use super::load_state;
use crate::output::{print_error, print_success};

pub fn cmd_validate(config: Option<&Path>, state: &Path) -> Result<()> {
  let registry = load_registry(config).map_err(Error::from)?;
  let system = load_state(state)?;

  let mut first: Option<Error> = None;
  let mut record = |err: Error| {
    print_error(&err.to_string());
    first.get_or_insert(err);
  };

  for component in system.components() {
    if let Err(err) = registry.validate_component(component) {
      record(err.into());
    }
  }
  for (key, dependency) in system.validation_errors() {
    record(SystemError::InvalidSystem { key, dependency }.into());
  }

  match first {
    Some(err) => Err(err.into()),
    None => {
      print_success(&format!("state is valid ({} components)", system.len()));
      Ok(())
    }
  }
}
