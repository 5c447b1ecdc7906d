//! Gather command: run one provider and emit its state.

use std::path::Path;

use anyhow::Result;
use rsd_lib::config::load_registry;
use rsd_lib::{Error, System};

use super::{parse_qualifier, write_state};

pub fn cmd_gather(config: Option<&Path>, provider: &str, qualifier: Option<&str>) -> Result<()> {
  let registry = load_registry(config).map_err(Error::from)?;
  let qualifier = qualifier.map(parse_qualifier);

  let components = registry.gather(provider, qualifier.as_deref()).map_err(Error::from)?;
  let system = System::from_components(components).map_err(Error::from)?;
  write_state(&system)
}
