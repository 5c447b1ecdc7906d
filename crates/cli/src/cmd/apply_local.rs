//! Apply-local command: gather the providers a role names, diff the local
//! state against the role, and render the commands.
//!
//! Equivalent to `providers | gather-all`, `diff`, `commands` in one step.
//! The role may also be a diff plan, in which case it is applied to the
//! gathered state first and the commands cover exactly that plan.

use std::path::Path;

use anyhow::Result;
use rsd_lib::config::load_registry;
use rsd_lib::provider::GatherRequest;
use rsd_lib::render::render_system;
use rsd_lib::{Error, System};

use super::load_state;
use crate::output::print_warning;

pub fn cmd_apply_local(config: Option<&Path>, role: &Path) -> Result<()> {
  let registry = load_registry(config).map_err(Error::from)?;
  let role = load_state(role)?;

  let requests: Vec<GatherRequest> = role
    .components()
    .map(|component| GatherRequest::new(&component.provider, component.qualifier.clone()))
    .collect();

  let mut outcome = registry.gather_all(&requests);
  if !outcome.is_complete() {
    for (request, err) in &outcome.skipped {
      print_warning(&format!("skipped {}: {}", request.provider, err));
    }
    let (_, first) = outcome.skipped.remove(0);
    return Err(Error::from(first).into());
  }

  let local = outcome.system;
  let diff = compute_plan(&local, &role)?;
  for line in render_system(&registry, &diff, Some(&local))? {
    println!("{}", line);
  }
  Ok(())
}

/// The diff to render: against a full role directly, or through a diff
/// plan's application to the gathered state.
fn compute_plan(local: &System, role: &System) -> Result<System, Error> {
  if role.all_full() {
    Ok(local.diff(role)?)
  } else {
    let applied = local.apply(role)?;
    Ok(local.diff(&applied)?)
  }
}
