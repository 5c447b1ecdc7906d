//! Gather-all command: gather every provider/qualifier pair from stdin.

use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Result, bail};
use rsd_lib::Error;
use rsd_lib::config::load_registry;
use rsd_lib::provider::GatherRequest;

use super::{parse_qualifier, write_state};
use crate::output::print_warning;

pub fn cmd_gather_all(config: Option<&Path>) -> Result<()> {
  let registry = load_registry(config).map_err(Error::from)?;
  let requests = read_requests(io::stdin().lock())?;

  let mut outcome = registry.gather_all(&requests);
  write_state(&outcome.system)?;

  if !outcome.is_complete() {
    for (request, err) in &outcome.skipped {
      print_warning(&format!("skipped {}: {}", request.provider, err));
    }
    let (_, first) = outcome.skipped.remove(0);
    return Err(Error::from(first).into());
  }
  Ok(())
}

/// Parse the `p=PROVIDER` / `q=QUALIFIER` line pairs emitted by
/// `rsd providers`.
fn read_requests(reader: impl BufRead) -> Result<Vec<GatherRequest>> {
  let mut requests = Vec::new();
  let mut pending_provider: Option<String> = None;

  for line in reader.lines() {
    let line = line?;
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    if let Some(provider) = line.strip_prefix("p=") {
      if pending_provider.is_some() {
        bail!("provider line {:?} follows an unpaired provider line", line);
      }
      pending_provider = Some(provider.to_string());
    } else if let Some(qualifier) = line.strip_prefix("q=") {
      let Some(provider) = pending_provider.take() else {
        bail!("qualifier line {:?} has no preceding provider line", line);
      };
      requests.push(GatherRequest::new(provider, parse_qualifier(qualifier)));
    } else {
      bail!("malformed provider list line: {:?} (expected p=/q= pairs)", line);
    }
  }
  if let Some(provider) = pending_provider {
    bail!("provider {} has no qualifier line", provider);
  }
  Ok(requests)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_pairs() {
    let input = "p=packages.homebrew\nq=\np=dotfiles\nq=git/config\n";
    let requests = read_requests(input.as_bytes()).unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].provider, "packages.homebrew");
    assert!(requests[0].qualifier.is_empty());
    assert_eq!(requests[1].qualifier, vec!["git", "config"]);
  }

  #[test]
  fn rejects_unpaired_lines() {
    assert!(read_requests("q=alone\n".as_bytes()).is_err());
    assert!(read_requests("p=dangling\n".as_bytes()).is_err());
    assert!(read_requests("p=a\np=b\n".as_bytes()).is_err());
  }

  #[test]
  fn empty_input_is_empty() {
    assert!(read_requests("".as_bytes()).unwrap().is_empty());
  }
}
