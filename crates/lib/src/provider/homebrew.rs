//! The built-in homebrew provider.
//!
//! Handles the homebrew packaging system as one unqualified component with
//! three set elements: the configured taps, the formulae installed on
//! request, and the installed casks.

use crate::command::CommandRunner;
use crate::component::{Component, ComponentBody, ComponentKey};
use crate::element::{DiffElement, FullElement, Kind};
use crate::provider::{Provider, ProviderError, Schema};

pub const HOMEBREW_PROVIDER_ID: &str = "packages.homebrew";

const TAPS: &str = "taps";
const FORMULAS: &str = "formulas";
const CASKS: &str = "casks";

pub struct HomebrewProvider {
  runner: CommandRunner,
  schema: Schema,
}

impl Default for HomebrewProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl HomebrewProvider {
  pub fn new() -> Self {
    Self {
      runner: CommandRunner::new(),
      schema: Schema::new([
        (TAPS.to_string(), Kind::Set),
        (FORMULAS.to_string(), Kind::Set),
        (CASKS.to_string(), Kind::Set),
      ]),
    }
  }

  fn gather_error(&self, message: impl Into<String>) -> ProviderError {
    ProviderError::GatherFailed {
      provider: HOMEBREW_PROVIDER_ID.to_string(),
      message: message.into(),
    }
  }

  fn parse_installed(&self, info: &serde_json::Value) -> Result<(Vec<String>, Vec<String>), ProviderError> {
    let formulae = info
      .get("formulae")
      .and_then(|v| v.as_array())
      .ok_or_else(|| self.gather_error("brew info output is missing `formulae`"))?;
    let casks = info
      .get("casks")
      .and_then(|v| v.as_array())
      .ok_or_else(|| self.gather_error("brew info output is missing `casks`"))?;

    // Only formulae installed on request count; dependencies follow them.
    let formula_names = formulae
      .iter()
      .filter(|formula| {
        formula
          .get("installed")
          .and_then(|v| v.as_array())
          .is_some_and(|installs| {
            installs
              .iter()
              .any(|install| install.get("installed_on_request").and_then(|v| v.as_bool()) == Some(true))
          })
      })
      .filter_map(|formula| formula.get("full_name").and_then(|v| v.as_str()))
      .map(str::to_string)
      .collect();

    let cask_names = casks
      .iter()
      .filter_map(|cask| cask.get("full_token").and_then(|v| v.as_str()))
      .map(str::to_string)
      .collect();

    Ok((formula_names, cask_names))
  }
}

/// Pull the named set element out of a full or diff element map.
fn set_items(
  elements: &std::collections::BTreeMap<String, FullElement>,
  name: &str,
  key: &ComponentKey,
) -> Result<Vec<String>, ProviderError> {
  match elements.get(name) {
    Some(FullElement::Set { items }) => Ok(items.iter().cloned().collect()),
    Some(other) => Err(ProviderError::SchemaMismatch {
      key: key.clone(),
      element: name.to_string(),
      problem: format!("is {}, expected set", other.kind()),
    }),
    None => Err(ProviderError::SchemaMismatch {
      key: key.clone(),
      element: name.to_string(),
      problem: "is missing".to_string(),
    }),
  }
}

fn set_diff(
  elements: &std::collections::BTreeMap<String, DiffElement>,
  name: &str,
  key: &ComponentKey,
) -> Result<(Vec<String>, Vec<String>), ProviderError> {
  match elements.get(name) {
    Some(DiffElement::Set { to_add, to_remove }) => Ok((
      to_add.iter().cloned().collect(),
      to_remove.iter().cloned().collect(),
    )),
    Some(other) => Err(ProviderError::SchemaMismatch {
      key: key.clone(),
      element: name.to_string(),
      problem: format!("is {}, expected set", other.kind()),
    }),
    None => Err(ProviderError::SchemaMismatch {
      key: key.clone(),
      element: name.to_string(),
      problem: "is missing".to_string(),
    }),
  }
}

impl Provider for HomebrewProvider {
  fn id(&self) -> &str {
    HOMEBREW_PROVIDER_ID
  }

  fn schema(&self) -> &Schema {
    &self.schema
  }

  fn gather(&self, qualifier: Option<&[String]>) -> Result<Vec<Component>, ProviderError> {
    // Homebrew has a single unqualified instance.
    if qualifier.is_some_and(|segments| !segments.is_empty()) {
      return Ok(Vec::new());
    }

    let taps = self
      .runner
      .lines(&["brew", "tap"])
      .map_err(|err| self.gather_error(err.to_string()))?;
    let info = self
      .runner
      .json(&["brew", "info", "--json=v2", "--installed"])
      .map_err(|err| self.gather_error(err.to_string()))?;
    let (formulas, casks) = self.parse_installed(&info)?;

    Ok(vec![Component::full(
      ComponentKey::unqualified(HOMEBREW_PROVIDER_ID),
      Vec::new(),
      [
        (TAPS.to_string(), FullElement::set(taps)),
        (FORMULAS.to_string(), FullElement::set(formulas)),
        (CASKS.to_string(), FullElement::set(casks)),
      ]
      .into(),
    )])
  }

  fn render(&self, diff: &Component, host: Option<&Component>) -> Result<Vec<String>, ProviderError> {
    let key = diff.key();
    let mut commands = Vec::new();

    match &diff.body {
      ComponentBody::Diff { elements } => {
        let (tap, untap) = set_diff(elements, TAPS, &key)?;
        let (install, uninstall) = set_diff(elements, FORMULAS, &key)?;
        let (cask_install, cask_uninstall) = set_diff(elements, CASKS, &key)?;

        commands.extend(self.runner.to_command_lines(&["brew", "tap"], tap));
        commands.extend(self.runner.to_command_lines(&["brew", "install"], install));
        commands.extend(self.runner.to_command_lines(&["brew", "install", "--cask"], cask_install));
        commands.extend(self.runner.to_command_lines(&["brew", "uninstall"], uninstall));
        commands.extend(self.runner.to_command_lines(&["brew", "uninstall", "--cask"], cask_uninstall));
        commands.extend(self.runner.to_command_lines(&["brew", "untap"], untap));
      }
      ComponentBody::Full { elements } => {
        // A FULL marker in a diff stream means "create in full".
        commands.extend(self.runner.to_command_lines(&["brew", "tap"], set_items(elements, TAPS, &key)?));
        commands.extend(
          self
            .runner
            .to_command_lines(&["brew", "install"], set_items(elements, FORMULAS, &key)?),
        );
        commands.extend(
          self
            .runner
            .to_command_lines(&["brew", "install", "--cask"], set_items(elements, CASKS, &key)?),
        );
      }
      ComponentBody::Absent => {
        // Tear down everything the host component holds.
        let host = host.ok_or_else(|| ProviderError::RenderFailed {
          key: key.clone(),
          message: "host context required to render component removal".to_string(),
        })?;
        let elements = host.full_elements().ok_or_else(|| ProviderError::RenderFailed {
          key: key.clone(),
          message: format!("host component is {}, expected full", host.mode()),
        })?;

        commands.extend(
          self
            .runner
            .to_command_lines(&["brew", "uninstall"], set_items(elements, FORMULAS, &key)?),
        );
        commands.extend(
          self
            .runner
            .to_command_lines(&["brew", "uninstall", "--cask"], set_items(elements, CASKS, &key)?),
        );
        commands.extend(self.runner.to_command_lines(&["brew", "untap"], set_items(elements, TAPS, &key)?));
      }
    }

    Ok(commands)
  }
}
