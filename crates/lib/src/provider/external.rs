//! External executable providers.
//!
//! An external provider is any executable that speaks the provider
//! protocol: invoked as `PROG gather QUALIFIER` it writes a state document
//! holding its FULL components to stdout; invoked as `PROG render
//! QUALIFIER` it reads the component to render as JSON from stdin and
//! writes one shell command per stdout line. A nonzero exit surfaces as a
//! gather or render failure with the captured stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::component::Component;
use crate::provider::{Provider, ProviderError, Schema};

/// A provider backed by an external executable.
#[derive(Debug)]
pub struct ExternalProvider {
  id: String,
  program: PathBuf,
  schema: Schema,
}

impl ExternalProvider {
  pub fn new(id: impl Into<String>, program: PathBuf, schema: Schema) -> Self {
    Self {
      id: id.into(),
      program,
      schema,
    }
  }

  fn gather_error(&self, message: impl Into<String>) -> ProviderError {
    ProviderError::GatherFailed {
      provider: self.id.clone(),
      message: message.into(),
    }
  }
}

impl Provider for ExternalProvider {
  fn id(&self) -> &str {
    &self.id
  }

  fn schema(&self) -> &Schema {
    &self.schema
  }

  fn gather(&self, qualifier: Option<&[String]>) -> Result<Vec<Component>, ProviderError> {
    let qualifier = qualifier.map(|segments| segments.join("/")).unwrap_or_default();
    debug!(provider = %self.id, program = %self.program.display(), %qualifier, "external gather");

    let output = Command::new(&self.program)
      .arg("gather")
      .arg(&qualifier)
      .output()
      .map_err(|err| self.gather_error(format!("failed to run {}: {}", self.program.display(), err)))?;

    if !output.status.success() {
      return Err(self.gather_error(format!(
        "exited with code {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr).trim_end()
      )));
    }

    let system = crate::state::read_system(output.stdout.as_slice())
      .map_err(|err| self.gather_error(format!("unreadable gather output: {}", err)))?;
    Ok(system.components().cloned().collect())
  }

  fn render(&self, diff: &Component, _host: Option<&Component>) -> Result<Vec<String>, ProviderError> {
    let render_error = |message: String| ProviderError::RenderFailed {
      key: diff.key(),
      message,
    };
    let qualifier = diff.qualifier.join("/");
    debug!(provider = %self.id, program = %self.program.display(), %qualifier, "external render");

    let payload = serde_json::to_string(diff).map_err(|err| render_error(err.to_string()))?;

    let mut child = Command::new(&self.program)
      .arg("render")
      .arg(&qualifier)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|err| render_error(format!("failed to run {}: {}", self.program.display(), err)))?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(payload.as_bytes())
        .map_err(|err| render_error(format!("failed to write diff to stdin: {}", err)))?;
    }

    let output = child
      .wait_with_output()
      .map_err(|err| render_error(format!("failed to collect output: {}", err)))?;

    if !output.status.success() {
      return Err(render_error(format!(
        "exited with code {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr).trim_end()
      )));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    )
  }
}
