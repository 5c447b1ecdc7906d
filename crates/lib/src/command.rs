//! Subprocess helpers for providers.
//!
//! Gathering reads host state through external tools, and rendering turns
//! long parameter lists into a bounded number of shell commands. Both go
//! through [`CommandRunner`], which chunks parameter lists below a CLI
//! length cap and captures subprocess output.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Upper bound on parameters per rendered command line.
const MAX_CLI_PARAMS: usize = 1024;

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("failed to run `{command}`: {source}")]
  Spawn {
    command: String,
    source: std::io::Error,
  },

  #[error("`{command}` exited with code {code:?}: {stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("`{command}` produced invalid JSON: {source}")]
  Json {
    command: String,
    source: serde_json::Error,
  },
}

/// Runs external commands and shapes their output for providers.
#[derive(Debug, Clone)]
pub struct CommandRunner {
  max_cli_params: usize,
}

impl Default for CommandRunner {
  fn default() -> Self {
    Self {
      max_cli_params: MAX_CLI_PARAMS,
    }
  }
}

impl CommandRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Expand a base command and a parameter list into one or more argv
  /// vectors, each below the parameter cap. An empty parameter list
  /// produces no commands.
  pub fn to_commands(&self, base: &[&str], params: impl IntoIterator<Item = String>) -> Vec<Vec<String>> {
    let limit = self.max_cli_params.saturating_sub(base.len()).max(1);
    let params: Vec<String> = params.into_iter().collect();
    params
      .chunks(limit)
      .map(|chunk| {
        base
          .iter()
          .map(|s| s.to_string())
          .chain(chunk.iter().cloned())
          .collect()
      })
      .collect()
  }

  /// Like [`CommandRunner::to_commands`], but joined into shell lines.
  pub fn to_command_lines(&self, base: &[&str], params: impl IntoIterator<Item = String>) -> Vec<String> {
    self
      .to_commands(base, params)
      .iter()
      .map(|argv| shell_join(argv))
      .collect()
  }

  /// Run a command and return its stdout split into non-empty lines.
  pub fn lines(&self, command: &[&str]) -> Result<Vec<String>, CommandError> {
    let stdout = self.run(command)?;
    Ok(stdout.lines().filter(|line| !line.is_empty()).map(str::to_string).collect())
  }

  /// Run a command and parse its stdout as JSON.
  pub fn json(&self, command: &[&str]) -> Result<serde_json::Value, CommandError> {
    let stdout = self.run(command)?;
    serde_json::from_str(&stdout).map_err(|source| CommandError::Json {
      command: command.join(" "),
      source,
    })
  }

  /// Run a command, returning its stdout. A nonzero exit is an error
  /// carrying the captured stderr.
  pub fn run(&self, command: &[&str]) -> Result<String, CommandError> {
    let rendered = command.join(" ");
    debug!(command = %rendered, "running");

    let (program, args) = command.split_first().unwrap_or((&"", &[]));
    let output = Command::new(program).args(args).output().map_err(|source| CommandError::Spawn {
      command: rendered.clone(),
      source,
    })?;

    if !output.status.success() {
      return Err(CommandError::Failed {
        command: rendered,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

/// Join an argv into a single shell line, quoting arguments that need it.
pub fn shell_join(argv: &[String]) -> String {
  argv.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" ")
}

fn shell_quote(arg: &str) -> String {
  let safe = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | '+' | ','));
  if safe {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}
