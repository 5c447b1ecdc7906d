//! rsd: the Ready-Set-Deploy command line.
//!
//! Each subcommand is a one-shot computation over state documents: read
//! state from files or stdin, write state or commands to stdout. Nothing
//! here executes commands or mutates the host.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rsd", version, about = "Offline-first deployment state pipeline")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the config file declaring external providers
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Gather the local state of one provider
  Gather {
    /// Provider id, e.g. packages.homebrew
    provider: String,

    /// Slash-separated qualifier selecting one instance
    #[arg(long)]
    qualifier: Option<String>,
  },

  /// Gather every provider/qualifier pair read from stdin
  ///
  /// Consumes the p=/q= line pairs that `rsd providers` emits:
  ///
  ///   rsd providers role.json | rsd gather-all
  GatherAll,

  /// List the provider/qualifier pairs of a state file
  Providers {
    /// State file, or - for stdin
    state: PathBuf,
  },

  /// Combine state files left to right
  Combine {
    /// State files, or - for stdin
    #[arg(required = true)]
    states: Vec<PathBuf>,
  },

  /// Compute the diff that moves HOST to ROLE
  Diff {
    /// Observed full state
    host: PathBuf,
    /// Desired full state
    role: PathBuf,
  },

  /// Render a diff state into ordered shell commands
  Commands {
    /// Diff state file, or - for stdin
    diff: PathBuf,

    /// Full host state giving removal context
    #[arg(long)]
    host: Option<PathBuf>,
  },

  /// Check a state file against provider schemas and dependencies
  Validate {
    /// State file, or - for stdin
    state: PathBuf,
  },

  /// Gather locally, diff against ROLE, and render the commands
  ApplyLocal {
    /// Desired state (full role or diff plan)
    role: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
  FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  let config = cli.config.as_deref();
  let result: Result<()> = match cli.command {
    Commands::Gather { provider, qualifier } => cmd::cmd_gather(config, &provider, qualifier.as_deref()),
    Commands::GatherAll => cmd::cmd_gather_all(config),
    Commands::Providers { state } => cmd::cmd_providers(&state),
    Commands::Combine { states } => cmd::cmd_combine(&states),
    Commands::Diff { host, role } => cmd::cmd_diff(&host, &role),
    Commands::Commands { diff, host } => cmd::cmd_commands(config, &diff, host.as_deref()),
    Commands::Validate { state } => cmd::cmd_validate(config, &state),
    Commands::ApplyLocal { role } => cmd::cmd_apply_local(config, &role),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      output::print_error(&format!("{:#}", err));
      ExitCode::from(exit_code(&err) as u8)
    }
  }
}

/// Map an error chain onto the documented exit codes.
fn exit_code(err: &anyhow::Error) -> i32 {
  err
    .chain()
    .find_map(|cause| cause.downcast_ref::<rsd_lib::Error>())
    .map(rsd_lib::Error::exit_code)
    .unwrap_or(1)
}
