//! Diagnostics for humans.
//!
//! Subcommands write their real output (state documents, command streams)
//! to stdout; everything here goes to stderr so diagnostics never leak
//! into a pipeline, except for the success note of commands whose only
//! output is a verdict.

use owo_colors::{OwoColorize, Stream};

/// Print a success verdict to stdout.
pub fn print_success(message: &str) {
  println!("{} {}", "ok:".if_supports_color(Stream::Stdout, |s| s.green()), message);
}

/// Print an error diagnostic to stderr.
pub fn print_error(message: &str) {
  eprintln!("{} {}", "error:".if_supports_color(Stream::Stderr, |s| s.red()), message);
}

/// Print a warning diagnostic to stderr.
pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    "warning:".if_supports_color(Stream::Stderr, |s| s.yellow()),
    message
  );
}
