//! The crate-level error type and its exit-code mapping.

use thiserror::Error;

use crate::component::ComponentError;
use crate::config::ConfigError;
use crate::element::ElementError;
use crate::provider::ProviderError;
use crate::state::StateError;
use crate::system::SystemError;

/// Result type for rsd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error the pipeline can surface.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Element(#[from] ElementError),

  #[error(transparent)]
  Component(#[from] ComponentError),

  #[error(transparent)]
  System(#[from] SystemError),

  #[error(transparent)]
  State(#[from] StateError),

  #[error(transparent)]
  Provider(#[from] ProviderError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl Error {
  /// The process exit code for this error.
  ///
  /// 1: input/parse errors. 2: invalid state, including schema,
  /// dependency, kind, and component mismatches. 3: provider failures.
  /// 4: list drift or a missing base during apply.
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::State(_) | Error::Config(_) => 1,
      Error::Element(err) => element_exit_code(err),
      Error::Component(err) => component_exit_code(err),
      Error::System(err) => match err {
        SystemError::MissingBase { .. } => 4,
        SystemError::Component(component) => component_exit_code(component),
        _ => 2,
      },
      // A schema mismatch is an invalid-state problem, not a provider
      // lookup or execution failure.
      Error::Provider(ProviderError::SchemaMismatch { .. }) => 2,
      Error::Provider(_) => 3,
    }
  }
}

fn element_exit_code(err: &ElementError) -> i32 {
  match err {
    ElementError::ListDrift { .. } => 4,
    ElementError::KindMismatch { .. } => 2,
  }
}

fn component_exit_code(err: &ComponentError) -> i32 {
  match err {
    ComponentError::Element { source, .. } => element_exit_code(source),
    _ => 2,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::component::ComponentKey;
  use crate::element::Kind;

  #[test]
  fn exit_codes_match_the_taxonomy() {
    let parse: Error = StateError::UnsupportedVersion(7).into();
    assert_eq!(parse.exit_code(), 1);

    let kind: Error = ElementError::KindMismatch {
      expected: Kind::Atom,
      found: Kind::Set,
    }
    .into();
    assert_eq!(kind.exit_code(), 2);

    let invalid: Error = SystemError::InvalidSystem {
      key: ComponentKey::unqualified("a"),
      dependency: ComponentKey::unqualified("b"),
    }
    .into();
    assert_eq!(invalid.exit_code(), 2);

    let schema: Error = ProviderError::SchemaMismatch {
      key: ComponentKey::unqualified("a"),
      element: "packages".to_string(),
      problem: "is missing".to_string(),
    }
    .into();
    assert_eq!(schema.exit_code(), 2);

    let unknown: Error = ProviderError::Unknown("nope".to_string()).into();
    assert_eq!(unknown.exit_code(), 3);

    let gather: Error = ProviderError::GatherFailed {
      provider: "a".to_string(),
      message: "boom".to_string(),
    }
    .into();
    assert_eq!(gather.exit_code(), 3);

    let drift: Error = ElementError::ListDrift { line: 3 }.into();
    assert_eq!(drift.exit_code(), 4);

    let missing: Error = SystemError::MissingBase {
      key: ComponentKey::unqualified("a"),
    }
    .into();
    assert_eq!(missing.exit_code(), 4);
  }

  #[test]
  fn nested_drift_keeps_its_exit_code() {
    // Drift surfacing through a component apply still exits 4.
    let nested: Error = SystemError::Component(ComponentError::Element {
      key: ComponentKey::unqualified("files"),
      element: "lines".to_string(),
      source: ElementError::ListDrift { line: 0 },
    })
    .into();
    assert_eq!(nested.exit_code(), 4);
  }
}
