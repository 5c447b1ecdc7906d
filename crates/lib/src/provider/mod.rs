//! Providers: pluggable gather/render capability pairs.
//!
//! A provider owns one component type. It can inspect the host and emit the
//! FULL components of that type (`gather`), and it can translate a
//! component of that type from a diff system into the shell commands that
//! would effect the change (`render`). Providers also declare the element
//! schema of their component type, which the registry enforces on every
//! component passing through it.

pub mod external;
pub mod homebrew;
mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{Component, ComponentBody, ComponentKey};
use crate::element::Kind;

pub use registry::{GatherOutcome, GatherRequest, ProviderRegistry};

/// Errors from provider lookup and dispatch.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("unknown provider: {0}")]
  Unknown(String),

  /// A component's elements do not match its provider's declared schema.
  #[error("schema mismatch for {key}: element {element} {problem}")]
  SchemaMismatch {
    key: ComponentKey,
    element: String,
    problem: String,
  },

  #[error("gather failed for {provider}: {message}")]
  GatherFailed { provider: String, message: String },

  #[error("render failed for {key}: {message}")]
  RenderFailed { key: ComponentKey, message: String },
}

/// The element schema of a component type: which named elements exist and
/// what kind each one has. Uniform across all components of the type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
  elements: BTreeMap<String, Kind>,
}

impl Schema {
  pub fn new(elements: impl IntoIterator<Item = (String, Kind)>) -> Self {
    Self {
      elements: elements.into_iter().collect(),
    }
  }

  pub fn kind_of(&self, element: &str) -> Option<Kind> {
    self.elements.get(element).copied()
  }

  /// Check a component against this schema: every declared element present
  /// (FULL and DIFF modes), no undeclared elements, kinds matching. ABSENT
  /// components carry no elements and always pass.
  pub fn validate(&self, component: &Component) -> Result<(), ProviderError> {
    match &component.body {
      ComponentBody::Absent => Ok(()),
      ComponentBody::Full { elements } => self.check_elements(component, elements, |e| e.kind()),
      ComponentBody::Diff { elements } => self.check_elements(component, elements, |e| e.kind()),
    }
  }

  fn check_elements<T>(
    &self,
    component: &Component,
    elements: &BTreeMap<String, T>,
    kind_of: impl Fn(&T) -> Kind,
  ) -> Result<(), ProviderError> {
    let mismatch = |element: &str, problem: String| ProviderError::SchemaMismatch {
      key: component.key(),
      element: element.to_string(),
      problem,
    };

    for (name, declared) in &self.elements {
      match elements.get(name) {
        None => return Err(mismatch(name, "is missing".to_string())),
        Some(element) if kind_of(element) != *declared => {
          return Err(mismatch(name, format!("is {}, expected {}", kind_of(element), declared)));
        }
        Some(_) => {}
      }
    }
    for name in elements.keys() {
      if !self.elements.contains_key(name) {
        return Err(mismatch(name, "is not declared".to_string()));
      }
    }
    Ok(())
  }
}

/// A gather/render capability pair tied to one component type.
pub trait Provider {
  /// The stable id naming this provider's component type.
  fn id(&self) -> &str;

  /// The element schema of this provider's components.
  fn schema(&self) -> &Schema;

  /// Inspect the host and emit the FULL components of this provider's
  /// type. With a qualifier, emit only the matching instance; without,
  /// emit all instances. Side effects are limited to reading host state.
  fn gather(&self, qualifier: Option<&[String]>) -> Result<Vec<Component>, ProviderError>;

  /// Translate a DIFF/FULL/ABSENT component into the shell command lines
  /// that would effect the described change. `host` carries the pre-change
  /// component when the caller knows it, which ABSENT teardown needs.
  /// Pure with respect to host state.
  fn render(&self, diff: &Component, host: Option<&Component>) -> Result<Vec<String>, ProviderError>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::element::{DiffElement, FullElement};

  fn schema() -> Schema {
    Schema::new([
      ("packages".to_string(), Kind::Set),
      ("options".to_string(), Kind::Map),
    ])
  }

  fn key() -> ComponentKey {
    ComponentKey::unqualified("test")
  }

  #[test]
  fn full_component_matching_schema_passes() {
    let component = Component::full(
      key(),
      Vec::new(),
      [
        ("packages".to_string(), FullElement::set(["git"])),
        ("options".to_string(), FullElement::map([("k", FullElement::atom("v"))])),
      ]
      .into(),
    );
    assert!(schema().validate(&component).is_ok());
  }

  #[test]
  fn missing_element_fails() {
    let component = Component::full(key(), Vec::new(), [("packages".to_string(), FullElement::set(["git"]))].into());
    assert!(matches!(
      schema().validate(&component),
      Err(ProviderError::SchemaMismatch { .. })
    ));
  }

  #[test]
  fn wrong_kind_fails() {
    let component = Component::full(
      key(),
      Vec::new(),
      [
        ("packages".to_string(), FullElement::atom("git")),
        ("options".to_string(), FullElement::map([("k", FullElement::atom("v"))])),
      ]
      .into(),
    );
    assert!(matches!(
      schema().validate(&component),
      Err(ProviderError::SchemaMismatch { .. })
    ));
  }

  #[test]
  fn undeclared_element_fails() {
    let component = Component::full(
      key(),
      Vec::new(),
      [
        ("packages".to_string(), FullElement::set(["git"])),
        ("options".to_string(), FullElement::map([("k", FullElement::atom("v"))])),
        ("extra".to_string(), FullElement::atom("x")),
      ]
      .into(),
    );
    assert!(matches!(
      schema().validate(&component),
      Err(ProviderError::SchemaMismatch { .. })
    ));
  }

  #[test]
  fn diff_component_is_checked_too() {
    let component = Component::diff(
      key(),
      Vec::new(),
      [
        (
          "packages".to_string(),
          DiffElement::Set {
            to_add: ["git".to_string()].into(),
            to_remove: Default::default(),
          },
        ),
        (
          "options".to_string(),
          DiffElement::Map {
            keys_to_remove: Default::default(),
            entries_to_set: Default::default(),
          },
        ),
      ]
      .into(),
    );
    assert!(schema().validate(&component).is_ok());
  }

  #[test]
  fn absent_component_always_passes() {
    let component = Component::absent(key(), Vec::new());
    assert!(schema().validate(&component).is_ok());
  }
}
