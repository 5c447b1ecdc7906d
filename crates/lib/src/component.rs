//! Components: keyed bundles of named elements.
//!
//! A component is owned by a provider and identified by its
//! `(provider, qualifier)` key. Its body is one of three modes: FULL (the
//! complete state of the component), DIFF (changes to apply to it), or
//! ABSENT (a tombstone marking the component for removal). The mode is
//! structural, so a FULL component can only hold full elements and a DIFF
//! component can only hold diff elements.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{DiffElement, ElementError, FullElement};

/// Identity of a component: which provider owns it, and which instance of
/// that provider's type it is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentKey {
  pub provider: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub qualifier: Vec<String>,
}

impl ComponentKey {
  pub fn new(provider: impl Into<String>, qualifier: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      provider: provider.into(),
      qualifier: qualifier.into_iter().map(Into::into).collect(),
    }
  }

  pub fn unqualified(provider: impl Into<String>) -> Self {
    Self {
      provider: provider.into(),
      qualifier: Vec::new(),
    }
  }
}

impl fmt::Display for ComponentKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.qualifier.is_empty() {
      write!(f, "{}", self.provider)
    } else {
      write!(f, "{} {{{}}}", self.provider, self.qualifier.join("/"))
    }
  }
}

/// The three modes a component may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
  Full,
  Diff,
  Absent,
}

impl fmt::Display for StateMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StateMode::Full => "full",
      StateMode::Diff => "diff",
      StateMode::Absent => "absent",
    };
    write!(f, "{}", name)
  }
}

/// The mode-tagged body of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state_mode", rename_all = "snake_case")]
pub enum ComponentBody {
  Full { elements: BTreeMap<String, FullElement> },
  Diff { elements: BTreeMap<String, DiffElement> },
  Absent,
}

/// Errors from component operations.
#[derive(Debug, Error)]
pub enum ComponentError {
  /// Diff/apply/combine across components with different keys.
  #[error("component mismatch: {left} vs {right}")]
  Mismatch { left: ComponentKey, right: ComponentKey },

  /// An operation received a component in a mode it does not accept.
  #[error("cannot {operation} {mode} component {key}")]
  WrongMode {
    key: ComponentKey,
    operation: &'static str,
    mode: StateMode,
  },

  /// Two components of the same key disagree on their element names.
  #[error("{key}: element {element} present on one side only")]
  ElementSetMismatch { key: ComponentKey, element: String },

  /// An element-level operation failed.
  #[error("{key}.{element}: {source}")]
  Element {
    key: ComponentKey,
    element: String,
    source: ElementError,
  },
}

/// A component: a `(provider, qualifier)`-keyed bundle of named elements
/// with a mode and dependencies on other components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
  pub provider: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub qualifier: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<ComponentKey>,
  #[serde(flatten)]
  pub body: ComponentBody,
}

impl Component {
  pub fn full(key: ComponentKey, dependencies: Vec<ComponentKey>, elements: BTreeMap<String, FullElement>) -> Self {
    Self {
      provider: key.provider,
      qualifier: key.qualifier,
      dependencies,
      body: ComponentBody::Full { elements },
    }
  }

  pub fn diff(key: ComponentKey, dependencies: Vec<ComponentKey>, elements: BTreeMap<String, DiffElement>) -> Self {
    Self {
      provider: key.provider,
      qualifier: key.qualifier,
      dependencies,
      body: ComponentBody::Diff { elements },
    }
  }

  /// A tombstone marking this component for removal. The dependencies are
  /// retained so removal ordering still sees the edges.
  pub fn absent(key: ComponentKey, dependencies: Vec<ComponentKey>) -> Self {
    Self {
      provider: key.provider,
      qualifier: key.qualifier,
      dependencies,
      body: ComponentBody::Absent,
    }
  }

  pub fn key(&self) -> ComponentKey {
    ComponentKey {
      provider: self.provider.clone(),
      qualifier: self.qualifier.clone(),
    }
  }

  pub fn mode(&self) -> StateMode {
    match self.body {
      ComponentBody::Full { .. } => StateMode::Full,
      ComponentBody::Diff { .. } => StateMode::Diff,
      ComponentBody::Absent => StateMode::Absent,
    }
  }

  pub fn is_full(&self) -> bool {
    matches!(self.body, ComponentBody::Full { .. })
  }

  pub fn full_elements(&self) -> Option<&BTreeMap<String, FullElement>> {
    match &self.body {
      ComponentBody::Full { elements } => Some(elements),
      _ => None,
    }
  }

  pub fn diff_elements(&self) -> Option<&BTreeMap<String, DiffElement>> {
    match &self.body {
      ComponentBody::Diff { elements } => Some(elements),
      _ => None,
    }
  }

  fn require_full(&self, operation: &'static str) -> Result<&BTreeMap<String, FullElement>, ComponentError> {
    self.full_elements().ok_or_else(|| ComponentError::WrongMode {
      key: self.key(),
      operation,
      mode: self.mode(),
    })
  }

  fn check_same_key(&self, other: &Component) -> Result<(), ComponentError> {
    if self.provider == other.provider && self.qualifier == other.qualifier {
      Ok(())
    } else {
      Err(ComponentError::Mismatch {
        left: self.key(),
        right: other.key(),
      })
    }
  }

  fn check_same_elements<A, B>(
    &self,
    ours: &BTreeMap<String, A>,
    theirs: &BTreeMap<String, B>,
  ) -> Result<(), ComponentError> {
    for name in ours.keys().chain(theirs.keys()) {
      if !ours.contains_key(name) || !theirs.contains_key(name) {
        return Err(ComponentError::ElementSetMismatch {
          key: self.key(),
          element: name.clone(),
        });
      }
    }
    Ok(())
  }

  /// Diff two FULL components of the same key into a DIFF component.
  ///
  /// The result's dependencies are the union of both operands'.
  pub fn diff_against(&self, other: &Component) -> Result<Component, ComponentError> {
    self.check_same_key(other)?;
    let ours = self.require_full("diff")?;
    let theirs = other.require_full("diff")?;
    self.check_same_elements(ours, theirs)?;

    let mut elements = BTreeMap::new();
    for (name, element) in ours {
      let diffed = element.diff(&theirs[name]).map_err(|source| ComponentError::Element {
        key: self.key(),
        element: name.clone(),
        source,
      })?;
      elements.insert(name.clone(), diffed);
    }

    Ok(Component::diff(
      self.key(),
      union_dependencies(&self.dependencies, &other.dependencies),
      elements,
    ))
  }

  /// Apply a DIFF component to this FULL component.
  pub fn apply(&self, diff: &Component) -> Result<Component, ComponentError> {
    self.check_same_key(diff)?;
    let ours = self.require_full("apply diff to")?;
    let theirs = match &diff.body {
      ComponentBody::Diff { elements } => elements,
      _ => {
        return Err(ComponentError::WrongMode {
          key: diff.key(),
          operation: "apply",
          mode: diff.mode(),
        });
      }
    };
    self.check_same_elements(ours, theirs)?;

    let mut elements = BTreeMap::new();
    for (name, element) in ours {
      let applied = element.apply(&theirs[name]).map_err(|source| ComponentError::Element {
        key: self.key(),
        element: name.clone(),
        source,
      })?;
      elements.insert(name.clone(), applied);
    }

    Ok(Component::full(self.key(), self.dependencies.clone(), elements))
  }

  /// Combine two FULL components of the same key.
  pub fn combine(&self, other: &Component) -> Result<Component, ComponentError> {
    self.check_same_key(other)?;
    let ours = self.require_full("combine")?;
    let theirs = other.require_full("combine")?;
    self.check_same_elements(ours, theirs)?;

    let mut elements = BTreeMap::new();
    for (name, element) in ours {
      let combined = element.combine(&theirs[name]).map_err(|source| ComponentError::Element {
        key: self.key(),
        element: name.clone(),
        source,
      })?;
      elements.insert(name.clone(), combined);
    }

    Ok(Component::full(
      self.key(),
      union_dependencies(&self.dependencies, &other.dependencies),
      elements,
    ))
  }
}

/// Ordered, deduplicated union of two dependency lists.
fn union_dependencies(a: &[ComponentKey], b: &[ComponentKey]) -> Vec<ComponentKey> {
  let mut deps = a.to_vec();
  for dep in b {
    if !deps.contains(dep) {
      deps.push(dep.clone());
    }
  }
  deps
}
