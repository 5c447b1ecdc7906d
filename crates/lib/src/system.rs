//! Systems: keyed collections of components.
//!
//! A system is full when every component in it is FULL and every declared
//! dependency resolves to a component in the system; anything else is
//! partial. Diffing two full systems produces a partial system of DIFF
//! components plus FULL markers (create in full) and ABSENT markers
//! (destroy) for components present on only one side.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use thiserror::Error;

use crate::component::{Component, ComponentBody, ComponentError, ComponentKey, StateMode};

/// Errors from system operations.
#[derive(Debug, Error)]
pub enum SystemError {
  /// An operation required a full system but found a non-FULL component.
  #[error("system is not full: component {key} is {mode}")]
  NotFull { key: ComponentKey, mode: StateMode },

  /// A DIFF component was applied to a host that lacks its base.
  #[error("missing base component {key} for diff application")]
  MissingBase { key: ComponentKey },

  /// A dependency edge points at a component not present in the system.
  #[error("invalid system: {key} depends on missing component {dependency}")]
  InvalidSystem {
    key: ComponentKey,
    dependency: ComponentKey,
  },

  /// The dependency relation among components contains a cycle.
  #[error("dependency cycle among components")]
  DependencyCycle,

  /// Two components with the same key were given for one system.
  #[error("duplicate component {0}")]
  DuplicateComponent(ComponentKey),

  #[error(transparent)]
  Component(#[from] ComponentError),
}

/// A collection of components keyed by `(provider, qualifier)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct System {
  components: BTreeMap<ComponentKey, Component>,
}

impl System {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_components(components: impl IntoIterator<Item = Component>) -> Result<Self, SystemError> {
    let mut map = BTreeMap::new();
    for component in components {
      match map.entry(component.key()) {
        Entry::Vacant(entry) => {
          entry.insert(component);
        }
        Entry::Occupied(entry) => return Err(SystemError::DuplicateComponent(entry.key().clone())),
      }
    }
    Ok(Self { components: map })
  }

  pub fn insert(&mut self, component: Component) {
    self.components.insert(component.key(), component);
  }

  pub fn get(&self, key: &ComponentKey) -> Option<&Component> {
    self.components.get(key)
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  /// Components in canonical key order.
  pub fn components(&self) -> impl Iterator<Item = &Component> {
    self.components.values()
  }

  pub fn keys(&self) -> impl Iterator<Item = &ComponentKey> {
    self.components.keys()
  }

  /// True when every component is in FULL mode.
  ///
  /// This is the precondition for diff/apply/combine. It is weaker than
  /// [`System::is_full`], which additionally requires dependencies to
  /// resolve: the algebra does not require validity, the renderer does.
  pub fn all_full(&self) -> bool {
    self.components.values().all(Component::is_full)
  }

  /// True when this is a full system: every component FULL and every
  /// dependency satisfied.
  pub fn is_full(&self) -> bool {
    self.all_full() && self.validation_errors().is_empty()
  }

  fn require_all_full(&self) -> Result<(), SystemError> {
    match self.components.values().find(|c| !c.is_full()) {
      None => Ok(()),
      Some(component) => Err(SystemError::NotFull {
        key: component.key(),
        mode: component.mode(),
      }),
    }
  }

  /// Every dependency edge that does not resolve within the system.
  pub fn validation_errors(&self) -> Vec<(ComponentKey, ComponentKey)> {
    let mut errors = Vec::new();
    for component in self.components.values() {
      for dependency in &component.dependencies {
        if !self.components.contains_key(dependency) {
          errors.push((component.key(), dependency.clone()));
        }
      }
    }
    errors
  }

  /// Check that every dependency resolves.
  pub fn validate(&self) -> Result<(), SystemError> {
    match self.validation_errors().into_iter().next() {
      None => Ok(()),
      Some((key, dependency)) => Err(SystemError::InvalidSystem { key, dependency }),
    }
  }

  /// Diff this (host) system against a role system.
  ///
  /// Components present in both diff component-wise (equal components are
  /// omitted); components only in the role become FULL markers; components
  /// only in the host become ABSENT markers. The result is partial.
  pub fn diff(&self, role: &System) -> Result<System, SystemError> {
    self.require_all_full()?;
    role.require_all_full()?;

    let mut result = System::new();
    for (key, host_component) in &self.components {
      match role.components.get(key) {
        Some(role_component) if host_component == role_component => {}
        Some(role_component) => result.insert(host_component.diff_against(role_component)?),
        None => result.insert(Component::absent(key.clone(), host_component.dependencies.clone())),
      }
    }
    for (key, role_component) in &role.components {
      if !self.components.contains_key(key) {
        result.insert(role_component.clone());
      }
    }
    Ok(result)
  }

  /// Apply a diff system to this (host) system.
  ///
  /// FULL markers replace, ABSENT markers delete, DIFF components apply
  /// element-wise and require their base to be present.
  pub fn apply(&self, delta: &System) -> Result<System, SystemError> {
    self.require_all_full()?;

    let mut result = self.clone();
    for (key, component) in &delta.components {
      match &component.body {
        ComponentBody::Full { .. } => result.insert(component.clone()),
        ComponentBody::Absent => {
          result.components.remove(key);
        }
        ComponentBody::Diff { .. } => {
          let base = result
            .components
            .get(key)
            .ok_or_else(|| SystemError::MissingBase { key: key.clone() })?;
          let applied = base.apply(component)?;
          result.insert(applied);
        }
      }
    }
    Ok(result)
  }

  /// Combine two full systems: shared keys merge component-wise, disjoint
  /// keys pass through.
  pub fn combine(&self, other: &System) -> Result<System, SystemError> {
    self.require_all_full()?;
    other.require_all_full()?;

    let mut result = self.clone();
    for (key, component) in &other.components {
      let merged = match result.components.get(key) {
        Some(existing) => existing.combine(component)?,
        None => component.clone(),
      };
      result.insert(merged);
    }
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::element::FullElement;
  use std::collections::BTreeMap;

  fn component(provider: &str, items: &[&str]) -> Component {
    component_with_deps(provider, items, Vec::new())
  }

  fn component_with_deps(provider: &str, items: &[&str], dependencies: Vec<ComponentKey>) -> Component {
    let elements: BTreeMap<String, FullElement> =
      [("packages".to_string(), FullElement::set(items.iter().copied()))].into();
    Component::full(ComponentKey::unqualified(provider), dependencies, elements)
  }

  fn system(components: Vec<Component>) -> System {
    System::from_components(components).unwrap()
  }

  #[test]
  fn duplicate_components_rejected() {
    let result = System::from_components(vec![component("apt", &["git"]), component("apt", &["htop"])]);
    assert!(matches!(result, Err(SystemError::DuplicateComponent(_))));
  }

  #[test]
  fn diff_then_apply_yields_role() {
    let host = system(vec![component("apt", &["git", "curl"]), component("brew", &["jq"])]);
    let role = system(vec![component("apt", &["git", "htop"]), component("brew", &["jq"])]);

    let diff = host.diff(&role).unwrap();
    // brew is unchanged and omitted from the diff.
    assert_eq!(diff.len(), 1);
    assert!(!diff.all_full());

    assert_eq!(host.apply(&diff).unwrap(), role);
  }

  #[test]
  fn diff_emits_full_marker_for_role_only_component() {
    let host = system(vec![]);
    let role = system(vec![component("apt", &["git"])]);

    let diff = host.diff(&role).unwrap();
    let marker = diff.get(&ComponentKey::unqualified("apt")).unwrap();
    assert_eq!(marker.mode(), StateMode::Full);

    assert_eq!(host.apply(&diff).unwrap(), role);
  }

  #[test]
  fn diff_emits_absent_marker_for_host_only_component() {
    let host = system(vec![component("apt", &["git"])]);
    let role = system(vec![]);

    let diff = host.diff(&role).unwrap();
    let marker = diff.get(&ComponentKey::unqualified("apt")).unwrap();
    assert_eq!(marker.mode(), StateMode::Absent);

    assert_eq!(host.apply(&diff).unwrap(), role);
  }

  #[test]
  fn absent_marker_retains_dependencies() {
    let dep = ComponentKey::unqualified("base");
    let host = system(vec![
      component("base", &["x"]),
      component_with_deps("apt", &["git"], vec![dep.clone()]),
    ]);
    let role = system(vec![component("base", &["x"])]);

    let diff = host.diff(&role).unwrap();
    let marker = diff.get(&ComponentKey::unqualified("apt")).unwrap();
    assert_eq!(marker.dependencies, vec![dep]);
  }

  #[test]
  fn apply_diff_without_base_fails() {
    let host = system(vec![component("apt", &["git"])]);
    let role = system(vec![component("apt", &["htop"])]);
    let diff = host.diff(&role).unwrap();

    let empty = system(vec![]);
    assert!(matches!(empty.apply(&diff), Err(SystemError::MissingBase { .. })));
  }

  #[test]
  fn diff_of_partial_system_fails() {
    let host = system(vec![component("apt", &["git"])]);
    let role = system(vec![component("apt", &["htop"])]);
    let diff = host.diff(&role).unwrap();

    assert!(matches!(diff.diff(&role), Err(SystemError::NotFull { .. })));
    assert!(matches!(host.combine(&diff), Err(SystemError::NotFull { .. })));
  }

  #[test]
  fn combine_disjoint_is_order_insensitive() {
    let a = system(vec![component("apt", &["git"])]);
    let b = system(vec![component("brew", &["jq"])]);

    let ab = a.combine(&b).unwrap();
    let ba = b.combine(&a).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.len(), 2);
  }

  #[test]
  fn combine_is_idempotent() {
    let a = system(vec![component("apt", &["git", "curl"])]);
    assert_eq!(a.combine(&a).unwrap(), a);
  }

  #[test]
  fn combine_is_associative_over_disjoint_keys() {
    let a = system(vec![component("apt", &["git"])]);
    let b = system(vec![component("brew", &["jq"])]);
    let c = system(vec![component("pipx", &["httpie"])]);

    let left = a.combine(&b).unwrap().combine(&c).unwrap();
    let right = a.combine(&b.combine(&c).unwrap()).unwrap();
    assert_eq!(left, right);
  }

  #[test]
  fn combine_merges_shared_keys() {
    let a = system(vec![component("apt", &["git"])]);
    let b = system(vec![component("apt", &["htop"])]);

    let combined = a.combine(&b).unwrap();
    assert_eq!(combined, system(vec![component("apt", &["git", "htop"])]));
  }

  #[test]
  fn validity_checks_dependencies() {
    let satisfied = system(vec![
      component("base", &["x"]),
      component_with_deps("apt", &["git"], vec![ComponentKey::unqualified("base")]),
    ]);
    assert!(satisfied.validate().is_ok());
    assert!(satisfied.is_full());

    let dangling = system(vec![component_with_deps(
      "apt",
      &["git"],
      vec![ComponentKey::unqualified("missing")],
    )]);
    assert!(matches!(dangling.validate(), Err(SystemError::InvalidSystem { .. })));
    // All components are FULL, but the system is not full without its deps.
    assert!(dangling.all_full());
    assert!(!dangling.is_full());
  }

  #[test]
  fn empty_system_is_full() {
    assert!(System::new().is_full());
  }
}
