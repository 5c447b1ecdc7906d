//! The element algebra.
//!
//! Elements are the basic building blocks of system configuration state.
//! Every element exists in one of four kinds, and every kind has a "full"
//! form (describing a state) and a "diff" form (describing a change between
//! two states):
//!
//! - [`FullElement::Atom`]: an atomically replaceable string
//! - [`FullElement::Set`]: an unordered collection of unique atoms
//! - [`FullElement::Map`]: a mapping of atoms to elements of a single kind
//! - [`FullElement::List`]: an ordered sequence of atoms
//!
//! The three operations are `diff` (produce the change from one full value
//! to another), `apply` (replay a change onto a full value), and `combine`
//! (merge two full values, right-biased where a choice has to be made).
//! For any two full values `a` and `b` of the same kind,
//! `a.apply(&a.diff(&b)?)? == b`.

mod list_diff;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use list_diff::{DEFAULT_CONTEXT, Hunk, HunkLine};

/// The four element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
  Atom,
  Set,
  Map,
  List,
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Kind::Atom => "atom",
      Kind::Set => "set",
      Kind::Map => "map",
      Kind::List => "list",
    };
    write!(f, "{}", name)
  }
}

/// Errors from element operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
  /// An operation received operands of different kinds, or a map mixes
  /// value kinds.
  #[error("kind mismatch: expected {expected}, got {found}")]
  KindMismatch { expected: Kind, found: Kind },

  /// A list-diff hunk could not be located in the list it was applied to.
  #[error("list drift: hunk near line {line} could not be located")]
  ListDrift { line: usize },
}

/// A full element: the complete state of one named value.
///
/// Sets and lists contain atoms directly; only map values recurse, and all
/// values of one map must share a single kind (see [`FullElement::validate`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FullElement {
  Atom { value: String },
  Set { items: BTreeSet<String> },
  Map { entries: BTreeMap<String, FullElement> },
  List { items: Vec<String> },
}

/// A diff element: the change between two full elements of the same kind.
///
/// Map diffs carry full replacement values, not nested diffs, so the
/// diff/apply round trip holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffElement {
  Atom {
    value: String,
  },
  Set {
    to_add: BTreeSet<String>,
    to_remove: BTreeSet<String>,
  },
  Map {
    keys_to_remove: BTreeSet<String>,
    entries_to_set: BTreeMap<String, FullElement>,
  },
  List {
    context: usize,
    hunks: Vec<Hunk>,
  },
}

impl FullElement {
  pub fn atom(value: impl Into<String>) -> Self {
    FullElement::Atom { value: value.into() }
  }

  pub fn set<I, S>(items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    FullElement::Set {
      items: items.into_iter().map(Into::into).collect(),
    }
  }

  pub fn map<I, S>(entries: I) -> Self
  where
    I: IntoIterator<Item = (S, FullElement)>,
    S: Into<String>,
  {
    FullElement::Map {
      entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
  }

  pub fn list<I, S>(items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    FullElement::List {
      items: items.into_iter().map(Into::into).collect(),
    }
  }

  pub fn kind(&self) -> Kind {
    match self {
      FullElement::Atom { .. } => Kind::Atom,
      FullElement::Set { .. } => Kind::Set,
      FullElement::Map { .. } => Kind::Map,
      FullElement::List { .. } => Kind::List,
    }
  }

  /// The identity full value of the given kind: empty string, empty set,
  /// empty map, empty list.
  pub fn zero(kind: Kind) -> Self {
    match kind {
      Kind::Atom => FullElement::Atom { value: String::new() },
      Kind::Set => FullElement::Set { items: BTreeSet::new() },
      Kind::Map => FullElement::Map { entries: BTreeMap::new() },
      Kind::List => FullElement::List { items: Vec::new() },
    }
  }

  /// Check the map-homogeneity invariant: all values of one map share a
  /// single kind, recursively.
  pub fn validate(&self) -> Result<(), ElementError> {
    if let FullElement::Map { entries } = self {
      let mut expected = None;
      for value in entries.values() {
        let kind = value.kind();
        match expected {
          None => expected = Some(kind),
          Some(expected) if expected != kind => {
            return Err(ElementError::KindMismatch { expected, found: kind });
          }
          Some(_) => {}
        }
        value.validate()?;
      }
    }
    Ok(())
  }

  fn kind_mismatch(&self, found: Kind) -> ElementError {
    ElementError::KindMismatch {
      expected: self.kind(),
      found,
    }
  }

  /// Produce the diff element that, applied to `self`, yields `other`.
  pub fn diff(&self, other: &FullElement) -> Result<DiffElement, ElementError> {
    let diff = match (self, other) {
      (FullElement::Atom { .. }, FullElement::Atom { value }) => DiffElement::Atom { value: value.clone() },
      (FullElement::Set { items: ours }, FullElement::Set { items: theirs }) => DiffElement::Set {
        to_add: theirs.difference(ours).cloned().collect(),
        to_remove: ours.difference(theirs).cloned().collect(),
      },
      (FullElement::Map { entries: ours }, FullElement::Map { entries: theirs }) => DiffElement::Map {
        keys_to_remove: ours.keys().filter(|k| !theirs.contains_key(*k)).cloned().collect(),
        entries_to_set: theirs
          .iter()
          .filter(|(k, v)| ours.get(*k) != Some(v))
          .map(|(k, v)| (k.clone(), v.clone()))
          .collect(),
      },
      (FullElement::List { items: ours }, FullElement::List { items: theirs }) => DiffElement::List {
        context: DEFAULT_CONTEXT,
        hunks: list_diff::diff(ours, theirs, DEFAULT_CONTEXT),
      },
      _ => return Err(self.kind_mismatch(other.kind())),
    };
    Ok(diff)
  }

  /// Apply a diff element to `self`, producing the changed full element.
  pub fn apply(&self, diff: &DiffElement) -> Result<FullElement, ElementError> {
    let applied = match (self, diff) {
      (FullElement::Atom { .. }, DiffElement::Atom { value }) => FullElement::Atom { value: value.clone() },
      (FullElement::Set { items }, DiffElement::Set { to_add, to_remove }) => {
        // Removals are applied last, so an atom in both sets ends up removed.
        let items = items.union(to_add).filter(|item| !to_remove.contains(*item)).cloned().collect();
        FullElement::Set { items }
      }
      (
        FullElement::Map { entries },
        DiffElement::Map {
          keys_to_remove,
          entries_to_set,
        },
      ) => {
        let mut entries = entries.clone();
        for key in keys_to_remove {
          entries.remove(key);
        }
        for (key, value) in entries_to_set {
          entries.insert(key.clone(), value.clone());
        }
        FullElement::Map { entries }
      }
      (FullElement::List { items }, DiffElement::List { hunks, .. }) => FullElement::List {
        items: list_diff::apply(items, hunks)?,
      },
      _ => return Err(self.kind_mismatch(diff.kind())),
    };
    Ok(applied)
  }

  /// Combine two full elements of the same kind.
  ///
  /// Atoms are right-biased; sets take the union; maps merge recursively on
  /// shared keys; lists concatenate (list combine is not idempotent).
  pub fn combine(&self, other: &FullElement) -> Result<FullElement, ElementError> {
    let combined = match (self, other) {
      (FullElement::Atom { .. }, FullElement::Atom { value }) => FullElement::Atom { value: value.clone() },
      (FullElement::Set { items: ours }, FullElement::Set { items: theirs }) => FullElement::Set {
        items: ours.union(theirs).cloned().collect(),
      },
      (FullElement::Map { entries: ours }, FullElement::Map { entries: theirs }) => {
        let mut entries = ours.clone();
        for (key, value) in theirs {
          let merged = match entries.get(key) {
            Some(existing) => existing.combine(value)?,
            None => value.clone(),
          };
          entries.insert(key.clone(), merged);
        }
        FullElement::Map { entries }
      }
      (FullElement::List { items: ours }, FullElement::List { items: theirs }) => FullElement::List {
        items: ours.iter().chain(theirs).cloned().collect(),
      },
      _ => return Err(self.kind_mismatch(other.kind())),
    };
    Ok(combined)
  }

  /// Total order within a kind; comparing across kinds fails loudly.
  ///
  /// Atoms order lexicographically. Sets and maps order item-wise over
  /// their sorted contents, with absence ordering before presence. Lists
  /// order positionally.
  pub fn try_cmp(&self, other: &FullElement) -> Result<Ordering, ElementError> {
    match (self, other) {
      (FullElement::Atom { value: a }, FullElement::Atom { value: b }) => Ok(a.cmp(b)),
      (FullElement::Set { items: a }, FullElement::Set { items: b }) => Ok(a.cmp(b)),
      (FullElement::Map { entries: a }, FullElement::Map { entries: b }) => {
        for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
          match ka.cmp(kb) {
            Ordering::Equal => {}
            other => return Ok(other),
          }
          match va.try_cmp(vb)? {
            Ordering::Equal => {}
            other => return Ok(other),
          }
        }
        Ok(a.len().cmp(&b.len()))
      }
      (FullElement::List { items: a }, FullElement::List { items: b }) => Ok(a.cmp(b)),
      _ => Err(self.kind_mismatch(other.kind())),
    }
  }
}

impl DiffElement {
  pub fn kind(&self) -> Kind {
    match self {
      DiffElement::Atom { .. } => Kind::Atom,
      DiffElement::Set { .. } => Kind::Set,
      DiffElement::Map { .. } => Kind::Map,
      DiffElement::List { .. } => Kind::List,
    }
  }

  /// Check the invariants of any full replacement values carried inside.
  pub fn validate(&self) -> Result<(), ElementError> {
    if let DiffElement::Map { entries_to_set, .. } = self {
      for value in entries_to_set.values() {
        value.validate()?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn diff_apply_roundtrip(a: &FullElement, b: &FullElement) {
    let diff = a.diff(b).unwrap();
    let applied = a.apply(&diff).unwrap();
    assert_eq!(&applied, b, "apply(a, diff(a, b)) != b");
  }

  fn null_diff_identity(a: &FullElement) {
    let diff = a.diff(a).unwrap();
    assert_eq!(a.apply(&diff).unwrap(), *a);
  }

  #[test]
  fn atom_diff_apply() {
    let a = FullElement::atom("A");
    let b = FullElement::atom("B");
    diff_apply_roundtrip(&a, &b);
    null_diff_identity(&a);

    let diff = a.diff(&b).unwrap();
    assert_eq!(diff, DiffElement::Atom { value: "B".to_string() });
  }

  #[test]
  fn atom_combine_is_right_biased() {
    let a = FullElement::atom("A");
    let b = FullElement::atom("B");
    assert_eq!(a.combine(&b).unwrap(), b);
    assert_eq!(a.combine(&a).unwrap(), a);
  }

  #[test]
  fn set_diff_apply() {
    // Host {"git", "curl"} vs role {"git", "htop"}: add htop, remove curl.
    let host = FullElement::set(["git", "curl"]);
    let role = FullElement::set(["git", "htop"]);

    let diff = host.diff(&role).unwrap();
    assert_eq!(
      diff,
      DiffElement::Set {
        to_add: ["htop".to_string()].into(),
        to_remove: ["curl".to_string()].into(),
      }
    );
    assert_eq!(host.apply(&diff).unwrap(), role);
    null_diff_identity(&host);
  }

  #[test]
  fn set_apply_remove_wins_over_add() {
    let base = FullElement::set(["a"]);
    let diff = DiffElement::Set {
      to_add: ["b".to_string()].into(),
      to_remove: ["b".to_string()].into(),
    };
    assert_eq!(base.apply(&diff).unwrap(), FullElement::set(["a"]));
  }

  #[test]
  fn set_combine_is_union_and_idempotent() {
    let a = FullElement::set(["a", "both"]);
    let b = FullElement::set(["b", "both"]);
    assert_eq!(a.combine(&b).unwrap(), FullElement::set(["a", "b", "both"]));
    assert_eq!(a.combine(&a).unwrap(), a);
  }

  #[test]
  fn map_diff_apply() {
    // Host {a:1, b:2} vs role {b:2, c:3}: remove a, set c=3.
    let host = FullElement::map([
      ("a", FullElement::atom("1")),
      ("b", FullElement::atom("2")),
    ]);
    let role = FullElement::map([
      ("b", FullElement::atom("2")),
      ("c", FullElement::atom("3")),
    ]);

    let diff = host.diff(&role).unwrap();
    assert_eq!(
      diff,
      DiffElement::Map {
        keys_to_remove: ["a".to_string()].into(),
        entries_to_set: [("c".to_string(), FullElement::atom("3"))].into(),
      }
    );
    assert_eq!(host.apply(&diff).unwrap(), role);
    null_diff_identity(&host);
  }

  #[test]
  fn map_diff_changed_value_is_full_replacement() {
    let host = FullElement::map([("k", FullElement::set(["a", "b"]))]);
    let role = FullElement::map([("k", FullElement::set(["b", "c"]))]);

    let diff = host.diff(&role).unwrap();
    assert_eq!(
      diff,
      DiffElement::Map {
        keys_to_remove: BTreeSet::new(),
        entries_to_set: [("k".to_string(), FullElement::set(["b", "c"]))].into(),
      }
    );
    diff_apply_roundtrip(&host, &role);
  }

  #[test]
  fn map_combine_recurses_on_shared_keys() {
    let a = FullElement::map([
      ("a", FullElement::set(["a"])),
      ("both", FullElement::set(["both"])),
      ("changed", FullElement::set(["a", "both"])),
    ]);
    let b = FullElement::map([
      ("b", FullElement::set(["b"])),
      ("both", FullElement::set(["both"])),
      ("changed", FullElement::set(["b", "both"])),
    ]);

    let expected = FullElement::map([
      ("a", FullElement::set(["a"])),
      ("b", FullElement::set(["b"])),
      ("both", FullElement::set(["both"])),
      ("changed", FullElement::set(["a", "b", "both"])),
    ]);
    assert_eq!(a.combine(&b).unwrap(), expected);
    assert_eq!(a.combine(&a).unwrap(), a);
  }

  #[test]
  fn nested_map_diff_apply() {
    let a = FullElement::map([
      ("unchanged", FullElement::map([("unchanged", FullElement::atom("unchanged"))])),
      ("changed", FullElement::map([("changed", FullElement::atom("changed"))])),
      ("a", FullElement::map([("a", FullElement::atom("a"))])),
    ]);
    let b = FullElement::map([
      ("unchanged", FullElement::map([("unchanged", FullElement::atom("unchanged"))])),
      ("changed", FullElement::map([("changed", FullElement::atom("changedB"))])),
      ("b", FullElement::map([("b", FullElement::atom("b"))])),
    ]);
    diff_apply_roundtrip(&a, &b);
  }

  #[test]
  fn list_diff_apply() {
    let a = FullElement::list("a b removed d e f g h j k l m achanged o p".split(' '));
    let b = FullElement::list("a b d e f g h inserted j k l m bchanged o p".split(' '));
    diff_apply_roundtrip(&a, &b);
    null_diff_identity(&a);
  }

  #[test]
  fn list_combine_is_concatenation() {
    let a = FullElement::list(["a", "b"]);
    let b = FullElement::list(["b", "c"]);
    assert_eq!(a.combine(&b).unwrap(), FullElement::list(["a", "b", "b", "c"]));

    let zero = FullElement::zero(Kind::List);
    assert_eq!(zero.combine(&zero).unwrap(), zero);
  }

  #[test]
  fn cross_kind_operations_fail() {
    let atom = FullElement::atom("a");
    let set = FullElement::set(["a"]);

    assert_eq!(
      atom.diff(&set),
      Err(ElementError::KindMismatch {
        expected: Kind::Atom,
        found: Kind::Set,
      })
    );
    assert!(atom.combine(&set).is_err());
    assert!(atom.try_cmp(&set).is_err());

    let set_diff = DiffElement::Set {
      to_add: BTreeSet::new(),
      to_remove: BTreeSet::new(),
    };
    assert_eq!(
      atom.apply(&set_diff),
      Err(ElementError::KindMismatch {
        expected: Kind::Atom,
        found: Kind::Set,
      })
    );
  }

  #[test]
  fn combine_as_apply_of_zero_diff() {
    // combine(a, b) == apply(a, diff(zero, b)) for atoms and sets.
    for (a, b) in [
      (FullElement::atom("a"), FullElement::atom("b")),
      (FullElement::set(["a", "both"]), FullElement::set(["b", "both"])),
    ] {
      let zero = FullElement::zero(a.kind());
      let zero_diff = zero.diff(&b).unwrap();
      assert_eq!(a.combine(&b).unwrap(), a.apply(&zero_diff).unwrap());
    }
  }

  #[test]
  fn zero_values_are_empty() {
    assert_eq!(FullElement::zero(Kind::Atom), FullElement::atom(""));
    assert_eq!(FullElement::zero(Kind::Set), FullElement::set(Vec::<String>::new()));
    assert_eq!(FullElement::zero(Kind::List), FullElement::list(Vec::<String>::new()));
  }

  #[test]
  fn ordering_within_kinds() {
    let a = FullElement::atom("A");
    let b = FullElement::atom("B");
    assert_eq!(a.try_cmp(&b).unwrap(), Ordering::Less);

    // Absence sorts before presence.
    let short = FullElement::set(["a", "b"]);
    let long = FullElement::set(["b"]);
    assert_eq!(short.try_cmp(&long).unwrap(), Ordering::Less);

    assert_eq!(
      FullElement::list(["a", "b"])
        .try_cmp(&FullElement::list(["a", "b", "d"]))
        .unwrap(),
      Ordering::Less
    );
    assert_eq!(
      FullElement::list(["a", "b", "c"])
        .try_cmp(&FullElement::list(["a", "b", "d"]))
        .unwrap(),
      Ordering::Less
    );

    let map_a = FullElement::map([("k", FullElement::atom("1"))]);
    let map_b = FullElement::map([("k", FullElement::atom("2"))]);
    assert_eq!(map_a.try_cmp(&map_b).unwrap(), Ordering::Less);
  }

  #[test]
  fn mixed_map_values_fail_validation() {
    let mixed = FullElement::map([
      ("a", FullElement::atom("1")),
      ("b", FullElement::set(["x"])),
    ]);
    assert_eq!(
      mixed.validate(),
      Err(ElementError::KindMismatch {
        expected: Kind::Atom,
        found: Kind::Set,
      })
    );

    let uniform = FullElement::map([
      ("a", FullElement::set(["1"])),
      ("b", FullElement::set(["x"])),
    ]);
    assert!(uniform.validate().is_ok());
  }
}
