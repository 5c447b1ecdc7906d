//! The on-disk state document.
//!
//! A state file holds one self-describing JSON document: a version tag, a
//! partial/full flag, and the components in canonical key order. All
//! collections inside are sorted, so serializing a given system always
//! produces the same bytes, and `parse(serialize(v)) == v`.
//!
//! The `partial` flag is derived from the components when writing and not
//! trusted when reading; the mode of a system is always a derived property.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{Component, ComponentKey};
use crate::element::ElementError;
use crate::system::{System, SystemError};

/// Version tag of the state document format.
pub const STATE_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct StateDoc {
  version: u32,
  partial: bool,
  components: Vec<Component>,
}

/// Errors from reading and writing state documents.
#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    source: io::Error,
  },

  #[error("malformed state document: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("unsupported state version {0} (expected {STATE_VERSION})")]
  UnsupportedVersion(u32),

  /// The document's components do not form a system (duplicate keys).
  #[error("invalid state document: {0}")]
  Invalid(#[source] SystemError),

  #[error("component {key}: {source}")]
  Element {
    key: ComponentKey,
    source: ElementError,
  },

  #[error("failed to write state: {0}")]
  Write(#[source] io::Error),
}

/// Parse a state document from text.
pub fn parse_document(text: &str) -> Result<System, StateError> {
  let doc: StateDoc = serde_json::from_str(text)?;
  if doc.version != STATE_VERSION {
    return Err(StateError::UnsupportedVersion(doc.version));
  }

  for component in &doc.components {
    let key = component.key();
    let check = |result: Result<(), ElementError>| {
      result.map_err(|source| StateError::Element { key: key.clone(), source })
    };
    if let Some(elements) = component.full_elements() {
      for element in elements.values() {
        check(element.validate())?;
      }
    }
    if let Some(elements) = component.diff_elements() {
      for element in elements.values() {
        check(element.validate())?;
      }
    }
  }

  System::from_components(doc.components).map_err(StateError::Invalid)
}

/// Serialize a system to its canonical document text.
pub fn to_document_string(system: &System) -> Result<String, StateError> {
  let doc = StateDoc {
    version: STATE_VERSION,
    partial: !system.is_full(),
    components: system.components().cloned().collect(),
  };
  let mut text = serde_json::to_string_pretty(&doc)?;
  text.push('\n');
  Ok(text)
}

/// Read a state document from a reader.
pub fn read_system(mut reader: impl io::Read) -> Result<System, StateError> {
  let mut text = String::new();
  reader.read_to_string(&mut text).map_err(|source| StateError::Read {
    path: PathBuf::from("<stream>"),
    source,
  })?;
  parse_document(&text)
}

/// Write a state document to a writer.
pub fn write_system(mut writer: impl io::Write, system: &System) -> Result<(), StateError> {
  let text = to_document_string(system)?;
  writer.write_all(text.as_bytes()).map_err(StateError::Write)
}

/// Load a state document from a file.
pub fn load_system(path: &Path) -> Result<System, StateError> {
  let text = fs::read_to_string(path).map_err(|source| StateError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_document(&text)
}
