//! Rendering a diff system into an ordered command stream.
//!
//! Creations and updates are emitted in topological order (dependencies
//! first); removals follow in reverse topological order (dependents first).
//! Ties within a layer break on the total order of component keys, so the
//! stream is deterministic.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::component::{Component, ComponentKey, StateMode};
use crate::error::Error;
use crate::provider::ProviderRegistry;
use crate::system::{System, SystemError};

/// The affected keys of a diff system, ordered for rendering: additions and
/// updates dependency-first, then removals dependent-first.
pub fn render_order(diff: &System) -> Result<Vec<ComponentKey>, SystemError> {
  let mut graph: DiGraph<ComponentKey, ()> = DiGraph::new();
  let mut nodes: HashMap<ComponentKey, NodeIndex> = HashMap::new();

  for key in diff.keys() {
    let idx = graph.add_node(key.clone());
    nodes.insert(key.clone(), idx);
  }

  // Edge from dependency to dependent; edges to components outside the
  // diff are irrelevant to ordering and dropped.
  for component in diff.components() {
    let dependent = nodes[&component.key()];
    for dependency in &component.dependencies {
      if let Some(&dep_idx) = nodes.get(dependency) {
        graph.add_edge(dep_idx, dependent, ());
      }
    }
  }

  // Kahn's algorithm with a sorted ready set for deterministic tie-breaks.
  let mut in_degree: HashMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
    .collect();
  let mut ready: BTreeSet<ComponentKey> = in_degree
    .iter()
    .filter(|(_, degree)| **degree == 0)
    .map(|(idx, _)| graph[*idx].clone())
    .collect();

  let mut topological = Vec::with_capacity(diff.len());
  while let Some(key) = ready.pop_first() {
    let idx = nodes[&key];
    topological.push(key);
    for neighbor in graph.neighbors_directed(idx, Direction::Outgoing) {
      if let Some(degree) = in_degree.get_mut(&neighbor) {
        *degree -= 1;
        if *degree == 0 {
          ready.insert(graph[neighbor].clone());
        }
      }
    }
  }
  if topological.len() != diff.len() {
    return Err(SystemError::DependencyCycle);
  }

  let mode = |key: &ComponentKey| diff.get(key).map(Component::mode);
  let additions = topological.iter().filter(|key| mode(key) != Some(StateMode::Absent));
  let removals = topological.iter().rev().filter(|key| mode(key) == Some(StateMode::Absent));
  Ok(additions.chain(removals).cloned().collect())
}

/// Render a diff system into shell command lines, honoring dependency
/// order. `host` supplies the pre-change components that give renderers the
/// context to tear down ABSENT components.
pub fn render_system(registry: &ProviderRegistry, diff: &System, host: Option<&System>) -> Result<Vec<String>, Error> {
  let order = render_order(diff)?;
  let mut commands = Vec::new();
  for key in &order {
    let Some(component) = diff.get(key) else { continue };
    let host_component = host.and_then(|system| system.get(key));
    debug!(key = %key, mode = %component.mode(), "rendering component");
    commands.extend(registry.render(component, host_component)?);
  }
  Ok(commands)
}
