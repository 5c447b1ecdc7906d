//! The provider registry: id-keyed lookup and dispatch.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::component::Component;
use crate::provider::{Provider, ProviderError};
use crate::system::System;

/// One unit of gather work: a provider and the qualifier to gather.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GatherRequest {
  pub provider: String,
  pub qualifier: Vec<String>,
}

impl GatherRequest {
  pub fn new(provider: impl Into<String>, qualifier: Vec<String>) -> Self {
    Self {
      provider: provider.into(),
      qualifier,
    }
  }
}

/// The result of a gather-all run: the combined host state, plus the
/// requests that failed and were left out of it.
#[derive(Debug)]
pub struct GatherOutcome {
  pub system: System,
  pub skipped: Vec<(GatherRequest, ProviderError)>,
}

impl GatherOutcome {
  pub fn is_complete(&self) -> bool {
    self.skipped.is_empty()
  }
}

/// Maps provider ids to provider implementations.
#[derive(Default)]
pub struct ProviderRegistry {
  providers: BTreeMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding the built-in providers.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register(Box::new(super::homebrew::HomebrewProvider::new()));
    registry
  }

  /// Register a provider under its id. A later registration for the same
  /// id replaces the earlier one.
  pub fn register(&mut self, provider: Box<dyn Provider>) {
    self.providers.insert(provider.id().to_string(), provider);
  }

  pub fn get(&self, id: &str) -> Result<&dyn Provider, ProviderError> {
    self
      .providers
      .get(id)
      .map(|provider| provider.as_ref())
      .ok_or_else(|| ProviderError::Unknown(id.to_string()))
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.providers.keys().map(String::as_str)
  }

  /// Check a component against its provider's declared schema.
  pub fn validate_component(&self, component: &Component) -> Result<(), ProviderError> {
    self.get(&component.provider)?.schema().validate(component)
  }

  /// Gather one provider, validating everything it emits.
  pub fn gather(&self, id: &str, qualifier: Option<&[String]>) -> Result<Vec<Component>, ProviderError> {
    let provider = self.get(id)?;
    debug!(provider = id, ?qualifier, "gathering");
    let components = provider.gather(qualifier)?;
    for component in &components {
      if component.provider != id {
        return Err(ProviderError::GatherFailed {
          provider: id.to_string(),
          message: format!("emitted component for foreign provider {}", component.provider),
        });
      }
      provider.schema().validate(component)?;
    }
    Ok(components)
  }

  /// Render one component via its provider.
  pub fn render(&self, diff: &Component, host: Option<&Component>) -> Result<Vec<String>, ProviderError> {
    self.get(&diff.provider)?.render(diff, host)
  }

  /// Gather every request and fold the results into one host state.
  ///
  /// Requests are sorted and deduplicated first, so the combine order is
  /// canonical (provider id, then qualifier) and the result deterministic
  /// regardless of input order. A failing provider is recorded in
  /// `skipped` without aborting the others.
  pub fn gather_all(&self, requests: &[GatherRequest]) -> GatherOutcome {
    let mut ordered: Vec<&GatherRequest> = requests.iter().collect();
    ordered.sort();
    ordered.dedup();

    let mut system = System::new();
    let mut skipped = Vec::new();
    for request in ordered {
      let qualifier = if request.qualifier.is_empty() {
        None
      } else {
        Some(request.qualifier.as_slice())
      };
      let gathered = self
        .gather(&request.provider, qualifier)
        .and_then(|components| {
          System::from_components(components).map_err(|err| ProviderError::GatherFailed {
            provider: request.provider.clone(),
            message: err.to_string(),
          })
        })
        .and_then(|partial| {
          system.combine(&partial).map_err(|err| ProviderError::GatherFailed {
            provider: request.provider.clone(),
            message: err.to_string(),
          })
        });
      match gathered {
        Ok(combined) => system = combined,
        Err(err) => {
          warn!(provider = %request.provider, error = %err, "provider skipped during gather-all");
          skipped.push((request.clone(), err));
        }
      }
    }

    GatherOutcome { system, skipped }
  }
}
