// src/models/list_model.rs
use serde::{Deserialize, Serialize};

use crate::options::Terms;
use crate::signal::Signal;

/// One declared source of terms: a model name, an optional "use" selector
/// (e.g. a column of a table), and models whose terms are removed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub model: String,
    #[serde(default)]
    pub model_use: String,
    #[serde(default)]
    pub discard: Vec<SourceSpec>,
}

impl SourceSpec {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            model_use: String::new(),
            discard: Vec::new(),
        }
    }

    pub fn discarding(mut self, discard: SourceSpec) -> Self {
        self.discard.push(discard);
        self
    }
}

/// Resolves a model name to its current terms. Implemented by the form,
/// which owns every model.
pub trait SourceProvider {
    fn source_terms(&self, model: &str, model_use: &str) -> Option<Terms>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsChange {
    pub added: Terms,
    pub removed: Terms,
}

impl TermsChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// State shared by every list model: its terms, its declared sources and
/// its error channel.
#[derive(Debug)]
pub struct ListModel {
    name: String,
    sources: Vec<SourceSpec>,
    terms: Terms,
    errors: Vec<String>,
    pub model_changed: Signal<TermsChange>,
}

impl ListModel {
    pub fn new(name: &str, sources: Vec<SourceSpec>) -> Self {
        Self {
            name: name.to_string(),
            sources,
            terms: Terms::new(),
            errors: Vec::new(),
            model_changed: Signal::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn terms(&self) -> &Terms {
        &self.terms
    }

    pub fn init_terms(&mut self, terms: &Terms) {
        self.terms.set(terms);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!("{}: {}", self.name, error);
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    fn terms_of_source(source: &SourceSpec, provider: &dyn SourceProvider) -> Option<Terms> {
        let mut terms = provider.source_terms(&source.model, &source.model_use)?;
        for discard in &source.discard {
            if let Some(discarded) = provider.source_terms(&discard.model, &discard.model_use) {
                terms.discard(&discarded);
            }
        }
        Some(terms)
    }

    /// Union over every source, each minus its discard models.
    pub fn get_source_terms(&self, provider: &dyn SourceProvider) -> Terms {
        let mut available = Terms::new();
        for source in &self.sources {
            if let Some(terms) = Self::terms_of_source(source, provider) {
                available.add_all(&terms);
            }
        }
        available
    }

    /// Same as `get_source_terms` but keyed by source model, in declaration order.
    pub fn get_source_terms_per_model(&self, provider: &dyn SourceProvider) -> Vec<(String, Terms)> {
        self.sources
            .iter()
            .filter_map(|source| {
                Self::terms_of_source(source, provider).map(|terms| (source.model.clone(), terms))
            })
            .collect()
    }

    pub fn source_terms_changed(&mut self, provider: &dyn SourceProvider) -> TermsChange {
        let new_terms = self.get_source_terms(provider);
        let change = TermsChange {
            added: new_terms.added_since(&self.terms),
            removed: self.terms.added_since(&new_terms),
        };
        self.init_terms(&new_terms);
        self.model_changed.emit(&change);
        change
    }
}
