// src/models/terms_available.rs
use super::list_model::{ListModel, SourceProvider, SourceSpec, TermsChange};
use crate::options::{Term, Terms};
use crate::signal::Signal;

pub type TermPredicate = Box<dyn Fn(&Term) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortType {
    #[default]
    None,
    Ascending,
    Descending,
}

/// The pool of terms a user can pick from, fed by its source models.
pub struct TermsAvailableModel {
    pub list: ListModel,
    all_terms: Terms,
    mixed_model_terms: bool,
    sort_type: SortType,
    allowed: Option<TermPredicate>,
    suggested: Option<TermPredicate>,
    last_change: TermsChange,
    pub all_available_terms_changed: Signal<TermsChange>,
}

impl TermsAvailableModel {
    pub fn new(name: &str, sources: Vec<SourceSpec>, mixed_model_terms: bool) -> Self {
        Self {
            list: ListModel::new(name, sources),
            all_terms: Terms::new(),
            mixed_model_terms,
            sort_type: SortType::None,
            allowed: None,
            suggested: None,
            last_change: TermsChange::default(),
            all_available_terms_changed: Signal::new(),
        }
    }

    pub fn set_allowed(&mut self, predicate: TermPredicate) {
        self.allowed = Some(predicate);
    }

    pub fn set_suggested(&mut self, predicate: TermPredicate) {
        self.suggested = Some(predicate);
    }

    pub fn is_allowed(&self, term: &Term) -> bool {
        self.allowed.as_ref().map_or(true, |allowed| allowed(term))
    }

    pub fn is_suggested(&self, term: &Term) -> bool {
        self.suggested.as_ref().map_or(false, |suggested| suggested(term))
    }

    pub fn all_terms(&self) -> &Terms {
        &self.all_terms
    }

    pub fn last_change(&self) -> &TermsChange {
        &self.last_change
    }

    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    pub fn sort_items(&mut self, sort_type: SortType) {
        self.sort_type = sort_type;

        match sort_type {
            SortType::None => {
                let mut suggested = Terms::new();
                let mut allowed = Terms::new();
                let mut forbidden = Terms::new();

                for term in self.all_terms.iter() {
                    if !self.is_allowed(term) {
                        forbidden.add(term.clone());
                    } else if self.is_suggested(term) {
                        suggested.add(term.clone());
                    } else {
                        allowed.add(term.clone());
                    }
                }

                self.all_terms.clear();
                self.all_terms.add_all(&suggested);
                self.all_terms.add_all(&allowed);
                self.all_terms.add_all(&forbidden);
            }
            SortType::Ascending => self.all_terms.sort_by_display(false),
            SortType::Descending => self.all_terms.sort_by_display(true),
        }

        self.list.init_terms(&self.all_terms);
    }

    fn mixed_terms(&self, provider: &dyn SourceProvider) -> Option<Terms> {
        let per_model = self.list.get_source_terms_per_model(provider);
        if per_model.len() < 2 {
            return None;
        }

        let mut mixed = per_model[0].1.clone();
        for (_, to_combine) in per_model.iter().skip(1) {
            let mut extra = Terms::new();
            for mixed_term in mixed.iter() {
                for term in to_combine.iter() {
                    extra.add(mixed_term.combined_with(term));
                }
            }
            mixed.add_all(&extra);
        }
        Some(mixed)
    }

    pub fn reset_terms_from_source_models(&mut self, provider: &dyn SourceProvider, update_assigned: bool) {
        let mut available = self.list.get_source_terms(provider);

        if self.mixed_model_terms {
            if let Some(mixed) = self.mixed_terms(provider) {
                available.add_all(&mixed);
            }
        }

        self.last_change = TermsChange {
            added: available.added_since(&self.all_terms),
            removed: self.all_terms.added_since(&available),
        };
        self.all_terms = available;
        self.sort_items(self.sort_type);

        if update_assigned {
            let change = self.last_change.clone();
            self.all_available_terms_changed.emit(&change);
        }
    }

    /// The last source (in declaration order) that provides `term`.
    pub fn source_model_of_term(&self, term: &Term, provider: &dyn SourceProvider) -> Option<String> {
        self.list
            .get_source_terms_per_model(provider)
            .into_iter()
            .filter(|(_, terms)| terms.contains(term))
            .map(|(model, _)| model)
            .last()
    }
}
