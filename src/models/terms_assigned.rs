// src/models/terms_assigned.rs
use super::list_model::{ListModel, SourceSpec, TermsChange};
use crate::error::BindingError;
use crate::options::{OptionKind, OptionValue, Term, Terms};

/// Terms the user moved out of an available pool. Bound to a variables
/// list option.
#[derive(Debug)]
pub struct TermsAssignedModel {
    pub list: ListModel,
    single_variable: bool,
}

impl TermsAssignedModel {
    pub fn new(name: &str, available_model: &str, single_variable: bool) -> Self {
        Self {
            list: ListModel::new(name, vec![SourceSpec::new(available_model)]),
            single_variable,
        }
    }

    pub fn single_variable(&self) -> bool {
        self.single_variable
    }

    pub fn available_model(&self) -> &str {
        self.list.sources().first().map_or("", |s| s.model.as_str())
    }

    fn replace(&mut self, terms: Terms) -> TermsChange {
        let change = TermsChange {
            added: terms.added_since(self.list.terms()),
            removed: self.list.terms().added_since(&terms),
        };
        self.list.init_terms(&terms);
        if !change.added.is_empty() || !change.removed.is_empty() {
            self.list.model_changed.emit(&change);
        }
        change
    }

    /// Returns the resulting change; empty when nothing moved.
    pub fn assign(&mut self, term: Term) -> TermsChange {
        let mut terms = if self.single_variable {
            Terms::new()
        } else {
            self.list.terms().clone()
        };
        terms.add(term);
        self.replace(terms)
    }

    pub fn unassign(&mut self, term: &Term) -> TermsChange {
        let mut terms = self.list.terms().clone();
        terms.remove(term);
        self.replace(terms)
    }

    /// Drops assigned terms that vanished from the available pool.
    pub fn available_terms_changed(&mut self, change: &TermsChange) -> TermsChange {
        let mut terms = self.list.terms().clone();
        terms.discard(&change.removed);
        self.replace(terms)
    }

    pub fn create_option(&self) -> OptionValue {
        OptionValue::Variables(Vec::new())
    }

    pub fn bind_to(&mut self, option: &OptionValue) -> Result<(), BindingError> {
        match option {
            OptionValue::Variables(names) => {
                let terms = Terms::from_names(names.iter().cloned());
                self.list.init_terms(&terms);
                Ok(())
            }
            other => Err(BindingError::KindMismatch {
                name: self.list.name().to_string(),
                expected: OptionKind::Variables,
                found: other.kind(),
            }),
        }
    }

    pub fn option_value(&self) -> OptionValue {
        OptionValue::Variables(self.list.terms().as_strings())
    }
}
