// src/options/terms.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single variable or an interaction of variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    components: Vec<String>,
}

impl Term {
    pub fn new(components: Vec<String>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains_component(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }

    /// Concatenates the components of both terms into an interaction.
    pub fn combined_with(&self, other: &Term) -> Term {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Term::new(components)
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::new(vec![name.to_string()])
    }
}

impl From<String> for Term {
    fn from(name: String) -> Self {
        Term::new(vec![name])
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join(" * "))
    }
}

/// Ordered set of terms. Insertion order is kept and duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    terms: Vec<Term>,
}

impl Terms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms = Terms::new();
        for name in names {
            terms.add(Term::from(name.into()));
        }
        terms
    }

    /// Returns false when the term was already present.
    pub fn add(&mut self, term: Term) -> bool {
        if self.contains(&term) {
            return false;
        }
        self.terms.push(term);
        true
    }

    /// Union keeping first-seen order.
    pub fn add_all(&mut self, other: &Terms) {
        for term in other.iter() {
            self.add(term.clone());
        }
    }

    pub fn set(&mut self, other: &Terms) {
        self.terms = other.terms.clone();
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn remove(&mut self, term: &Term) -> bool {
        let before = self.terms.len();
        self.terms.retain(|t| t != term);
        before != self.terms.len()
    }

    /// Set difference by structural equality.
    pub fn discard(&mut self, other: &Terms) {
        self.terms.retain(|t| !other.contains(t));
    }

    /// Drops every term that uses a component of any term in `other`.
    pub fn discard_containing_components(&mut self, other: &Terms) {
        self.terms.retain(|t| {
            !other
                .iter()
                .flat_map(|o| o.components().iter())
                .any(|c| t.contains_component(c))
        });
    }

    pub fn contains(&self, term: &Term) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    pub fn at(&self, index: usize) -> Option<&Term> {
        self.terms.get(index)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    /// Display strings, one per term.
    pub fn as_strings(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.to_string()).collect()
    }

    pub fn sort_by_display(&mut self, descending: bool) {
        self.terms.sort_by_key(|t| t.to_string().to_lowercase());
        if descending {
            self.terms.reverse();
        }
    }

    /// Terms in `self` that are not in `previous`.
    pub fn added_since(&self, previous: &Terms) -> Terms {
        let mut added = Terms::new();
        for term in self.iter().filter(|t| !previous.contains(t)) {
            added.add(term.clone());
        }
        added
    }
}

impl<'a> IntoIterator for &'a Terms {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl FromIterator<Term> for Terms {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        let mut terms = Terms::new();
        for term in iter {
            terms.add(term);
        }
        terms
    }
}
