// src/options/mod.rs
use serde_json::{json, Map, Value};
use std::fmt;

use crate::error::BindingError;

pub mod terms;

pub use terms::{Term, Terms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    Integer,
    Number,
    String,
    Variables,
    Term,
    DoubleArray,
    IntegerArray,
    Table,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionKind::Boolean => "boolean",
            OptionKind::Integer => "integer",
            OptionKind::Number => "number",
            OptionKind::String => "string",
            OptionKind::Variables => "variables list",
            OptionKind::Term => "term",
            OptionKind::DoubleArray => "double array",
            OptionKind::IntegerArray => "integer array",
            OptionKind::Table => "options table",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Variables(Vec<String>),
    Term(Vec<String>),
    DoubleArray(Vec<f64>),
    IntegerArray(Vec<i64>),
    Table(OptionsTable),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Boolean(_) => OptionKind::Boolean,
            OptionValue::Integer(_) => OptionKind::Integer,
            OptionValue::Number(_) => OptionKind::Number,
            OptionValue::String(_) => OptionKind::String,
            OptionValue::Variables(_) => OptionKind::Variables,
            OptionValue::Term(_) => OptionKind::Term,
            OptionValue::DoubleArray(_) => OptionKind::DoubleArray,
            OptionValue::IntegerArray(_) => OptionKind::IntegerArray,
            OptionValue::Table(_) => OptionKind::Table,
        }
    }

    pub fn as_json(&self) -> Value {
        match self {
            OptionValue::Boolean(b) => json!(b),
            OptionValue::Integer(i) => json!(i),
            OptionValue::Number(n) => json!(n),
            OptionValue::String(s) => json!(s),
            OptionValue::Variables(v) | OptionValue::Term(v) => json!(v),
            OptionValue::DoubleArray(v) => json!(v),
            OptionValue::IntegerArray(v) => json!(v),
            OptionValue::Table(table) => table.as_json(),
        }
    }

    /// Reads `value` into a new option shaped like `self`.
    pub fn parse_like(&self, name: &str, value: &Value) -> Result<OptionValue, BindingError> {
        let invalid = |reason: &str| BindingError::InvalidJson {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match self {
            OptionValue::Boolean(_) => value
                .as_bool()
                .map(OptionValue::Boolean)
                .ok_or_else(|| invalid("expected a boolean")),
            OptionValue::Integer(_) => value
                .as_i64()
                .map(OptionValue::Integer)
                .ok_or_else(|| invalid("expected an integer")),
            OptionValue::Number(_) => value
                .as_f64()
                .map(OptionValue::Number)
                .ok_or_else(|| invalid("expected a number")),
            OptionValue::String(_) => value
                .as_str()
                .map(|s| OptionValue::String(s.to_string()))
                .ok_or_else(|| invalid("expected a string")),
            OptionValue::Variables(_) => {
                string_list(value).map(OptionValue::Variables).ok_or_else(|| invalid("expected a list of names"))
            }
            OptionValue::Term(_) => {
                string_list(value).map(OptionValue::Term).ok_or_else(|| invalid("expected a term"))
            }
            OptionValue::DoubleArray(_) => value
                .as_array()
                .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                .map(OptionValue::DoubleArray)
                .ok_or_else(|| invalid("expected an array of numbers")),
            OptionValue::IntegerArray(_) => value
                .as_array()
                .and_then(|items| items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>())
                .map(OptionValue::IntegerArray)
                .ok_or_else(|| invalid("expected an array of integers")),
            OptionValue::Table(table) => {
                let rows = value.as_array().ok_or_else(|| invalid("expected an array of rows"))?;
                let mut parsed = table.empty_like();
                for row in rows {
                    let mut options = table.template.clone();
                    let errors = options.load_json(row);
                    if let Some(err) = errors.into_iter().next() {
                        return Err(err);
                    }
                    parsed.rows.push(options);
                }
                Ok(OptionValue::Table(parsed))
            }
        }
    }
}

// Accepts a bare string as a one-element list.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) if s.is_empty() => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items.iter().map(|v| v.as_str().map(str::to_string)).collect(),
        _ => None,
    }
}

/// A list of option rows that all share one template shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsTable {
    pub template: Options,
    pub rows: Vec<Options>,
}

impl OptionsTable {
    pub fn new(template: Options) -> Self {
        Self {
            template,
            rows: Vec::new(),
        }
    }

    pub fn empty_like(&self) -> Self {
        Self::new(self.template.clone())
    }

    pub fn with_rows(template: Options, rows: Vec<Options>) -> Self {
        Self { template, rows }
    }

    pub fn as_json(&self) -> Value {
        Value::Array(self.rows.iter().map(Options::as_json).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionEvent {
    Changed(String),
    ComputedColumnRequested(String),
    ColumnRequested { name: String, column_type: i32 },
    ComputedColumnDestructionRequested(String),
}

/// Named, ordered option values. Writes through `set` record events that
/// the owner drains with `take_events`.
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
    events: Vec<OptionEvent>,
}

impl PartialEq for Options {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert that does not record a change.
    pub fn with(mut self, name: &str, value: OptionValue) -> Self {
        self.add(name, value);
        self
    }

    pub fn add(&mut self, name: &str, value: OptionValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Replaces or inserts `name`; records a change when the value differs.
    pub fn set(&mut self, name: &str, value: OptionValue) -> bool {
        if self.get(name) == Some(&value) {
            return false;
        }
        self.add(name, value);
        self.events.push(OptionEvent::Changed(name.to_string()));
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn request_computed_column(&mut self, name: &str) {
        self.events.push(OptionEvent::ComputedColumnRequested(name.to_string()));
    }

    pub fn request_column(&mut self, name: &str, column_type: i32) {
        self.events.push(OptionEvent::ColumnRequested {
            name: name.to_string(),
            column_type,
        });
    }

    pub fn request_computed_column_destruction(&mut self, name: &str) {
        self.events
            .push(OptionEvent::ComputedColumnDestructionRequested(name.to_string()));
    }

    pub fn take_events(&mut self) -> Vec<OptionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn as_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.as_json());
        }
        Value::Object(map)
    }

    /// Reads every option present in `json` using the current entries as
    /// the template. Options that do not parse keep their value and are
    /// reported.
    pub fn load_json(&mut self, json: &Value) -> Vec<BindingError> {
        let mut errors = Vec::new();
        let Some(object) = json.as_object() else {
            errors.push(BindingError::InvalidJson {
                name: String::new(),
                reason: "expected an object".to_string(),
            });
            return errors;
        };

        for (name, value) in self.entries.iter_mut() {
            if let Some(json_value) = object.get(name.as_str()) {
                match value.parse_like(name, json_value) {
                    Ok(parsed) => *value = parsed,
                    Err(e) => errors.push(e),
                }
            }
        }
        errors
    }

    fn lookup(&self, name: &str) -> Result<&OptionValue, BindingError> {
        self.get(name)
            .ok_or_else(|| BindingError::Missing(name.to_string()))
    }

    pub fn string(&self, name: &str) -> Result<&str, BindingError> {
        match self.lookup(name)? {
            OptionValue::String(s) => Ok(s),
            other => Err(mismatch(name, OptionKind::String, other)),
        }
    }

    pub fn variables(&self, name: &str) -> Result<&[String], BindingError> {
        match self.lookup(name)? {
            OptionValue::Variables(v) => Ok(v),
            other => Err(mismatch(name, OptionKind::Variables, other)),
        }
    }

    pub fn term(&self, name: &str) -> Result<&[String], BindingError> {
        match self.lookup(name)? {
            OptionValue::Term(v) => Ok(v),
            other => Err(mismatch(name, OptionKind::Term, other)),
        }
    }

    pub fn double_array(&self, name: &str) -> Result<&[f64], BindingError> {
        match self.lookup(name)? {
            OptionValue::DoubleArray(v) => Ok(v),
            other => Err(mismatch(name, OptionKind::DoubleArray, other)),
        }
    }

    pub fn integer_array(&self, name: &str) -> Result<&[i64], BindingError> {
        match self.lookup(name)? {
            OptionValue::IntegerArray(v) => Ok(v),
            other => Err(mismatch(name, OptionKind::IntegerArray, other)),
        }
    }

    pub fn table(&self, name: &str) -> Result<&OptionsTable, BindingError> {
        match self.lookup(name)? {
            OptionValue::Table(t) => Ok(t),
            other => Err(mismatch(name, OptionKind::Table, other)),
        }
    }
}

fn mismatch(name: &str, expected: OptionKind, found: &OptionValue) -> BindingError {
    BindingError::KindMismatch {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Options {
        Options::new()
            .with("title", OptionValue::String("t".into()))
            .with("vars", OptionValue::Variables(vec!["a".into()]))
            .with("weights", OptionValue::DoubleArray(vec![1.0, 2.0]))
    }

    #[test]
    fn set_records_change_only_when_value_differs() {
        let mut options = sample();
        assert!(!options.set("title", OptionValue::String("t".into())));
        assert!(options.take_events().is_empty());

        assert!(options.set("title", OptionValue::String("u".into())));
        assert_eq!(options.take_events(), vec![OptionEvent::Changed("title".into())]);
    }

    #[test]
    fn typed_access_reports_kind_mismatch() {
        let options = sample();
        assert_eq!(options.string("title"), Ok("t"));
        assert_eq!(
            options.table("vars"),
            Err(BindingError::KindMismatch {
                name: "vars".into(),
                expected: OptionKind::Table,
                found: OptionKind::Variables,
            })
        );
        assert_eq!(options.string("nope"), Err(BindingError::Missing("nope".into())));
    }

    #[test]
    fn load_json_keeps_bad_values_and_reports_them() {
        let mut options = sample();
        let errors = options.load_json(&json!({
            "title": "loaded",
            "vars": ["x", "y"],
            "weights": "not an array"
        }));

        assert_eq!(errors.len(), 1);
        assert_eq!(options.string("title"), Ok("loaded"));
        assert_eq!(options.variables("vars").unwrap(), &["x".to_string(), "y".to_string()]);
        assert_eq!(options.double_array("weights").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn table_rows_parse_against_template() {
        let template = Options::new()
            .with("name", OptionValue::String(String::new()))
            .with("values", OptionValue::Term(Vec::new()));
        let table = OptionValue::Table(OptionsTable::new(template));

        let parsed = table
            .parse_like("t", &json!([{ "name": "a", "values": ["1", "2"] }]))
            .unwrap();

        match parsed {
            OptionValue::Table(t) => {
                assert_eq!(t.rows.len(), 1);
                assert_eq!(t.rows[0].string("name"), Ok("a"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
