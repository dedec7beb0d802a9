// src/models/column_name.rs
use crate::data::ColumnType;
use crate::error::BindingError;
use crate::options::{OptionKind, OptionValue};

/// What applying a column name asks of the data set.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRequest {
    CreateComputed(String),
    DestroyComputed(String),
    Create { name: String, column_type: i32 },
}

/// A field naming a column the analysis writes into the data set. Computed
/// columns belong to the analysis: renaming one releases the old column.
#[derive(Debug)]
pub struct BoundColumnName {
    name: String,
    computed: bool,
    column_type: ColumnType,
    text: String,
    applied: String,
    bound: bool,
    pending_value: Option<String>,
    requests: Vec<ColumnRequest>,
}

impl BoundColumnName {
    pub fn new(name: &str, computed: bool, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            computed,
            column_type,
            text: String::new(),
            applied: String::new(),
            bound: false,
            pending_value: None,
            requests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn applied(&self) -> &str {
        &self.applied
    }

    pub fn create_option(&self) -> OptionValue {
        OptionValue::String(String::new())
    }

    /// A restored computed column is claimed again so that removing the
    /// analysis still releases it.
    pub fn bind_to(&mut self, option: &OptionValue) -> Result<(), BindingError> {
        let OptionValue::String(text) = option else {
            return Err(BindingError::KindMismatch {
                name: self.name.clone(),
                expected: OptionKind::String,
                found: option.kind(),
            });
        };

        self.text = text.clone();
        self.applied = text.clone();
        self.bound = true;
        if self.computed && !text.is_empty() {
            self.requests.push(ColumnRequest::CreateComputed(text.clone()));
        }
        Ok(())
    }

    pub fn apply(&mut self) {
        let new_name = self.text.trim().to_string();
        self.text = new_name.clone();
        if !self.bound || new_name == self.applied {
            return;
        }

        if self.computed {
            if !self.applied.is_empty() {
                self.requests
                    .push(ColumnRequest::DestroyComputed(self.applied.clone()));
            }
            if !new_name.is_empty() {
                self.requests.push(ColumnRequest::CreateComputed(new_name.clone()));
            }
        } else if !new_name.is_empty() {
            self.requests.push(ColumnRequest::Create {
                name: new_name.clone(),
                column_type: self.column_type.code(),
            });
        }

        self.applied = new_name.clone();
        self.pending_value = Some(new_name);
    }

    pub fn take_pending_value(&mut self) -> Option<String> {
        self.pending_value.take()
    }

    pub fn take_requests(&mut self) -> Vec<ColumnRequest> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(computed: bool) -> BoundColumnName {
        let mut field = BoundColumnName::new("scores", computed, ColumnType::Scale);
        field.bind_to(&OptionValue::String(String::new())).unwrap();
        field
    }

    #[test]
    fn renaming_a_computed_column_releases_the_old_one() {
        let mut field = bound(true);

        *field.text_mut() = " fitted ".to_string();
        field.apply();
        assert_eq!(field.take_requests(), vec![ColumnRequest::CreateComputed("fitted".into())]);
        assert_eq!(field.take_pending_value().as_deref(), Some("fitted"));

        *field.text_mut() = "residuals".to_string();
        field.apply();
        assert_eq!(
            field.take_requests(),
            vec![
                ColumnRequest::DestroyComputed("fitted".into()),
                ColumnRequest::CreateComputed("residuals".into()),
            ]
        );

        *field.text_mut() = String::new();
        field.apply();
        assert_eq!(field.take_requests(), vec![ColumnRequest::DestroyComputed("residuals".into())]);
        assert_eq!(field.applied(), "");
    }

    #[test]
    fn plain_columns_carry_their_type_and_are_never_released() {
        let mut field = bound(false);

        *field.text_mut() = "entered".to_string();
        field.apply();
        *field.text_mut() = "other".to_string();
        field.apply();

        assert_eq!(
            field.take_requests(),
            vec![
                ColumnRequest::Create { name: "entered".into(), column_type: 8 },
                ColumnRequest::Create { name: "other".into(), column_type: 8 },
            ]
        );
    }

    #[test]
    fn unchanged_name_requests_nothing() {
        let mut field = bound(true);
        field.apply();
        assert!(field.take_requests().is_empty());
        assert_eq!(field.take_pending_value(), None);
    }

    #[test]
    fn restored_computed_column_is_claimed_on_bind() {
        let mut field = BoundColumnName::new("scores", true, ColumnType::Scale);
        field.bind_to(&OptionValue::String("fitted".into())).unwrap();
        assert_eq!(field.take_requests(), vec![ColumnRequest::CreateComputed("fitted".into())]);

        assert!(field.bind_to(&OptionValue::Number(1.0)).is_err());
    }
}
