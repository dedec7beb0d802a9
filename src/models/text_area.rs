// src/models/text_area.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::whitelist::script_is_safe;
use crate::error::BindingError;
use crate::options::{OptionKind, OptionValue, Terms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    #[default]
    Default,
    Lavaan,
    Model,
    #[serde(rename = "Rcode")]
    Rcode,
}

impl TextType {
    pub fn is_code(&self) -> bool {
        !matches!(self, TextType::Default)
    }
}

#[cfg(target_os = "macos")]
const APPLY_SCRIPT_INFO: &str = "\u{2318} + Enter to apply";
#[cfg(not(target_os = "macos"))]
const APPLY_SCRIPT_INFO: &str = "Ctrl + Enter to apply";

fn escape_for_r(text: &str) -> String {
    text.replace('\'', "\\u0027")
        .replace('"', "\\u0022")
        .replace('\\', "\\\\")
}

/// The backend call that validates a lavaan model against the data set's
/// column names.
pub fn lavaan_check_script(text: &str, column_names: &Terms) -> String {
    let columns = column_names
        .iter()
        .map(|term| format!("'{}'", escape_for_r(&term.to_string())))
        .collect::<Vec<_>>()
        .join(",");

    format!("checkLavaanModel('{}', c({}))", escape_for_r(text), columns)
}

/// A free-text field bound to a string option. Code fields are validated
/// before their text reaches the option.
#[derive(Debug)]
pub struct BoundTextArea {
    name: String,
    text_type: TextType,
    text: String,
    bound: bool,
    has_script_error: bool,
    info_text: String,
    pending_value: Option<String>,
    script_requests: Vec<String>,
}

impl BoundTextArea {
    pub fn new(name: &str, text_type: TextType) -> Self {
        Self {
            name: name.to_string(),
            text_type,
            text: String::new(),
            bound: false,
            has_script_error: false,
            info_text: String::new(),
            pending_value: None,
            script_requests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text_type(&self) -> TextType {
        self.text_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text being edited; nothing reaches the option until `check_syntax`.
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn apply_script_info(&self) -> Option<&'static str> {
        self.text_type.is_code().then_some(APPLY_SCRIPT_INFO)
    }

    pub fn has_script_error(&self) -> bool {
        self.has_script_error
    }

    pub fn info_text(&self) -> &str {
        &self.info_text
    }

    pub fn create_option(&self) -> OptionValue {
        OptionValue::String(self.text.clone())
    }

    pub fn is_json_valid(value: &Value) -> bool {
        value.is_string()
    }

    pub fn bind_to(&mut self, option: &OptionValue) -> Result<(), BindingError> {
        match option {
            OptionValue::String(text) => {
                self.text = text.clone();
                self.bound = true;
                Ok(())
            }
            other => Err(BindingError::KindMismatch {
                name: self.name.clone(),
                expected: OptionKind::String,
                found: other.kind(),
            }),
        }
    }

    fn apply(&mut self) {
        if self.bound {
            self.pending_value = Some(self.text.clone());
        }
    }

    /// Validates and applies the current text. Lavaan models are checked by
    /// the backend and applied in `r_script_done_handler`.
    pub fn check_syntax(&mut self, all_variables: &Terms) {
        match self.text_type {
            TextType::Lavaan => {
                let script = lavaan_check_script(&self.text, all_variables);
                self.script_requests.push(script);
            }
            TextType::Rcode => match script_is_safe(&self.text) {
                Ok(()) => {
                    self.has_script_error = false;
                    self.info_text = "valid R code".to_string();
                    self.apply();
                }
                Err(e) => {
                    self.has_script_error = true;
                    self.info_text = e.to_string();
                }
            },
            TextType::Default | TextType::Model => self.apply(),
        }
    }

    pub fn r_script_done_handler(&mut self, result: &str) {
        if result.is_empty() {
            self.has_script_error = false;
            self.info_text = "Model applied".to_string();
            self.apply();
        } else {
            self.has_script_error = true;
            self.info_text = result.to_string();
        }
    }

    /// Lavaan models depend on the column names, so a new data set
    /// invalidates the analysis.
    pub fn refreshes_on_dataset_change(&self) -> bool {
        self.text_type == TextType::Lavaan
    }

    pub fn take_pending_value(&mut self) -> Option<String> {
        self.pending_value.take()
    }

    pub fn take_script_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.script_requests)
    }
}
