// src/modules/mod.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::data::ColumnType;
use crate::error::ModuleError;
use crate::models::{ItemType, SourceSpec, TextType};

pub mod builtin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableModelType {
    JagsDataInput,
    FilteredDataEntry,
}

/// Declarative description of one bound control on an analysis form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control")]
pub enum ControlSpec {
    TableView {
        name: String,
        model_type: TableModelType,
        #[serde(default)]
        table_type: String,
        #[serde(default)]
        item_type: ItemType,
        #[serde(default)]
        initial_row_count: usize,
        #[serde(default)]
        initial_column_count: usize,
        #[serde(default)]
        sources: Vec<SourceSpec>,
    },
    TextArea {
        name: String,
        text_type: TextType,
    },
    AvailableTerms {
        name: String,
        #[serde(default)]
        sources: Vec<SourceSpec>,
        #[serde(default)]
        mixed_model_terms: bool,
    },
    AssignedVariables {
        name: String,
        source: String,
        #[serde(default)]
        single_variable: bool,
    },
    ColumnName {
        name: String,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        column_type: ColumnType,
    },
}

impl ControlSpec {
    pub fn name(&self) -> &str {
        match self {
            ControlSpec::TableView { name, .. }
            | ControlSpec::TextArea { name, .. }
            | ControlSpec::AvailableTerms { name, .. }
            | ControlSpec::AssignedVariables { name, .. }
            | ControlSpec::ColumnName { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub module: String,
    pub title: String,
    pub function: String,
    #[serde(default)]
    pub ribbon_group: String,
    #[serde(default)]
    pub uses_jasp_results: bool,
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
}

impl AnalysisEntry {
    /// Stable handle that survives a module reload.
    pub fn coded_reference(&self) -> String {
        format!("{}~{}~{}", self.module, self.title, self.function)
    }

    pub fn full_r_call(&self) -> String {
        format!("{}::{}", self.module, self.function)
    }

    pub fn as_json_for_jasp_file(&self) -> Value {
        json!({
            "moduleName": self.module,
            "analysisEntry": self.function,
            "title": self.title,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicModule {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub help_folder: String,
    pub entries: Vec<AnalysisEntry>,
    #[serde(default = "default_loaded")]
    pub loaded: bool,
}

fn default_loaded() -> bool {
    true
}

impl DynamicModule {
    pub fn help_folder_path(&self) -> String {
        if self.help_folder.is_empty() {
            format!("{}/help/", self.name)
        } else {
            self.help_folder.clone()
        }
    }

    pub fn entry(&self, title: &str) -> Option<&AnalysisEntry> {
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn retrieve_corresponding_analysis_entry(
        &self,
        coded_reference: &str,
    ) -> Result<AnalysisEntry, ModuleError> {
        let parts: Vec<&str> = coded_reference.split('~').collect();
        let [module, title, function] = parts.as_slice() else {
            return Err(ModuleError::MalformedReference(coded_reference.to_string()));
        };

        if !self.loaded {
            return Err(ModuleError::NotLoaded(self.name.clone()));
        }

        if *module != self.name {
            return Err(ModuleError::EntryNotFound {
                module: self.name.clone(),
                reference: coded_reference.to_string(),
            });
        }

        self.entries
            .iter()
            .find(|e| e.title == *title && e.function == *function)
            .cloned()
            .ok_or_else(|| ModuleError::EntryNotFound {
                module: self.name.clone(),
                reference: coded_reference.to_string(),
            })
    }

    /// Buttons for the ribbon, grouped in declaration order.
    pub fn ribbon_groups(&self) -> Vec<(String, Vec<&AnalysisEntry>)> {
        let mut groups: Vec<(String, Vec<&AnalysisEntry>)> = Vec::new();
        for entry in &self.entries {
            let group = if entry.ribbon_group.is_empty() {
                entry.title.clone()
            } else {
                entry.ribbon_group.clone()
            };
            match groups.iter_mut().find(|(name, _)| *name == group) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((group, vec![entry])),
            }
        }
        groups
    }
}
