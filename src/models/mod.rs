// src/models/mod.rs
pub mod column_name;
pub mod filtered_data_entry;
pub mod jags_data_input;
pub mod list_model;
pub mod table_view;
pub mod terms_assigned;
pub mod terms_available;
pub mod text_area;

pub use column_name::{BoundColumnName, ColumnRequest};
pub use filtered_data_entry::FilteredDataEntryModel;
pub use jags_data_input::JagsDataInputModel;
pub use list_model::{ListModel, SourceProvider, SourceSpec, TermsChange};
pub use table_view::{CellValue, ItemType, Orientation, TableModel, TableViewBase};
pub use terms_assigned::TermsAssignedModel;
pub use terms_available::{SortType, TermsAvailableModel};
pub use text_area::{BoundTextArea, TextType};
