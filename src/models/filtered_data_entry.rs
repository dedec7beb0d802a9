// src/models/filtered_data_entry.rs
use std::collections::BTreeMap;

use super::list_model::{SourceProvider, SourceSpec, TermsChange};
use super::table_view::{CellValue, ItemType, Orientation, TableModel, TableViewBase};
use crate::data::DataSet;
use crate::options::{OptionValue, Options, OptionsTable};
use crate::signal::Signal;

pub const DEFAULT_FILTER: &str = "rep(TRUE, rowcount)";
pub const DEFAULT_COL_NAME: &str = "ValuesEntered";

/// Builds the backend script that evaluates `filter` over the data set and
/// answers with one TRUE/FALSE token per row.
pub fn filter_script(filter: &str) -> String {
    format!(
        "filterResult <- {{{}}};\n\
         if(!is.logical(filterResult)) filterResult <- rep(TRUE, rowcount);\n\
         return(paste0(sep=' ', collapse='', as.character(filterResult)));\n",
        filter
    )
}

/// Parses a filter reply. Any reply that does not hold exactly one
/// TRUE/FALSE token per row accepts every row.
pub fn parse_filter_result(result: &str, data_rows: usize) -> Vec<bool> {
    let mut rows = vec![true; data_rows];
    let mut count = 0;

    for token in result.split(' ') {
        if token == "TRUE" || token == "FALSE" {
            if count < data_rows {
                rows[count] = token == "TRUE";
            }
            count += 1;
        }
    }

    if count == data_rows {
        rows
    } else {
        vec![true; data_rows]
    }
}

/// A single editable column over the rows of the data set that pass a
/// filter, optionally flanked by read-only data columns.
pub struct FilteredDataEntryModel {
    base: TableViewBase,
    filter: String,
    col_name: String,
    extra_col: String,
    data_columns: Vec<String>,
    accepted_rows: Vec<bool>,
    filtered_row_to_data: Vec<usize>,
    entered_values: BTreeMap<usize, f64>,
    editable_column: usize,
    data_rows: usize,
    pub filter_changed: Signal<String>,
    pub col_name_changed: Signal<String>,
    pub extra_col_changed: Signal<String>,
    pub accepted_rows_changed: Signal<()>,
}

impl FilteredDataEntryModel {
    pub fn new(name: &str, table_type: &str, sources: Vec<SourceSpec>) -> Self {
        let mut base = TableViewBase::new(name, table_type, sources);
        base.item_type = ItemType::Double;
        base.col_names.push(DEFAULT_COL_NAME.to_string());

        Self {
            base,
            filter: DEFAULT_FILTER.to_string(),
            col_name: DEFAULT_COL_NAME.to_string(),
            extra_col: String::new(),
            data_columns: Vec::new(),
            accepted_rows: Vec::new(),
            filtered_row_to_data: Vec::new(),
            entered_values: BTreeMap::new(),
            editable_column: 0,
            data_rows: 0,
            filter_changed: Signal::new(),
            col_name_changed: Signal::new(),
            extra_col_changed: Signal::new(),
            accepted_rows_changed: Signal::new(),
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn col_name(&self) -> &str {
        &self.col_name
    }

    pub fn extra_col(&self) -> &str {
        &self.extra_col
    }

    pub fn editable_column(&self) -> usize {
        self.editable_column
    }

    pub fn accepted_rows(&self) -> &[bool] {
        &self.accepted_rows
    }

    pub fn filtered_row_to_data(&self) -> &[usize] {
        &self.filtered_row_to_data
    }

    pub fn entered_value(&self, data_row: usize) -> Option<f64> {
        self.entered_values.get(&data_row).copied()
    }

    pub fn set_filter(&mut self, filter: &str) {
        if self.filter == filter {
            return;
        }
        self.filter = filter.to_string();
        let filter = self.filter.clone();
        self.filter_changed.emit(&filter);
        self.run_filter();
    }

    pub fn run_filter(&mut self) {
        if self.data_rows > 0 {
            let script = filter_script(&self.filter);
            self.base.run_r_script(script);
        }
    }

    pub fn set_accepted_rows(&mut self, new_rows: Vec<bool>) {
        let changed = new_rows != self.accepted_rows;
        if !changed {
            return;
        }
        self.accepted_rows = new_rows;
        self.accepted_rows_changed.emit(&());
        self.fill_table();
        self.emit_model_changed();
    }

    fn set_accepted_rows_true(&mut self) {
        self.accepted_rows = vec![true; self.data_rows];
        self.fill_table();
    }

    /// Rebuilds the visible rows from the accepted-rows bitmap.
    pub fn fill_table(&mut self) {
        self.filtered_row_to_data.clear();
        self.base.row_names.clear();
        self.base.values.clear();

        if self.accepted_rows.len() != self.data_rows {
            self.accepted_rows = vec![true; self.data_rows];
        }

        let mut column = Vec::new();
        for row in 0..self.data_rows {
            if self.accepted_rows[row] {
                self.filtered_row_to_data.push(row);
                let entered = self.entered_values.get(&row).copied().unwrap_or(0.0);
                column.push(CellValue::Double(entered));
                self.base.row_names.push((row + 1).to_string());
            }
        }
        self.base.values.push(column);

        self.editable_column = self.base.col_names.len().saturating_sub(1);

        let (cols, rows) = (self.base.column_count(), self.base.row_count());
        self.base.column_count_changed.emit(&cols);
        self.base.row_count_changed.emit(&rows);
    }

    fn rebuild_col_names(&mut self) {
        self.base.col_names = self.data_columns.clone();
        if !self.extra_col.is_empty() {
            self.base.col_names.push(self.extra_col.clone());
        }
        self.base.col_names.push(self.col_name.clone());
        self.editable_column = self.base.col_names.len() - 1;
    }

    pub fn set_col_name(&mut self, col_name: &str) {
        if self.col_name == col_name {
            return;
        }
        self.col_name = col_name.to_string();
        let name = self.col_name.clone();
        self.col_name_changed.emit(&name);

        if self.editable_column < self.base.col_names.len() {
            self.base.col_names[self.editable_column] = name;
            self.emit_model_changed();
            let editable = self.editable_column;
            self.base
                .header_data_changed
                .emit(&(Orientation::Horizontal, editable));
        }
    }

    pub fn set_extra_col(&mut self, extra_col: &str) {
        if self.extra_col == extra_col {
            return;
        }

        let old_extra_col = std::mem::replace(&mut self.extra_col, extra_col.to_string());
        let editable = self.editable_column;
        let names = &mut self.base.col_names;

        if extra_col.is_empty() {
            if editable > 0 && editable < names.len() && names[editable - 1] == old_extra_col {
                names.remove(editable - 1);
                self.editable_column -= 1;
            }
        } else if old_extra_col.is_empty() {
            if !names.is_empty() && editable < names.len() {
                names.insert(editable, extra_col.to_string());
                self.editable_column += 1;
            }
        } else if editable > 0 && editable < names.len() {
            names[editable - 1] = extra_col.to_string();
        }

        let cols = self.base.column_count();
        self.base.column_count_changed.emit(&cols);
        let extra = self.extra_col.clone();
        self.extra_col_changed.emit(&extra);
        self.emit_model_changed();
    }

    fn load_first_row(&mut self, first: &Options) -> Result<String, crate::error::BindingError> {
        let filter = first.string("filter")?.to_string();
        let values = first.double_array("values")?.to_vec();
        let col_name = first.string("colName")?.to_string();
        let data_cols = first.variables("dataCols")?.to_vec();
        let extra_col = first.variables("extraCol")?.first().cloned().unwrap_or_default();
        let row_indices = first.integer_array("rowIndices")?.to_vec();

        self.extra_col = extra_col;
        self.data_columns = data_cols;
        self.col_name = col_name;
        self.rebuild_col_names();

        for (value_index, row_index) in row_indices.iter().enumerate() {
            let Some(row) = usize::try_from(*row_index).ok().and_then(|r| r.checked_sub(1)) else {
                self.base.list.add_error(format!("Invalid row index {} in data entry", row_index));
                continue;
            };
            if let Some(value) = values.get(value_index) {
                self.entered_values.insert(row, *value);
            }
            // Rows beyond the current data set keep their value for when
            // the data arrives.
            if let Some(accepted) = self.accepted_rows.get_mut(row) {
                *accepted = true;
            }
        }

        Ok(filter)
    }
}

impl TableModel for FilteredDataEntryModel {
    fn base(&self) -> &TableViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TableViewBase {
        &mut self.base
    }

    fn create_option(&self) -> OptionsTable {
        OptionsTable::new(
            Options::new()
                .with("colName", OptionValue::String(String::new()))
                .with("filter", OptionValue::String(String::new()))
                .with("values", OptionValue::DoubleArray(Vec::new()))
                .with("rowIndices", OptionValue::IntegerArray(Vec::new()))
                .with("dataCols", OptionValue::Variables(Vec::new()))
                .with("extraCol", OptionValue::Variables(Vec::new())),
        )
    }

    fn init_values(&mut self, table: &OptionsTable, data: Option<&DataSet>) {
        self.data_rows = data.map_or(0, DataSet::row_count);

        if table.rows.len() > 1 {
            self.base
                .list
                .add_error("Too many rows in OptionsTable for the filtered data entry");
        }

        let Some(first) = table.rows.first() else {
            self.fill_table();
            self.emit_model_changed();
            return;
        };

        self.accepted_rows = vec![false; self.data_rows];
        self.entered_values.clear();
        self.base.clear();

        match self.load_first_row(first) {
            Ok(filter) => {
                self.fill_table();
                self.set_filter(&filter);
            }
            Err(e) => {
                self.base.list.add_error(e.to_string());
                self.rebuild_col_names();
                self.set_accepted_rows_true();
            }
        }
    }

    fn model_changed_slot(&mut self) {
        let row_indices = self
            .filtered_row_to_data
            .iter()
            .map(|row| *row as i64 + 1)
            .collect();
        let values = self
            .base
            .values
            .first()
            .map(|col| col.iter().map(CellValue::to_f64).collect())
            .unwrap_or_default();
        let extra_col = if self.extra_col.is_empty() {
            Vec::new()
        } else {
            vec![self.extra_col.clone()]
        };

        let row = Options::new()
            .with("colName", OptionValue::String(self.col_name.clone()))
            .with("filter", OptionValue::String(self.filter.clone()))
            .with("rowIndices", OptionValue::IntegerArray(row_indices))
            .with("values", OptionValue::DoubleArray(values))
            .with("dataCols", OptionValue::Variables(self.data_columns.clone()))
            .with("extraCol", OptionValue::Variables(extra_col));

        self.base.set_pending_rows(vec![row]);
    }

    fn is_editable(&self, col: usize) -> bool {
        col == self.editable_column
    }

    // Rows follow the data set and the filter, never the user.
    fn allows_structural_edits(&self) -> bool {
        false
    }

    fn row_filter(&self) -> Option<&str> {
        Some(&self.filter)
    }

    fn set_row_filter(&mut self, filter: &str) {
        self.set_filter(filter);
    }

    fn push_column(&mut self) -> bool {
        false
    }

    fn push_row(&mut self) -> bool {
        false
    }

    fn remove_column(&mut self, _col: usize) {}

    fn remove_row(&mut self, _row: usize) {}

    fn reset(&mut self) {
        self.fill_table();
        self.emit_model_changed();
    }

    fn source_terms_changed(
        &mut self,
        _change: &TermsChange,
        provider: &dyn SourceProvider,
        _data: Option<&DataSet>,
    ) {
        let terms = self.base.list.get_source_terms(provider);
        self.base.list.init_terms(&terms);
        self.data_columns = terms.as_strings();
        self.rebuild_col_names();
        self.fill_table();
        self.emit_model_changed();
    }

    fn r_script_done_handler(&mut self, result: &str, _data: Option<&DataSet>) {
        if self.data_rows == 0 {
            return;
        }
        let rows = parse_filter_result(result, self.data_rows);
        self.set_accepted_rows(rows);
    }

    fn dataset_changed(&mut self, data: Option<&DataSet>) {
        self.data_rows = data.map_or(0, DataSet::row_count);
        self.set_accepted_rows_true();
        self.run_filter();
    }

    fn refresh_model(&mut self, _data: Option<&DataSet>) {
        self.fill_table();
        self.run_filter();
    }

    fn item_changed(&mut self, col: usize, row: usize, value: CellValue) {
        if col != self.editable_column || row >= self.base.row_count() {
            return;
        }

        let new_value = CellValue::Double(value.to_f64());
        let Some(current) = self.base.values.first().and_then(|c| c.get(row)) else {
            return;
        };
        if *current == new_value {
            return;
        }

        let got_larger = new_value.display_width() > current.display_width();
        self.entered_values
            .insert(self.filtered_row_to_data[row], new_value.to_f64());
        self.base.values[0][row] = new_value;

        self.base.data_changed.emit(&(col, row));
        self.emit_model_changed();

        if got_larger {
            self.base
                .header_data_changed
                .emit(&(Orientation::Horizontal, col));
        }
    }

    fn cell_display(&self, col: usize, row: usize, data: Option<&DataSet>) -> Option<String> {
        if row >= self.base.row_count() {
            return None;
        }
        if col == self.editable_column {
            return self.base.value(0, row).map(CellValue::to_string);
        }

        let name = self.base.col_names.get(col)?;
        let data_row = *self.filtered_row_to_data.get(row)?;
        data?.column(name)?.value(data_row).map(str::to_string)
    }

    fn max_column_width_in_characters(&self, col: usize, data: Option<&DataSet>) -> usize {
        if col == self.editable_column {
            return self.base.max_column_width_in_characters(0);
        }

        self.base
            .col_names
            .get(col)
            .and_then(|name| data?.column(name))
            .map_or(6, |column| column.max_width_in_characters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn dataset(rows: usize) -> DataSet {
        DataSet::new(vec![
            Column::new("x".into(), (0..rows).map(|i| (i * 10).to_string()).collect()),
        ])
    }

    fn model_with_rows(rows: usize) -> (FilteredDataEntryModel, DataSet) {
        let data = dataset(rows);
        let mut model = FilteredDataEntryModel::new("entry", "", Vec::new());
        model.dataset_changed(Some(&data));
        (model, data)
    }

    #[test]
    fn well_formed_reply_matches_token_by_token() {
        assert_eq!(
            parse_filter_result("TRUE FALSE TRUE", 3),
            vec![true, false, true]
        );
    }

    #[test]
    fn wrong_token_count_accepts_everything() {
        assert_eq!(parse_filter_result("TRUE FALSE", 3), vec![true; 3]);
        assert_eq!(parse_filter_result("FALSE FALSE FALSE FALSE", 3), vec![true; 3]);
        assert_eq!(parse_filter_result("", 2), vec![true; 2]);
    }

    #[test]
    fn dataset_change_shows_all_rows_and_submits_filter() {
        let (mut model, _) = model_with_rows(3);

        assert_eq!(model.filtered_row_to_data(), &[0, 1, 2]);
        let scripts = model.base_mut().take_script_requests();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains(DEFAULT_FILTER));
    }

    #[test]
    fn filter_reply_rebuilds_row_mapping() {
        let (mut model, data) = model_with_rows(4);

        model.r_script_done_handler("FALSE TRUE FALSE TRUE", Some(&data));

        assert_eq!(model.accepted_rows(), &[false, true, false, true]);
        assert_eq!(model.filtered_row_to_data(), &[1, 3]);
        assert_eq!(model.base().row_names, vec!["2", "4"]);
        assert!(model.base().is_rectangular());
    }

    #[test]
    fn entered_values_survive_hide_and_reshow() {
        let (mut model, data) = model_with_rows(3);
        let editable = model.editable_column();

        model.item_changed(editable, 1, CellValue::Double(4.5));
        assert_eq!(model.entered_value(1), Some(4.5));

        model.r_script_done_handler("TRUE FALSE TRUE", Some(&data));
        assert_eq!(model.base().row_count(), 2);
        assert_eq!(model.cell_display(editable, 1, Some(&data)).as_deref(), Some("0"));

        model.r_script_done_handler("TRUE TRUE TRUE", Some(&data));
        assert_eq!(model.cell_display(editable, 1, Some(&data)).as_deref(), Some("4.5"));
    }

    #[test]
    fn only_editable_column_accepts_edits() {
        let (mut model, _) = model_with_rows(2);
        model.item_changed(model.editable_column() + 1, 0, CellValue::Double(1.0));
        assert_eq!(model.entered_value(0), None);
    }

    #[test]
    fn serializes_visible_rows_one_based() {
        let (mut model, data) = model_with_rows(3);
        model.base_mut().set_bound(true);
        model.set_extra_col("x");
        model.r_script_done_handler("FALSE TRUE TRUE", Some(&data));
        let editable = model.editable_column();
        model.item_changed(editable, 0, CellValue::Double(2.0));

        let rows = model.base_mut().take_pending_rows().unwrap();
        let row = &rows[0];
        assert_eq!(row.integer_array("rowIndices").unwrap(), &[2, 3]);
        assert_eq!(row.double_array("values").unwrap(), &[2.0, 0.0]);
        assert_eq!(row.variables("extraCol").unwrap(), &["x".to_string()]);
        assert_eq!(row.string("colName"), Ok(DEFAULT_COL_NAME));
    }

    #[test]
    fn init_values_restores_entries_and_rows() {
        let data = dataset(4);
        let mut model = FilteredDataEntryModel::new("entry", "", Vec::new());
        let mut table = model.create_option();
        table.rows.push(
            Options::new()
                .with("colName", OptionValue::String("weights".into()))
                .with("filter", OptionValue::String(DEFAULT_FILTER.into()))
                .with("values", OptionValue::DoubleArray(vec![7.0, 8.0]))
                .with("rowIndices", OptionValue::IntegerArray(vec![2, 4]))
                .with("dataCols", OptionValue::Variables(vec!["x".into()]))
                .with("extraCol", OptionValue::Variables(Vec::new())),
        );

        model.init_values(&table, Some(&data));

        assert_eq!(model.base().col_names, vec!["x", "weights"]);
        assert_eq!(model.editable_column(), 1);
        assert_eq!(model.filtered_row_to_data(), &[1, 3]);
        assert_eq!(model.cell_display(1, 1, Some(&data)).as_deref(), Some("8"));
        assert_eq!(model.cell_display(0, 1, Some(&data)).as_deref(), Some("30"));
    }

    fn saved_row(values: Vec<f64>, row_indices: Vec<i64>) -> Options {
        Options::new()
            .with("colName", OptionValue::String(DEFAULT_COL_NAME.into()))
            .with("filter", OptionValue::String(DEFAULT_FILTER.into()))
            .with("values", OptionValue::DoubleArray(values))
            .with("rowIndices", OptionValue::IntegerArray(row_indices))
            .with("dataCols", OptionValue::Variables(Vec::new()))
            .with("extraCol", OptionValue::Variables(Vec::new()))
    }

    #[test]
    fn saved_values_wait_for_the_data_set() {
        let mut model = FilteredDataEntryModel::new("entry", "", Vec::new());
        let mut table = model.create_option();
        table.rows.push(saved_row(vec![7.0], vec![2]));

        model.init_values(&table, None);
        assert_eq!(model.entered_value(1), Some(7.0));
        assert_eq!(model.base().row_count(), 0);

        let data = dataset(3);
        model.dataset_changed(Some(&data));
        assert_eq!(model.entered_value(1), Some(7.0));

        model.base_mut().set_bound(true);
        model.r_script_done_handler("TRUE TRUE TRUE", Some(&data));
        model.r_script_done_handler("FALSE TRUE TRUE", Some(&data));
        let rows = model.base_mut().take_pending_rows().unwrap();
        assert_eq!(rows[0].integer_array("rowIndices").unwrap(), &[2, 3]);
        assert_eq!(rows[0].double_array("values").unwrap(), &[7.0, 0.0]);
    }

    #[test]
    fn structural_removal_is_ignored() {
        let (mut model, _) = model_with_rows(3);
        model.set_extra_col("group");
        let changes = model.base().model_change_count();

        model.remove_column(1);
        model.remove_row(0);

        assert_eq!(model.base().col_names, vec!["group", DEFAULT_COL_NAME]);
        assert_eq!(model.filtered_row_to_data(), &[0, 1, 2]);
        assert_eq!(model.base().row_count(), 3);
        assert_eq!(model.base().model_change_count(), changes);
    }

    #[test]
    fn init_values_with_wrong_shape_reports_error() {
        let data = dataset(2);
        let mut model = FilteredDataEntryModel::new("entry", "", Vec::new());
        let mut table = model.create_option();
        table.rows.push(Options::new().with("filter", OptionValue::Number(1.0)));

        model.init_values(&table, Some(&data));

        assert_eq!(model.base().list.errors().len(), 1);
        assert_eq!(model.filtered_row_to_data(), &[0, 1]);
    }

    #[test]
    fn extra_col_insert_overwrite_remove() {
        let (mut model, _) = model_with_rows(1);
        assert_eq!(model.base().col_names, vec![DEFAULT_COL_NAME]);

        model.set_extra_col("group");
        assert_eq!(model.base().col_names, vec!["group", DEFAULT_COL_NAME]);
        assert_eq!(model.editable_column(), 1);

        model.set_extra_col("other");
        assert_eq!(model.base().col_names, vec!["other", DEFAULT_COL_NAME]);

        model.set_extra_col("");
        assert_eq!(model.base().col_names, vec![DEFAULT_COL_NAME]);
        assert_eq!(model.editable_column(), 0);

        model.set_col_name("entered");
        assert_eq!(model.base().col_names, vec!["entered"]);
    }
}
