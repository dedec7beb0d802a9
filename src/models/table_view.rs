// src/models/table_view.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use super::list_model::{ListModel, SourceProvider, SourceSpec, TermsChange};
use crate::data::DataSet;
use crate::options::{Options, OptionsTable, Terms};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Integer,
    #[default]
    Double,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Double(f64),
    Text(String),
}

impl CellValue {
    /// Converts raw user input according to `item_type`. `None` when the
    /// input is not a valid value of that type.
    pub fn coerce(item_type: ItemType, raw: &str) -> Option<CellValue> {
        let trimmed = raw.trim();
        match item_type {
            ItemType::Integer => trimmed.parse::<i64>().ok().map(CellValue::Integer),
            ItemType::Double => trimmed.parse::<f64>().ok().map(CellValue::Double),
            ItemType::String => Some(CellValue::Text(raw.to_string())),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            CellValue::Integer(i) => *i as f64,
            CellValue::Double(d) => *d,
            CellValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn display_width(&self) -> usize {
        self.to_string().chars().count()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Double(d) => write!(f, "{}", d),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

pub const LINE_LEFT: u8 = 1;
pub const LINE_RIGHT: u8 = 2;
pub const LINE_UP: u8 = 4;
pub const LINE_DOWN: u8 = 8;

/// Grid state shared by every table model. `values` is column-major and
/// every column holds exactly `row_names.len()` cells.
#[derive(Debug)]
pub struct TableViewBase {
    pub list: ListModel,
    pub table_type: String,
    pub item_type: ItemType,
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub values: Vec<Vec<CellValue>>,
    pub max_rows: usize,
    pub max_columns: usize,
    pub initial_row_count: usize,
    pub initial_column_count: usize,
    pub default_cell: CellValue,
    bound: bool,
    pending_rows: Option<Vec<Options>>,
    script_requests: Vec<String>,
    model_changes: usize,
    pub data_changed: Signal<(usize, usize)>,
    pub header_data_changed: Signal<(Orientation, usize)>,
    pub column_count_changed: Signal<usize>,
    pub row_count_changed: Signal<usize>,
}

impl TableViewBase {
    pub fn new(name: &str, table_type: &str, sources: Vec<SourceSpec>) -> Self {
        Self {
            list: ListModel::new(name, sources),
            table_type: table_type.to_string(),
            item_type: ItemType::Double,
            row_names: Vec::new(),
            col_names: Vec::new(),
            values: Vec::new(),
            max_rows: 100,
            max_columns: 10,
            initial_row_count: 0,
            initial_column_count: 0,
            default_cell: CellValue::Double(0.0),
            bound: false,
            pending_rows: None,
            script_requests: Vec::new(),
            model_changes: 0,
            data_changed: Signal::new(),
            header_data_changed: Signal::new(),
            column_count_changed: Signal::new(),
            row_count_changed: Signal::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_names.len()
    }

    pub fn column_count(&self) -> usize {
        self.col_names.len()
    }

    pub fn is_rectangular(&self) -> bool {
        self.values.iter().all(|col| col.len() == self.row_names.len())
    }

    pub fn value(&self, col: usize, row: usize) -> Option<&CellValue> {
        self.values.get(col).and_then(|c| c.get(row))
    }

    pub fn set_bound(&mut self, bound: bool) {
        self.bound = bound;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn model_change_count(&self) -> usize {
        self.model_changes
    }

    pub fn set_pending_rows(&mut self, rows: Vec<Options>) {
        self.pending_rows = Some(rows);
    }

    pub fn take_pending_rows(&mut self) -> Option<Vec<Options>> {
        self.pending_rows.take()
    }

    /// Queues a script for the backend; the form sends it.
    pub fn run_r_script(&mut self, script: String) {
        self.script_requests.push(script);
    }

    pub fn take_script_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.script_requests)
    }

    pub fn value_ok(&self, raw: &str) -> bool {
        CellValue::coerce(self.item_type, raw).is_some()
    }

    /// Border lines to draw around a cell, as a LINE_* bitmask.
    pub fn cell_lines(&self, col: usize, row: usize) -> u8 {
        let below_me_is_active = row + 1 < self.row_count();
        let mut lines = LINE_LEFT | LINE_UP;
        if !below_me_is_active {
            lines |= LINE_DOWN;
        }
        if col + 1 == self.column_count() {
            lines |= LINE_RIGHT;
        }
        lines
    }

    pub fn header(&self, orientation: Orientation, section: usize) -> Option<&str> {
        match orientation {
            Orientation::Horizontal => self.col_names.get(section),
            Orientation::Vertical => self.row_names.get(section),
        }
        .map(String::as_str)
    }

    pub fn max_column_width_in_characters(&self, col: usize) -> usize {
        let widest = self
            .values
            .get(col)
            .map(|c| c.iter().map(CellValue::display_width).max().unwrap_or(0))
            .unwrap_or(0);
        widest.max(3) + 3
    }

    /// Exposes one column as terms; `what` is a column name or `columnN`.
    pub fn column_terms(&self, what: &str) -> Result<Terms, String> {
        let col = if what.is_empty() {
            if self.values.len() == 1 {
                Some(0)
            } else {
                None
            }
        } else {
            self.col_names.iter().position(|c| c == what).or_else(|| {
                what.strip_prefix("column")
                    .and_then(|n| n.parse::<usize>().ok())
                    .map(|n| n.saturating_sub(1))
            })
        };

        let Some(col) = col else {
            return Err(if what.is_empty() {
                format!("No column specified in the source of {}", self.list.name())
            } else {
                format!("The source use does not specify a valid column in {}", self.list.name())
            });
        };

        let values = self.values.get(col).ok_or_else(|| {
            format!(
                "Column number in source use is bigger than the number of columns of {}",
                self.list.name()
            )
        })?;

        Ok(Terms::from_names(
            values
                .iter()
                .map(CellValue::to_string)
                .filter(|v| !v.is_empty() && v != "..."),
        ))
    }

    pub fn clear(&mut self) {
        self.col_names.clear();
        self.row_names.clear();
        self.values.clear();
    }

    fn pad_to_rectangle(&mut self) {
        let rows = self.row_names.len();
        let default = self.default_cell.clone();
        for col in self.values.iter_mut() {
            col.resize(rows, default.clone());
        }
    }
}

/// Behaviour of a concrete table model. Structural edits are provided and
/// keep the grid rectangular; every edit ends in exactly one
/// `emit_model_changed`.
pub trait TableModel {
    fn base(&self) -> &TableViewBase;
    fn base_mut(&mut self) -> &mut TableViewBase;

    /// Template row for the bound options table.
    fn create_option(&self) -> OptionsTable;

    /// Loads the model from the bound options table.
    fn init_values(&mut self, table: &OptionsTable, data: Option<&DataSet>);

    /// Reserializes the model into the bound options table.
    fn model_changed_slot(&mut self);

    fn col_name(&self, index: usize) -> String {
        format!("Column {}", index + 1)
    }

    fn row_name(&self, index: usize) -> String {
        (index + 1).to_string()
    }

    fn is_editable(&self, _col: usize) -> bool {
        true
    }

    /// Whether the user may add or remove rows and columns.
    fn allows_structural_edits(&self) -> bool {
        true
    }

    /// Filter expression of models that show a filtered view of the data set.
    fn row_filter(&self) -> Option<&str> {
        None
    }

    fn set_row_filter(&mut self, _filter: &str) {}

    fn source_terms_changed(
        &mut self,
        _change: &TermsChange,
        provider: &dyn SourceProvider,
        _data: Option<&DataSet>,
    ) {
        let terms = self.base().list.get_source_terms(provider);
        self.base_mut().list.init_terms(&terms);
    }

    fn r_script_done_handler(&mut self, _result: &str, _data: Option<&DataSet>) {}

    fn dataset_changed(&mut self, _data: Option<&DataSet>) {}

    fn refresh_model(&mut self, _data: Option<&DataSet>) {}

    fn cell_display(&self, col: usize, row: usize, _data: Option<&DataSet>) -> Option<String> {
        self.base().value(col, row).map(CellValue::to_string)
    }

    fn max_column_width_in_characters(&self, col: usize, _data: Option<&DataSet>) -> usize {
        self.base().max_column_width_in_characters(col)
    }

    /// Header text padded with X's to the widest expected cell, used to
    /// size a column.
    fn max_col_string(&self, section: usize, data: Option<&DataSet>) -> Option<String> {
        let header = self.base().header(Orientation::Horizontal, section)?;
        let mut dummy = format!("{}XXXXX", header);
        let width = self.max_column_width_in_characters(section, data);
        while dummy.chars().count() < width {
            dummy.push('X');
        }
        Some(dummy)
    }

    fn emit_model_changed(&mut self) {
        let base = self.base_mut();
        base.model_changes += 1;
        base.list.model_changed.emit(&TermsChange::default());
        if base.is_bound() {
            self.model_changed_slot();
        }
    }

    fn push_column(&mut self) -> bool {
        let index = self.base().column_count();
        if index >= self.base().max_columns {
            return false;
        }
        let name = self.col_name(index);
        let base = self.base_mut();
        base.col_names.push(name);
        base.values.push(vec![base.default_cell.clone(); base.row_names.len()]);
        true
    }

    fn push_row(&mut self) -> bool {
        let index = self.base().row_count();
        if index >= self.base().max_rows {
            return false;
        }
        let name = self.row_name(index);
        let base = self.base_mut();
        base.row_names.push(name);
        base.pad_to_rectangle();
        true
    }

    fn add_column(&mut self) {
        self.push_column();
        let count = self.base().column_count();
        self.base_mut().column_count_changed.emit(&count);
        self.emit_model_changed();
    }

    fn remove_column(&mut self, col: usize) {
        let base = self.base_mut();
        if col < base.column_count() {
            base.values.remove(col);
            base.col_names.pop();
        }
        let count = base.column_count();
        base.column_count_changed.emit(&count);
        self.emit_model_changed();
    }

    fn add_row(&mut self) {
        self.push_row();
        let count = self.base().row_count();
        self.base_mut().row_count_changed.emit(&count);
        self.emit_model_changed();
    }

    fn remove_row(&mut self, row: usize) {
        let base = self.base_mut();
        if row < base.row_count() {
            for col in base.values.iter_mut() {
                col.remove(row);
            }
            base.row_names.pop();
        }
        let count = base.row_count();
        base.row_count_changed.emit(&count);
        self.emit_model_changed();
    }

    fn reset(&mut self) {
        self.base_mut().clear();

        for _ in 0..self.base().initial_column_count {
            self.push_column();
        }
        for _ in 0..self.base().initial_row_count {
            self.push_row();
        }

        let base = self.base_mut();
        let (cols, rows) = (base.column_count(), base.row_count());
        base.column_count_changed.emit(&cols);
        base.row_count_changed.emit(&rows);
        self.emit_model_changed();
    }

    fn item_changed(&mut self, col: usize, row: usize, value: CellValue) {
        if col >= self.base().column_count() || row >= self.base().row_count() {
            return;
        }

        let base = self.base_mut();
        let coerced = match (base.item_type, &value) {
            (ItemType::Integer, v) => CellValue::Integer(v.to_f64() as i64),
            (ItemType::Double, v) => CellValue::Double(v.to_f64()),
            (ItemType::String, v) => CellValue::Text(v.to_string()),
        };

        if base.values[col][row] == coerced {
            return;
        }

        let got_larger = coerced.display_width() > base.values[col][row].display_width();
        base.values[col][row] = coerced;
        base.data_changed.emit(&(col, row));
        self.emit_model_changed();

        if got_larger {
            self.base_mut()
                .header_data_changed
                .emit(&(Orientation::Horizontal, col));
        }
    }

    /// Entry point for raw text typed into a cell.
    fn edit_cell(&mut self, col: usize, row: usize, raw: &str, data: Option<&DataSet>) {
        match CellValue::coerce(self.base().item_type, raw) {
            Some(value) => self.item_changed(col, row, value),
            None => self.refresh_model(data),
        }
    }
}
