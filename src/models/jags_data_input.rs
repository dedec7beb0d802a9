// src/models/jags_data_input.rs
use super::list_model::{SourceProvider, SourceSpec, TermsChange};
use super::table_view::{CellValue, TableModel, TableViewBase};
use crate::data::DataSet;
use crate::options::{OptionValue, Options, OptionsTable};

pub const PRIOR_COUNTS: &str = "PriorCounts";

/// One row per level of the assigned factor, one column per hypothesis.
pub struct JagsDataInputModel {
    base: TableViewBase,
}

impl JagsDataInputModel {
    pub fn new(name: &str, table_type: &str, sources: Vec<SourceSpec>) -> Self {
        let mut base = TableViewBase::new(name, table_type, sources);
        base.default_cell = CellValue::Double(1.0);
        Self { base }
    }

    fn cell_from_option(&self, raw: &str) -> CellValue {
        CellValue::coerce(self.base.item_type, raw).unwrap_or_else(|| CellValue::Text(raw.to_string()))
    }
}

impl TableModel for JagsDataInputModel {
    fn base(&self) -> &TableViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TableViewBase {
        &mut self.base
    }

    fn col_name(&self, index: usize) -> String {
        if self.base.table_type == PRIOR_COUNTS {
            return "Counts".to_string();
        }

        let index = index.min(self.base.max_columns.saturating_sub(1)).min(25);
        let letter = char::from(b'a' + index as u8);
        format!("H₀ ({})", letter)
    }

    fn create_option(&self) -> OptionsTable {
        OptionsTable::new(
            Options::new()
                .with("name", OptionValue::String(String::new()))
                .with("levels", OptionValue::Variables(Vec::new()))
                .with("values", OptionValue::Term(Vec::new())),
        )
    }

    fn init_values(&mut self, table: &OptionsTable, _data: Option<&DataSet>) {
        self.base.clear();

        let mut levels: Option<Vec<String>> = None;

        for row in &table.rows {
            let loaded = row.string("name").and_then(|name| {
                let row_levels = row.variables("levels")?;
                let values = row.term("values")?;
                Ok((name.to_string(), row_levels.to_vec(), values.to_vec()))
            });

            match loaded {
                Ok((name, row_levels, values)) => {
                    // Only the levels of the last row are kept.
                    levels = Some(row_levels);
                    self.base.col_names.push(name);
                    let column = values.iter().map(|v| self.cell_from_option(v)).collect();
                    self.base.values.push(column);
                }
                Err(e) => self.base.list.add_error(e.to_string()),
            }
        }

        self.base.row_names = levels.unwrap_or_default();
        let row_count = self.base.row_count();

        if self.base.values.first().is_some_and(|col| col.len() != row_count) {
            self.base.list.add_error(
                "Number of rows specified in the options does not match the number of rows in values",
            );
        }

        for col in self.base.values.iter_mut() {
            if col.len() > row_count {
                tracing::warn!(
                    "Too many rows in a column of {}, shrinking column to fit",
                    self.base.list.name()
                );
                col.truncate(row_count);
            } else {
                col.resize(row_count, CellValue::Double(1.0));
            }
        }

        let (cols, rows) = (self.base.column_count(), self.base.row_count());
        self.base.column_count_changed.emit(&cols);
        self.base.row_count_changed.emit(&rows);
    }

    fn model_changed_slot(&mut self) {
        let levels = self.base.row_names.clone();
        let rows = self
            .base
            .col_names
            .iter()
            .zip(self.base.values.iter())
            .map(|(name, column)| {
                Options::new()
                    .with("name", OptionValue::String(name.clone()))
                    .with("levels", OptionValue::Variables(levels.clone()))
                    .with(
                        "values",
                        OptionValue::Term(column.iter().map(CellValue::to_string).collect()),
                    )
            })
            .collect();

        self.base.set_pending_rows(rows);
    }

    /// Rebuilds the grid from the labels of the first added variable.
    fn source_terms_changed(
        &mut self,
        change: &TermsChange,
        provider: &dyn SourceProvider,
        data: Option<&DataSet>,
    ) {
        let terms = self.base.list.get_source_terms(provider);
        self.base.list.init_terms(&terms);
        self.base.clear();

        let labels = change
            .added
            .at(0)
            .and_then(|term| data?.column(&term.to_string()))
            .map(|column| column.labels().to_vec());

        if let Some(labels) = labels {
            self.base.row_names = labels;
            self.base
                .values
                .push(vec![CellValue::Double(1.0); self.base.row_names.len()]);
            let name = self.col_name(0);
            self.base.col_names.push(name);
        }

        let (cols, rows) = (self.base.column_count(), self.base.row_count());
        self.base.column_count_changed.emit(&cols);
        self.base.row_count_changed.emit(&rows);
        self.emit_model_changed();
    }

    fn row_name(&self, index: usize) -> String {
        self.base
            .row_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| (index + 1).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::models::list_model::tests::provider;
    use crate::options::Terms;

    fn factor_data() -> DataSet {
        DataSet::new(vec![Column::new(
            "colour".into(),
            vec!["red".into(), "green".into(), "red".into(), "blue".into()],
        )])
    }

    #[test]
    fn hypothesis_column_names() {
        let mut model = JagsDataInputModel::new("h", "Hypotheses", Vec::new());
        assert_eq!(model.col_name(0), "H₀ (a)");
        assert_eq!(model.col_name(2), "H₀ (c)");

        model.base_mut().max_columns = 2;
        assert_eq!(model.col_name(7), "H₀ (b)");

        let counts = JagsDataInputModel::new("p", PRIOR_COUNTS, Vec::new());
        assert_eq!(counts.col_name(3), "Counts");
    }

    #[test]
    fn added_factor_builds_one_row_per_level() {
        let data = factor_data();
        let mut model =
            JagsDataInputModel::new("priorCounts", PRIOR_COUNTS, vec![SourceSpec::new("factor")]);
        model.base_mut().set_bound(true);
        let change = TermsChange {
            added: Terms::from_names(["colour"]),
            removed: Terms::new(),
        };

        model.source_terms_changed(&change, &provider(&[("factor", &["colour"])]), Some(&data));

        assert_eq!(model.base().row_names, vec!["red", "green", "blue"]);
        assert_eq!(model.base().col_names, vec!["Counts"]);
        assert_eq!(model.base().values, vec![vec![CellValue::Double(1.0); 3]]);

        let rows = model.base_mut().take_pending_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term("values").unwrap(), &["1", "1", "1"]);
        assert_eq!(rows[0].variables("levels").unwrap().len(), 3);
    }

    #[test]
    fn no_added_terms_clears_grid() {
        let mut model = JagsDataInputModel::new("h", "", vec![SourceSpec::new("factor")]);
        model.base_mut().values.push(vec![CellValue::Double(2.0)]);
        model.base_mut().col_names.push("old".into());
        model.base_mut().row_names.push("x".into());

        model.source_terms_changed(&TermsChange::default(), &provider(&[]), None);

        assert_eq!(model.base().column_count(), 0);
        assert_eq!(model.base().row_count(), 0);
    }

    fn row(name: &str, levels: &[&str], values: &[&str]) -> Options {
        Options::new()
            .with("name", OptionValue::String(name.into()))
            .with("levels", OptionValue::Variables(levels.iter().map(|s| s.to_string()).collect()))
            .with("values", OptionValue::Term(values.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn init_values_uses_last_levels_and_fits_columns() {
        let mut model = JagsDataInputModel::new("h", "", Vec::new());
        let table = OptionsTable::with_rows(
            model.create_option().template,
            vec![
                row("H₀ (a)", &["x"], &["2", "3", "4"]),
                row("H₀ (b)", &["p", "q"], &["5"]),
            ],
        );

        model.init_values(&table, None);

        assert_eq!(model.base().row_names, vec!["p", "q"]);
        assert_eq!(
            model.base().values,
            vec![
                vec![CellValue::Double(2.0), CellValue::Double(3.0)],
                vec![CellValue::Double(5.0), CellValue::Double(1.0)],
            ]
        );
        assert_eq!(model.base().list.errors().len(), 1);
        assert!(model.base().is_rectangular());
    }
}
