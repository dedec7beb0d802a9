// src/analysis/form.rs
use super::analysis::Analysis;
use crate::data::DataSet;
use crate::engine::ScriptRequest;
use crate::modules::{AnalysisEntry, ControlSpec, TableModelType};
use crate::options::{OptionValue, Options, OptionsTable, Term, Terms};
use crate::models::{
    BoundColumnName, BoundTextArea, ColumnRequest, FilteredDataEntryModel, JagsDataInputModel,
    SourceProvider, SourceSpec, TableModel, TermsAssignedModel, TermsAvailableModel, TermsChange,
};

/// Model name every form resolves to the data set's column names.
pub const ALL_VARIABLES: &str = "allVariables";

pub enum FormControl {
    Available(TermsAvailableModel),
    Assigned(TermsAssignedModel),
    Table(Box<dyn TableModel>),
    TextArea(BoundTextArea),
    ColumnName(BoundColumnName),
}

fn sources_mention(sources: &[SourceSpec], model: &str) -> bool {
    sources
        .iter()
        .any(|s| s.model == model || s.discard.iter().any(|d| d.model == model))
}

impl FormControl {
    pub fn from_spec(spec: &ControlSpec) -> Self {
        match spec {
            ControlSpec::TableView {
                name,
                model_type,
                table_type,
                item_type,
                initial_row_count,
                initial_column_count,
                sources,
            } => {
                let mut table: Box<dyn TableModel> = match model_type {
                    TableModelType::JagsDataInput => {
                        Box::new(JagsDataInputModel::new(name, table_type, sources.clone()))
                    }
                    TableModelType::FilteredDataEntry => {
                        Box::new(FilteredDataEntryModel::new(name, table_type, sources.clone()))
                    }
                };
                let base = table.base_mut();
                base.item_type = *item_type;
                base.initial_row_count = *initial_row_count;
                base.initial_column_count = *initial_column_count;
                FormControl::Table(table)
            }
            ControlSpec::TextArea { name, text_type } => {
                FormControl::TextArea(BoundTextArea::new(name, *text_type))
            }
            ControlSpec::AvailableTerms {
                name,
                sources,
                mixed_model_terms,
            } => FormControl::Available(TermsAvailableModel::new(
                name,
                sources.clone(),
                *mixed_model_terms,
            )),
            ControlSpec::AssignedVariables {
                name,
                source,
                single_variable,
            } => FormControl::Assigned(TermsAssignedModel::new(name, source, *single_variable)),
            ControlSpec::ColumnName {
                name,
                computed,
                column_type,
            } => FormControl::ColumnName(BoundColumnName::new(name, *computed, *column_type)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormControl::Available(m) => m.list.name(),
            FormControl::Assigned(m) => m.list.name(),
            FormControl::Table(t) => t.base().list.name(),
            FormControl::TextArea(a) => a.name(),
            FormControl::ColumnName(c) => c.name(),
        }
    }

    fn depends_on(&self, model: &str) -> bool {
        match self {
            FormControl::Available(m) => sources_mention(m.list.sources(), model),
            FormControl::Assigned(m) => m.available_model() == model,
            FormControl::Table(t) => sources_mention(t.base().list.sources(), model),
            FormControl::TextArea(_) | FormControl::ColumnName(_) => false,
        }
    }

    /// The option this control is bound to, in its initial state. Available
    /// lists are not bound.
    fn create_option(&self) -> Option<OptionValue> {
        match self {
            FormControl::Available(_) => None,
            FormControl::Assigned(m) => Some(m.create_option()),
            FormControl::Table(t) => Some(OptionValue::Table(t.create_option())),
            FormControl::TextArea(a) => Some(a.create_option()),
            FormControl::ColumnName(c) => Some(c.create_option()),
        }
    }

    fn take_errors(&mut self) -> Vec<String> {
        match self {
            FormControl::Available(m) => m.list.take_errors(),
            FormControl::Assigned(m) => m.list.take_errors(),
            FormControl::Table(t) => t.base_mut().list.take_errors(),
            FormControl::TextArea(_) | FormControl::ColumnName(_) => Vec::new(),
        }
    }

    fn take_script_requests(&mut self) -> Vec<String> {
        match self {
            FormControl::Table(t) => t.base_mut().take_script_requests(),
            FormControl::TextArea(a) => a.take_script_requests(),
            _ => Vec::new(),
        }
    }
}

/// Resolves source names against the controls of one form and the data set.
struct FormSources<'a> {
    controls: &'a [FormControl],
    data: Option<&'a DataSet>,
}

impl SourceProvider for FormSources<'_> {
    fn source_terms(&self, model: &str, model_use: &str) -> Option<Terms> {
        if model == ALL_VARIABLES {
            return Some(variables_of(self.data));
        }

        match self.controls.iter().find(|c| c.name() == model)? {
            FormControl::Available(m) => Some(m.list.terms().clone()),
            FormControl::Assigned(m) => Some(m.list.terms().clone()),
            FormControl::Table(t) => match t.base().column_terms(model_use) {
                Ok(terms) => Some(terms),
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            },
            FormControl::TextArea(_) | FormControl::ColumnName(_) => None,
        }
    }
}

fn variables_of(data: Option<&DataSet>) -> Terms {
    data.map(|d| Terms::from_names(d.column_names()))
        .unwrap_or_default()
}

/// The bound controls of one analysis. Mediates between the list models,
/// the data set and the analysis' options tree.
pub struct AnalysisForm {
    analysis_id: usize,
    title: String,
    controls: Vec<FormControl>,
    known_variables: Terms,
    errors: Vec<String>,
    script_requests: Vec<ScriptRequest>,
    bound: bool,
}

impl AnalysisForm {
    pub fn new(analysis_id: usize, entry: &AnalysisEntry) -> Self {
        Self {
            analysis_id,
            title: entry.title.clone(),
            controls: entry.controls.iter().map(FormControl::from_spec).collect(),
            known_variables: Terms::new(),
            errors: Vec::new(),
            script_requests: Vec::new(),
            bound: false,
        }
    }

    pub fn analysis_id(&self) -> usize {
        self.analysis_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn control(&self, name: &str) -> Option<&FormControl> {
        self.controls.iter().find(|c| c.name() == name)
    }

    pub fn control_mut(&mut self, name: &str) -> Option<&mut FormControl> {
        self.controls.iter_mut().find(|c| c.name() == name)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.controls.iter().position(|c| c.name() == name)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn add_error(&mut self, error: String) {
        tracing::warn!("form of analysis {}: {}", self.analysis_id, error);
        self.errors.push(error);
    }

    pub fn take_script_requests(&mut self) -> Vec<ScriptRequest> {
        self.collect_side_channels();
        std::mem::take(&mut self.script_requests)
    }

    fn collect_side_channels(&mut self) {
        let mut errors = Vec::new();
        for control in self.controls.iter_mut() {
            errors.extend(control.take_errors());
            let name = control.name().to_string();
            for script in control.take_script_requests() {
                self.script_requests.push(ScriptRequest {
                    analysis_id: self.analysis_id,
                    control: name.clone(),
                    script,
                });
            }
        }
        for error in errors {
            self.add_error(error);
        }
    }

    /// Runs `f` on one control while the others stay available as sources.
    fn with_control<R>(
        &mut self,
        index: usize,
        data: Option<&DataSet>,
        f: impl FnOnce(&mut FormControl, &FormSources) -> R,
    ) -> R {
        let mut control = self.controls.remove(index);
        let result = {
            let sources = FormSources {
                controls: &self.controls,
                data,
            };
            f(&mut control, &sources)
        };
        self.controls.insert(index, control);
        result
    }

    /// Pushes a change of `origin` to every control that draws terms from it.
    fn propagate(
        &mut self,
        origin: &str,
        change: &TermsChange,
        data: Option<&DataSet>,
        visited: &mut Vec<String>,
    ) {
        if visited.iter().any(|v| v == origin) {
            return;
        }
        visited.push(origin.to_string());

        let dependents: Vec<usize> = self
            .controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.depends_on(origin))
            .map(|(i, _)| i)
            .collect();

        for index in dependents {
            let (name, next) = self.with_control(index, data, |control, sources| {
                let next = match control {
                    FormControl::Available(m) => {
                        m.reset_terms_from_source_models(sources, true);
                        Some(m.last_change().clone())
                    }
                    FormControl::Assigned(m) => Some(m.available_terms_changed(change)),
                    FormControl::Table(t) => {
                        t.source_terms_changed(change, sources, data);
                        Some(TermsChange::default())
                    }
                    FormControl::TextArea(_) | FormControl::ColumnName(_) => None,
                };
                (control.name().to_string(), next)
            });

            match next {
                Some(next) if !next.is_empty() || matches!(self.controls[index], FormControl::Table(_)) => {
                    self.propagate(&name, &next, data, visited)
                }
                _ => {}
            }
        }
    }

    /// Re-reads the data set's variables into every list fed by it.
    pub fn refresh_available_variables_models(&mut self, data: Option<&DataSet>) {
        let variables = variables_of(data);
        let change = TermsChange {
            added: variables.added_since(&self.known_variables),
            removed: self.known_variables.added_since(&variables),
        };
        self.known_variables = variables;
        self.propagate(ALL_VARIABLES, &change, data, &mut Vec::new());
    }

    /// Attaches every control to its option in `analysis`, reading saved
    /// options when the analysis came from a file.
    pub fn bind_to(&mut self, analysis: &mut Analysis, data: Option<&DataSet>) {
        self.refresh_available_variables_models(data);

        let mut template = Options::new();
        for control in &self.controls {
            if let Some(option) = control.create_option() {
                template.add(control.name(), option);
            }
        }

        let saved = analysis.options_from_jasp_file().clone();
        let is_new_analysis = saved.is_null();
        if !is_new_analysis {
            for error in template.load_json(&saved) {
                self.add_error(error.to_string());
            }
        }

        let mut binding_errors = Vec::new();
        for control in self.controls.iter_mut() {
            let Some(option) = template.get(control.name()) else {
                continue;
            };
            let result = match (&mut *control, option) {
                (FormControl::Assigned(m), option) => m.bind_to(option),
                (FormControl::TextArea(a), option) => a.bind_to(option),
                (FormControl::ColumnName(c), option) => c.bind_to(option),
                (FormControl::Table(t), OptionValue::Table(table)) => {
                    t.init_values(table, data);
                    t.base_mut().set_bound(true);
                    Ok(())
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                binding_errors.push(e.to_string());
            }
        }
        for error in binding_errors {
            self.add_error(error);
        }

        analysis.set_refresh_blocked(true);
        analysis.with_options(|options| {
            options.clear();
            for name in template.names().map(str::to_string).collect::<Vec<_>>() {
                if let Some(value) = template.get(&name) {
                    options.add(&name, value.clone());
                }
            }
        });
        analysis.set_refresh_blocked(false);
        analysis.initialized(is_new_analysis);
        self.apply_column_requests(analysis);

        self.collect_side_channels();
        self.bound = true;
        tracing::info!("bound form {} to analysis {}", self.title, analysis.id());
    }

    /// Copies every pending control value into the analysis' options.
    pub fn sync(&mut self, analysis: &mut Analysis) {
        if !self.bound {
            return;
        }

        let mut values = Vec::new();
        for control in self.controls.iter_mut() {
            let name = control.name().to_string();
            match control {
                FormControl::Assigned(m) => values.push((name, m.option_value())),
                FormControl::TextArea(a) => {
                    if let Some(text) = a.take_pending_value() {
                        values.push((name, OptionValue::String(text)));
                    }
                }
                FormControl::ColumnName(c) => {
                    if let Some(column) = c.take_pending_value() {
                        values.push((name, OptionValue::String(column)));
                    }
                }
                FormControl::Table(t) => {
                    if let Some(rows) = t.base_mut().take_pending_rows() {
                        let template = t.create_option().template;
                        values.push((name, OptionValue::Table(OptionsTable::with_rows(template, rows))));
                    }
                }
                FormControl::Available(_) => {}
            }
        }

        analysis.set_options_batch(values);
        self.apply_column_requests(analysis);
        self.collect_side_channels();
    }

    /// Forwards the column requests of column-name fields to the options,
    /// where the analysis picks them up.
    fn apply_column_requests(&mut self, analysis: &mut Analysis) {
        let requests: Vec<ColumnRequest> = self
            .controls
            .iter_mut()
            .flat_map(|control| match control {
                FormControl::ColumnName(c) => c.take_requests(),
                _ => Vec::new(),
            })
            .collect();
        if requests.is_empty() {
            return;
        }

        analysis.with_options(|options| {
            for request in requests {
                match request {
                    ColumnRequest::CreateComputed(name) => options.request_computed_column(&name),
                    ColumnRequest::DestroyComputed(name) => {
                        options.request_computed_column_destruction(&name)
                    }
                    ColumnRequest::Create { name, column_type } => {
                        options.request_column(&name, column_type)
                    }
                }
            }
        });
    }

    pub fn assign(&mut self, control: &str, term: Term, data: Option<&DataSet>) {
        self.move_term(control, data, |m| m.assign(term));
    }

    pub fn unassign(&mut self, control: &str, term: &Term, data: Option<&DataSet>) {
        self.move_term(control, data, |m| m.unassign(term));
    }

    fn move_term(
        &mut self,
        control: &str,
        data: Option<&DataSet>,
        f: impl FnOnce(&mut TermsAssignedModel) -> TermsChange,
    ) {
        let change = match self.control_mut(control) {
            Some(FormControl::Assigned(m)) => f(m),
            _ => {
                self.add_error(format!("{} is not an assigned variables list", control));
                return;
            }
        };
        if !change.is_empty() {
            self.propagate(control, &change, data, &mut Vec::new());
        }
    }

    pub fn edit_cell(&mut self, control: &str, col: usize, row: usize, raw: &str, data: Option<&DataSet>) {
        if let Some(FormControl::Table(t)) = self.control_mut(control) {
            t.edit_cell(col, row, raw, data);
        }
    }

    pub fn apply_column_name(&mut self, control: &str) {
        if let Some(FormControl::ColumnName(c)) = self.control_mut(control) {
            c.apply();
        }
    }

    /// Applies the text of a text area (Ctrl + Enter).
    pub fn check_syntax(&mut self, control: &str, data: Option<&DataSet>) {
        let variables = variables_of(data);
        if let Some(FormControl::TextArea(a)) = self.control_mut(control) {
            a.check_syntax(&variables);
        }
        self.collect_side_channels();
    }

    pub fn run_script_request_done(&mut self, control: &str, result: &str, data: Option<&DataSet>) {
        let Some(index) = self.index_of(control) else {
            tracing::warn!("script result for unknown control {}", control);
            return;
        };
        match &mut self.controls[index] {
            FormControl::Table(t) => t.r_script_done_handler(result, data),
            FormControl::TextArea(a) => a.r_script_done_handler(result),
            _ => {}
        }
        self.collect_side_channels();
    }

    pub fn refresh_table_view_models(&mut self, data: Option<&DataSet>) {
        for control in self.controls.iter_mut() {
            if let FormControl::Table(t) = control {
                t.refresh_model(data);
            }
        }
        self.collect_side_channels();
    }

    /// Rebuilds every model from the new data set. Returns true when the
    /// analysis has to be refreshed as a whole.
    pub fn dataset_changed(&mut self, data: Option<&DataSet>) -> bool {
        self.refresh_available_variables_models(data);

        let mut needs_refresh = false;
        for control in self.controls.iter_mut() {
            match control {
                FormControl::Table(t) => t.dataset_changed(data),
                FormControl::TextArea(a) => needs_refresh |= a.refreshes_on_dataset_change(),
                _ => {}
            }
        }
        self.collect_side_channels();
        needs_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Status;
    use crate::data::Column;
    use crate::file::TempFiles;
    use crate::modules::builtin;
    use crate::models::{CellValue, TableViewBase};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn dataset() -> DataSet {
        DataSet::new(vec![
            Column::new("score".into(), vec!["1".into(), "2".into(), "3".into()]),
            Column::new("colour".into(), vec!["red".into(), "blue".into(), "red".into()]),
        ])
    }

    fn setup(title: &str, saved: Option<serde_json::Value>) -> (tempfile::TempDir, Analysis, AnalysisForm) {
        let dir = tempfile::tempdir().unwrap();
        let module = builtin::common();
        let entry = module.entry(title).unwrap().clone();
        let analysis = Analysis::from_entry(1, &entry, &module, "", saved, Rc::new(TempFiles::new(dir.path())));
        let form = AnalysisForm::new(1, &entry);
        (dir, analysis, form)
    }

    fn table_base<'a>(form: &'a AnalysisForm, name: &str) -> &'a TableViewBase {
        match form.control(name) {
            Some(FormControl::Table(t)) => t.base(),
            _ => panic!("{} is not a table", name),
        }
    }

    #[test]
    fn binding_fills_available_variables_and_options() {
        let data = dataset();
        let (_dir, mut analysis, mut form) = setup("Multinomial Test", None);

        form.bind_to(&mut analysis, Some(&data));

        match form.control(builtin::ALL_VARIABLES_LIST) {
            Some(FormControl::Available(m)) => {
                assert_eq!(m.list.terms().as_strings(), vec!["score", "colour"])
            }
            _ => panic!("missing available list"),
        }
        assert!(analysis.options().get("factor").is_some());
        assert!(analysis.options().get("priorCounts").is_some());
        assert_eq!(analysis.status(), Status::Empty);
        assert_eq!(analysis.revision(), 0);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn assigning_a_factor_builds_prior_counts() {
        let data = dataset();
        let (_dir, mut analysis, mut form) = setup("Multinomial Test", None);
        form.bind_to(&mut analysis, Some(&data));

        form.assign("factor", Term::from("colour"), Some(&data));
        form.sync(&mut analysis);

        assert_eq!(table_base(&form, "priorCounts").row_names, vec!["red", "blue"]);
        let table = analysis.options().table("priorCounts").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].string("name"), Ok("Counts"));
        assert_eq!(analysis.options().variables("factor").unwrap(), &["colour".to_string()]);
        assert_eq!(analysis.revision(), 1);

        form.unassign("factor", &Term::from("colour"), Some(&data));
        form.sync(&mut analysis);
        assert_eq!(table_base(&form, "priorCounts").row_count(), 0);
    }

    #[test]
    fn filtered_entry_round_trips_through_the_backend() {
        let data = dataset();
        let (_dir, mut analysis, mut form) = setup("Filtered Data Entry", None);
        form.bind_to(&mut analysis, Some(&data));

        form.assign("dataColumns", Term::from("score"), Some(&data));
        form.dataset_changed(Some(&data));
        let requests = form.take_script_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].control, "dataEntry");

        form.run_script_request_done("dataEntry", "TRUE FALSE TRUE", Some(&data));
        form.edit_cell("dataEntry", 1, 1, "9.5", Some(&data));
        form.sync(&mut analysis);

        let table = analysis.options().table("dataEntry").unwrap();
        assert_eq!(table.rows[0].integer_array("rowIndices").unwrap(), &[1, 3]);
        assert_eq!(table.rows[0].double_array("values").unwrap(), &[0.0, 9.5]);
        assert_eq!(table.rows[0].variables("dataCols").unwrap(), &["score".to_string()]);

        assert_eq!(
            table_base(&form, "dataEntry").value(0, 1),
            Some(&CellValue::Double(9.5))
        );
    }

    #[test]
    fn malformed_saved_options_are_reported_not_fatal() {
        let data = dataset();
        let saved = json!({"factor": 5, "priorCounts": []});
        let (_dir, mut analysis, mut form) = setup("Multinomial Test", Some(saved));

        form.bind_to(&mut analysis, Some(&data));

        assert_eq!(form.errors().len(), 1);
        assert!(form.is_bound());
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(analysis.options().variables("factor").unwrap().len(), 0);
    }

    #[test]
    fn saved_options_restore_controls() {
        let data = dataset();
        let saved = json!({"code": "mean(1)"});
        let (_dir, mut analysis, mut form) = setup("R Code", Some(saved));

        form.bind_to(&mut analysis, Some(&data));

        match form.control("code") {
            Some(FormControl::TextArea(a)) => assert_eq!(a.text(), "mean(1)"),
            _ => panic!("missing text area"),
        }

        if let Some(FormControl::TextArea(a)) = form.control_mut("code") {
            *a.text_mut() = "median(1)".to_string();
        }
        form.check_syntax("code", Some(&data));
        form.sync(&mut analysis);
        assert_eq!(analysis.options().string("code"), Ok("median(1)"));
        assert_eq!(analysis.status(), Status::Empty);
    }

    fn set_column_name(form: &mut AnalysisForm, control: &str, text: &str) {
        match form.control_mut(control) {
            Some(FormControl::ColumnName(c)) => *c.text_mut() = text.to_string(),
            _ => panic!("{} is not a column name", control),
        }
        form.apply_column_name(control);
    }

    #[test]
    fn computed_column_names_follow_the_analysis() {
        let data = dataset();
        let dir = tempfile::tempdir().unwrap();
        let module = builtin::sem();
        let entry = module.entries[0].clone();
        let saved = json!({"model": "", "factorScoresColumn": "fs1"});
        let mut analysis =
            Analysis::from_entry(1, &entry, &module, "", Some(saved), Rc::new(TempFiles::new(dir.path())));
        let mut form = AnalysisForm::new(1, &entry);

        form.bind_to(&mut analysis, Some(&data));
        assert_eq!(analysis.columns_created(), &["fs1".to_string()]);

        let released = Rc::new(RefCell::new(Vec::new()));
        let sink = released.clone();
        analysis
            .computed_column_destruction_requested
            .connect(move |name: &String| sink.borrow_mut().push(name.clone()));

        set_column_name(&mut form, "factorScoresColumn", "fs2");
        form.sync(&mut analysis);

        assert_eq!(analysis.columns_created(), &["fs2".to_string()]);
        assert_eq!(*released.borrow(), vec!["fs1".to_string()]);
        assert_eq!(analysis.options().string("factorScoresColumn"), Ok("fs2"));
        assert_eq!(analysis.status(), Status::Empty);
    }

    #[test]
    fn plain_column_requests_reach_the_analysis() {
        let data = dataset();
        let (_dir, mut analysis, mut form) = setup("Filtered Data Entry", None);
        form.bind_to(&mut analysis, Some(&data));

        let requested = Rc::new(RefCell::new(Vec::new()));
        let sink = requested.clone();
        analysis
            .column_requested
            .connect(move |request: &(String, i32)| sink.borrow_mut().push(request.clone()));

        set_column_name(&mut form, "saveEnteredAs", "weights");
        form.sync(&mut analysis);

        assert_eq!(*requested.borrow(), vec![("weights".to_string(), 8)]);
        assert!(analysis.columns_created().is_empty());
        assert_eq!(analysis.options().string("saveEnteredAs"), Ok("weights"));
    }
}
