// src/state/mod.rs
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::analysis::{Analyses, AnalysisForm};
use crate::config::{ModuleToggle, Settings};
use crate::data::DataSet;
use crate::engine::{EngineLink, EngineReply};
use crate::error::ModuleError;
use crate::file::{AnalysesFileHandler, FileHandler, SessionGuard, TempFiles};
use crate::modules::builtin;

pub mod tab_bar;

pub use tab_bar::TabBar;

// Analysis view tabs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisTab {
    Form,
    Results,
    Document,
}

/// Figure export settings shared by every analysis view.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExport {
    pub plot_name: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ImageExport {
    fn default() -> Self {
        Self {
            plot_name: String::new(),
            format: "png".to_string(),
            width: 480,
            height: 320,
        }
    }
}

impl ImageExport {
    pub fn save_options(&self, path: &Path) -> Value {
        json!({
            "data": self.plot_name,
            "type": self.format,
            "finalPath": path.display().to_string(),
            "width": self.width,
            "height": self.height,
        })
    }

    pub fn edit_options(&self) -> Value {
        json!({
            "data": self.plot_name,
            "width": self.width,
            "height": self.height,
        })
    }
}

// Core application state
pub struct AppState {
    // Analyses and their bound forms
    pub analyses: Analyses,
    pub forms: Vec<AnalysisForm>,

    // Data
    pub dataset: Option<DataSet>,
    pub dataset_path: Option<PathBuf>,

    // Chrome
    pub tab_bar: TabBar,
    pub settings: Settings,
    pub settings_path: Option<PathBuf>,

    // Backend
    pub engine: EngineLink,

    // File management
    pub file_handler: AnalysesFileHandler,
    pub analyses_path: Option<PathBuf>,
    session: Option<SessionGuard>,

    // Minimal UI state
    pub selected_analysis: Option<usize>,
    pub analysis_tab: AnalysisTab,
    pub image_export: ImageExport,
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        let settings_path = Settings::default_path();
        let settings = Settings::load_or_default(settings_path.as_deref());
        let temp_files = TempFiles::for_session();
        let session = temp_files.session_guard();
        let mut state = Self::with_settings(settings, temp_files);
        state.settings_path = settings_path;
        state.session = Some(session);
        state
    }

    /// State that never touches the user's settings file.
    pub fn with_settings(settings: Settings, temp_files: TempFiles) -> Self {
        let mut tab_bar = TabBar::new();
        tab_bar.add_tab(builtin::COMMON);
        tab_bar.init(&settings);

        Self {
            analyses: Analyses::new(builtin::all(), Rc::new(temp_files)),
            forms: Vec::new(),
            dataset: None,
            dataset_path: None,
            tab_bar,
            settings,
            settings_path: None,
            engine: EngineLink::new(),
            file_handler: AnalysesFileHandler::new(),
            analyses_path: None,
            selected_analysis: None,
            analysis_tab: AnalysisTab::Form,
            image_export: ImageExport::default(),
            error_message: None,
            session: None,
        }
    }

    pub fn form(&self, id: usize) -> Option<&AnalysisForm> {
        self.forms.iter().find(|f| f.analysis_id() == id)
    }

    /// The form of `id` together with its analysis and the data set.
    pub fn form_context(&mut self, id: usize) -> Option<(&mut AnalysisForm, &mut crate::analysis::Analysis, Option<&DataSet>)> {
        let form = self.forms.iter_mut().find(|f| f.analysis_id() == id)?;
        let analysis = self.analyses.get_mut(id)?;
        Some((form, analysis, self.dataset.as_ref()))
    }

    pub fn create_analysis(&mut self, module: &str, title: &str) -> Result<usize, ModuleError> {
        let id = self.analyses.create(module, title)?;
        self.attach_form(id);
        self.selected_analysis = Some(id);
        Ok(id)
    }

    /// Builds and binds the form of a dynamic-module analysis. Analyses
    /// without module data only show their results.
    fn attach_form(&mut self, id: usize) {
        let Some(analysis) = self.analyses.get_mut(id) else {
            return;
        };
        let Some(entry) = analysis.module_data().cloned() else {
            return;
        };
        let mut form = AnalysisForm::new(id, &entry);
        form.bind_to(analysis, self.dataset.as_ref());
        self.forms.push(form);
    }

    pub fn remove_analysis(&mut self, id: usize) {
        if !self.analyses.remove(id) {
            return;
        }
        self.forms.retain(|f| f.analysis_id() != id);
        if self.selected_analysis == Some(id) {
            self.selected_analysis = None;
        }
        for column in self.analyses.take_released_columns() {
            tracing::info!("computed column {} released", column);
        }
    }

    pub fn load_dataset(&mut self, path: &Path) -> Result<()> {
        let dataset = DataSet::load_csv(path)?;
        tracing::info!(
            "loaded {} ({} columns, {} rows)",
            path.display(),
            dataset.columns().len(),
            dataset.row_count()
        );
        self.dataset_path = Some(path.to_path_buf());
        self.set_dataset(dataset);
        Ok(())
    }

    /// Swaps the data set and lets every form rebuild from it.
    pub fn set_dataset(&mut self, dataset: DataSet) {
        self.dataset = Some(dataset);
        let data = self.dataset.as_ref();
        for form in self.forms.iter_mut() {
            let Some(analysis) = self.analyses.get_mut(form.analysis_id()) else {
                continue;
            };
            if form.dataset_changed(data) {
                analysis.refresh();
            }
            form.sync(analysis);
        }
    }

    /// Pushes pending form edits into their analyses.
    pub fn sync_forms(&mut self) {
        let data = self.dataset.as_ref();
        for form in self.forms.iter_mut() {
            let Some(analysis) = self.analyses.get_mut(form.analysis_id()) else {
                continue;
            };
            if analysis.take_form_refresh_request() {
                form.refresh_table_view_models(data);
            }
            form.sync(analysis);
        }
    }

    /// Queues every request the backend has to see: script requests from
    /// the forms first, then analysis jobs.
    pub fn pump_requests(&mut self) {
        self.sync_forms();

        for form in self.forms.iter_mut() {
            for request in form.take_script_requests() {
                self.engine.send(request.as_json());
            }
        }

        let requests = self
            .analyses
            .collect_requests(self.settings.ppi, &self.settings.image_background);
        for request in requests {
            self.engine.send(request);
        }
    }

    /// Applies every reply the backend sent since the last call.
    pub fn handle_replies(&mut self) {
        for reply in self.engine.poll_replies() {
            self.handle_reply(&reply);
        }
    }

    pub fn handle_reply(&mut self, reply: &EngineReply) {
        match reply {
            EngineReply::ScriptDone {
                analysis_id,
                control,
                result,
            } => {
                let Some((form, analysis, data)) = self.form_context(*analysis_id) else {
                    tracing::warn!("script result for analysis {} without form", analysis_id);
                    return;
                };
                form.run_script_request_done(control, result, data);
                form.sync(analysis);
            }
            _ => {
                self.analyses.handle_reply(reply);
            }
        }
    }

    pub fn toggle_module(&mut self, module: ModuleToggle) {
        self.tab_bar.toggle_module(module, &mut self.settings);
        if let Err(e) = self.save_settings() {
            self.error_message = Some(format!("{:#}", e));
        }
    }

    pub fn save_settings(&self) -> Result<()> {
        match &self.settings_path {
            Some(path) => self.settings.save(path),
            None => Ok(()),
        }
    }

    pub fn save_analyses(&mut self, path: &Path) -> Result<()> {
        self.sync_forms();
        let document = self.analyses.to_document();
        self.file_handler
            .save(&document, path)
            .with_context(|| format!("Failed to save analyses to {}", path.display()))?;
        self.analyses_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Replaces every analysis with those saved at `path`. Entries that
    /// cannot be restored are reported in the error window.
    pub fn load_analyses(&mut self, path: &Path) -> Result<()> {
        let document = self.file_handler.load(path)?;
        self.forms.clear();
        self.selected_analysis = None;

        let errors = self.analyses.load_document(&document);
        for id in self.analyses.ids() {
            self.attach_form(id);
        }
        self.analyses_path = Some(path.to_path_buf());

        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| format!("{:#}", e)).collect();
            self.error_message = Some(format!("Some analyses could not be restored:\n{}", messages.join("\n")));
        }
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FormControl, Status};
    use crate::data::Column;
    use crate::options::Term;
    use serde_json::json;

    fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_settings(Settings::default(), TempFiles::new(dir.path().join("tmp")));
        (dir, state)
    }

    fn dataset() -> DataSet {
        DataSet::new(vec![
            Column::new("score".into(), vec!["1".into(), "2".into(), "3".into()]),
            Column::new("colour".into(), vec!["red".into(), "blue".into(), "red".into()]),
        ])
    }

    #[test]
    fn creating_an_analysis_binds_its_form() {
        let (_dir, mut state) = state();
        state.set_dataset(dataset());

        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();

        let form = state.form(id).unwrap();
        assert!(form.is_bound());
        assert_eq!(state.selected_analysis, Some(id));
        assert!(state.analyses.get(id).unwrap().options().get("priorCounts").is_some());
    }

    #[test]
    fn unknown_entry_is_an_error() {
        let (_dir, mut state) = state();
        assert!(state.create_analysis(builtin::COMMON, "No Such Test").is_err());
        assert!(state.forms.is_empty());
    }

    #[test]
    fn pump_queues_one_run_request_per_new_analysis() {
        let (_dir, mut state) = state();
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();

        state.pump_requests();
        let outgoing = state.engine.take_outgoing();

        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0]["id"], json!(id));
        assert_eq!(outgoing[0]["perform"], json!("run"));
        assert_eq!(state.analyses.get(id).unwrap().status(), Status::Running);
    }

    #[test]
    fn replies_are_routed_through_the_channel() {
        let (_dir, mut state) = state();
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();
        state.pump_requests();
        state.engine.take_outgoing();

        let sender = state.engine.reply_sender();
        sender
            .send(json!({
                "typeRequest": "analysis",
                "id": id,
                "status": "complete",
                "results": { "title": "done" },
                "progress": -1
            }))
            .unwrap();
        state.handle_replies();

        let analysis = state.analyses.get(id).unwrap();
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(analysis.results()["title"], json!("done"));
    }

    #[test]
    fn assigning_a_factor_fills_the_prior_counts_option() {
        let (_dir, mut state) = state();
        state.set_dataset(dataset());
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();

        let (form, _, data) = state.form_context(id).unwrap();
        form.assign("factor", Term::from("colour"), data);
        state.sync_forms();

        let options = state.analyses.get(id).unwrap().options().as_json();
        assert_eq!(options["factor"], json!(["colour"]));
        let rows = options["priorCounts"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["levels"], json!(["red", "blue"]));
    }

    #[test]
    fn removing_an_analysis_drops_its_form() {
        let (_dir, mut state) = state();
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();

        state.remove_analysis(id);

        assert!(state.form(id).is_none());
        assert!(state.analyses.get(id).is_none());
        assert_eq!(state.selected_analysis, None);
    }

    #[test]
    fn saved_analyses_load_back_with_forms() {
        let (dir, mut state) = state();
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();
        let path = dir.path().join("analyses.json");
        state.save_analyses(&path).unwrap();

        let (_other_dir, mut restored) = self::state();
        restored.load_analyses(&path).unwrap();

        assert_eq!(restored.analyses.len(), 1);
        assert!(restored.form(id).is_some());
        assert!(restored.error_message.is_none());
        assert!(matches!(
            restored.form(id).unwrap().control("priorCounts"),
            Some(FormControl::Table(_))
        ));
    }

    #[test]
    fn toggling_a_module_adds_its_tab() {
        let (_dir, mut state) = state();
        state.toggle_module(ModuleToggle::Sem);

        assert!(state.settings.sem_plugin);
        assert_eq!(state.tab_bar.current_tab(), Some(builtin::SEM));
        assert!(state.error_message.is_none());
    }

    #[test]
    fn image_export_settings_reach_the_analysis() {
        let (_dir, mut state) = state();
        state.set_dataset(dataset());
        let id = state.create_analysis(builtin::COMMON, "Multinomial Test").unwrap();

        state.image_export.plot_name = "descriptivesPlot".into();
        state.image_export.format = "svg".into();
        state.image_export.width = 640;

        let save = state.image_export.save_options(Path::new("/tmp/plot.svg"));
        let analysis = state.analyses.get_mut(id).unwrap();
        analysis.save_image(save);
        assert_eq!(analysis.status(), Status::SaveImg);
        assert_eq!(analysis.save_img_options()["type"], json!("svg"));
        assert_eq!(analysis.save_img_options()["finalPath"], json!("/tmp/plot.svg"));

        analysis.edit_image(state.image_export.edit_options());
        assert_eq!(analysis.status(), Status::EditImg);
        assert_eq!(
            analysis.save_img_options(),
            &json!({ "data": "descriptivesPlot", "width": 640, "height": 320 })
        );
    }
}
