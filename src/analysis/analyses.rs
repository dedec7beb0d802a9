// src/analysis/analyses.rs
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use super::analysis::{Analysis, CallbackOutcome, APP_VERSION};
use super::status::Status;
use crate::engine::{EngineReply, PerformType};
use crate::error::ModuleError;
use crate::file::analyses::AnalysesDocument;
use crate::file::TempFiles;
use crate::modules::DynamicModule;
use crate::signal::Signal;

/// Every open analysis, in creation order, plus the modules they come from.
pub struct Analyses {
    analyses: Vec<Analysis>,
    next_id: usize,
    modules: Vec<DynamicModule>,
    temp_files: Rc<TempFiles>,
    released_columns: Rc<RefCell<Vec<String>>>,
    pub analysis_added: Signal<usize>,
    pub analysis_removed: Signal<usize>,
}

impl Analyses {
    pub fn new(modules: Vec<DynamicModule>, temp_files: Rc<TempFiles>) -> Self {
        Self {
            analyses: Vec::new(),
            next_id: 1,
            modules,
            temp_files,
            released_columns: Rc::new(RefCell::new(Vec::new())),
            analysis_added: Signal::new(),
            analysis_removed: Signal::new(),
        }
    }

    pub fn modules(&self) -> &[DynamicModule] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&DynamicModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Analysis> {
        self.analyses.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Analysis> {
        self.analyses.iter_mut()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.analyses.iter().map(Analysis::id).collect()
    }

    pub fn get(&self, id: usize) -> Option<&Analysis> {
        self.analyses.iter().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Analysis> {
        self.analyses.iter_mut().find(|a| a.id() == id)
    }

    fn allocate_id(&mut self, wanted: Option<usize>) -> usize {
        let id = match wanted {
            Some(id) if self.get(id).is_none() => id,
            _ => self.next_id,
        };
        self.next_id = self.next_id.max(id + 1);
        id
    }

    fn insert(&mut self, mut analysis: Analysis) -> usize {
        let released = self.released_columns.clone();
        analysis
            .computed_column_destruction_requested
            .connect(move |column: &String| released.borrow_mut().push(column.clone()));

        let id = analysis.id();
        tracing::info!("created analysis {} ({})", id, analysis.name());
        self.analyses.push(analysis);
        self.analysis_added.emit(&id);
        id
    }

    /// Creates a new analysis from the entry titled `title` in `module`.
    pub fn create(&mut self, module: &str, title: &str) -> Result<usize, ModuleError> {
        let dynamic_module = self
            .module(module)
            .ok_or_else(|| ModuleError::NotLoaded(module.to_string()))?;
        let entry = dynamic_module
            .entry(title)
            .cloned()
            .ok_or_else(|| ModuleError::EntryNotFound {
                module: module.to_string(),
                reference: title.to_string(),
            })?;
        let dynamic_module = dynamic_module.clone();

        let id = self.allocate_id(None);
        let analysis = Analysis::from_entry(id, &entry, &dynamic_module, "", None, self.temp_files.clone());
        Ok(self.insert(analysis))
    }

    /// Recreates an analysis from its saved document.
    pub fn create_from_json(&mut self, json: &Value) -> Result<usize> {
        if !json.is_object() {
            return Err(anyhow!("analysis document is not an object"));
        }

        let str_field = |key: &str| json.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let wanted = json.get("id").and_then(Value::as_u64).map(|id| id as usize);
        let options = json.get("options").cloned();
        let title = str_field("title");

        let mut analysis = match json.get("dynamicModule") {
            Some(reference) => {
                let module_name = reference
                    .get("moduleName")
                    .and_then(Value::as_str)
                    .context("dynamicModule without moduleName")?;
                let function = reference
                    .get("analysisEntry")
                    .and_then(Value::as_str)
                    .context("dynamicModule without analysisEntry")?;
                let module = self
                    .module(module_name)
                    .cloned()
                    .ok_or_else(|| ModuleError::NotLoaded(module_name.to_string()))?;
                let entry = module
                    .entries
                    .iter()
                    .find(|e| e.function == function)
                    .cloned()
                    .ok_or_else(|| ModuleError::EntryNotFound {
                        module: module_name.to_string(),
                        reference: function.to_string(),
                    })?;

                let id = self.allocate_id(wanted);
                Analysis::from_entry(id, &entry, &module, &title, options, self.temp_files.clone())
            }
            None => {
                let version = json
                    .get("version")
                    .and_then(Value::as_str)
                    .unwrap_or(APP_VERSION)
                    .to_string();
                let id = self.allocate_id(wanted);
                Analysis::new(
                    id,
                    &str_field("module"),
                    &str_field("name"),
                    &title,
                    &version,
                    options,
                    self.temp_files.clone(),
                )
            }
        };

        analysis.load_saved_state(json);
        Ok(self.insert(analysis))
    }

    /// Removes an analysis; its computed columns are released.
    pub fn remove(&mut self, id: usize) -> bool {
        let Some(index) = self.analyses.iter().position(|a| a.id() == id) else {
            return false;
        };
        drop(self.analyses.remove(index));
        tracing::info!("removed analysis {}", id);
        self.analysis_removed.emit(&id);
        true
    }

    pub fn clear(&mut self) {
        for id in self.ids() {
            self.remove(id);
        }
    }

    /// Computed columns released by removed analyses since the last call.
    pub fn take_released_columns(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.released_columns.borrow_mut())
    }

    /// Swaps in a reloaded module. Analyses whose entry vanished degrade to
    /// FatalError; their ids are returned.
    pub fn reload_module(&mut self, module: DynamicModule) -> Vec<usize> {
        let mut degraded = Vec::new();
        for analysis in self.analyses.iter_mut() {
            if analysis.module() != module.name || !analysis.is_dynamic_module() {
                continue;
            }
            if !analysis.check_analysis_entry(&module) {
                analysis.set_status(Status::FatalError);
                degraded.push(analysis.id());
            }
        }

        match self.modules.iter_mut().find(|m| m.name == module.name) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
        degraded
    }

    /// Every analysis waits for a rerun after the data set changed.
    pub fn refresh_all(&mut self) {
        for analysis in self.analyses.iter_mut() {
            analysis.refresh();
        }
    }

    /// Requests for every analysis that needs the backend.
    pub fn collect_requests(&mut self, ppi: i32, image_background: &str) -> Vec<Value> {
        self.analyses
            .iter_mut()
            .filter(|a| {
                matches!(
                    a.status(),
                    Status::Empty
                        | Status::Aborting
                        | Status::SaveImg
                        | Status::EditImg
                        | Status::RewriteImgs
                )
            })
            .map(|a| a.create_analysis_request_json(ppi, image_background))
            .collect()
    }

    /// Applies an analysis reply. Script replies belong to forms and are
    /// not handled here.
    pub fn handle_reply(&mut self, reply: &EngineReply) -> bool {
        let Some(analysis) = self.get_mut(reply.analysis_id()) else {
            tracing::warn!("reply for unknown analysis {}", reply.analysis_id());
            return false;
        };

        match reply {
            EngineReply::Results {
                status,
                results,
                progress,
                ..
            } => {
                let status = Status::parse(status);
                if status == Status::Running {
                    let applied = analysis.callback(results.clone()) == CallbackOutcome::Applied;
                    if applied {
                        analysis.set_progress(progress.clone());
                    }
                    return applied;
                }
                // Stale replies for an analysis that was invalidated or aborted
                // in the meantime are dropped.
                if matches!(analysis.status(), Status::Empty | Status::Aborted) {
                    tracing::debug!("dropping stale results for analysis {}", analysis.id());
                    return false;
                }
                if analysis.last_perform() == Some(PerformType::RewriteImgs) {
                    analysis.images_rewritten(results.clone());
                    analysis.set_progress(progress.clone());
                } else {
                    analysis.set_results(results.clone(), progress.clone());
                }
                analysis.set_status(status);
                true
            }
            EngineReply::ImageSaved { results, .. } => {
                analysis.image_saved_handler(results.clone());
                analysis.set_status(Status::Complete);
                true
            }
            EngineReply::ImageEdited { results, .. } => {
                analysis.image_edited_handler(results.clone());
                analysis.set_status(Status::Complete);
                true
            }
            EngineReply::ScriptDone { .. } => false,
        }
    }

    pub fn to_document(&self) -> AnalysesDocument {
        AnalysesDocument::new(self.analyses.iter().map(Analysis::as_json).collect())
    }

    /// Replaces every analysis with those of `document`. Entries that cannot
    /// be restored are skipped and reported.
    pub fn load_document(&mut self, document: &AnalysesDocument) -> Vec<anyhow::Error> {
        self.clear();
        document
            .analyses
            .iter()
            .filter_map(|json| self.create_from_json(json).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::builtin;
    use serde_json::json;
    use tempfile::TempDir;

    fn analyses() -> (TempDir, Analyses) {
        let dir = TempDir::new().unwrap();
        let temp = Rc::new(TempFiles::new(dir.path()));
        (dir, Analyses::new(builtin::all(), temp))
    }

    #[test]
    fn create_and_remove() {
        let (_dir, mut analyses) = analyses();
        let first = analyses.create(builtin::COMMON, "R Code").unwrap();
        let second = analyses.create(builtin::COMMON, "Multinomial Test").unwrap();

        assert_ne!(first, second);
        assert_eq!(analyses.len(), 2);
        assert!(analyses.remove(first));
        assert!(!analyses.remove(first));
        assert_eq!(analyses.ids(), vec![second]);

        assert!(matches!(
            analyses.create(builtin::COMMON, "Nope"),
            Err(ModuleError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn removal_releases_computed_columns() {
        let (_dir, mut analyses) = analyses();
        let id = analyses.create(builtin::COMMON, "R Code").unwrap();
        analyses
            .get_mut(id)
            .unwrap()
            .with_options(|options| options.request_computed_column("computed"));

        analyses.remove(id);
        assert_eq!(analyses.take_released_columns(), vec!["computed"]);
        assert!(analyses.take_released_columns().is_empty());
    }

    #[test]
    fn reload_degrades_only_analyses_that_lost_their_entry() {
        let (_dir, mut analyses) = analyses();
        let kept = analyses.create(builtin::COMMON, "R Code").unwrap();
        let lost = analyses.create(builtin::COMMON, "Multinomial Test").unwrap();

        let mut module = builtin::common();
        module.entries.retain(|e| e.title != "Multinomial Test");

        assert_eq!(analyses.reload_module(module), vec![lost]);
        assert_eq!(analyses.get(lost).unwrap().status(), Status::FatalError);
        assert_eq!(analyses.get(kept).unwrap().status(), Status::Empty);
    }

    #[test]
    fn replies_update_results_and_status() {
        let (_dir, mut analyses) = analyses();
        let id = analyses.create(builtin::COMMON, "R Code").unwrap();
        let requests = analyses.collect_requests(96, "white");
        assert_eq!(requests.len(), 1);
        assert!(analyses.collect_requests(96, "white").is_empty());

        let interim = EngineReply::Results {
            analysis_id: id,
            status: "running".into(),
            results: json!({"partial": true}),
            progress: Value::Null,
        };
        assert!(analyses.handle_reply(&interim));

        let done = EngineReply::Results {
            analysis_id: id,
            status: "complete".into(),
            results: json!({"table": 1}),
            progress: json!(100),
        };
        assert!(analyses.handle_reply(&done));
        let analysis = analyses.get(id).unwrap();
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(analysis.results(), &json!({"table": 1}));
    }

    #[test]
    fn interim_replies_carry_progress() {
        let (_dir, mut analyses) = analyses();
        let id = analyses.create(builtin::COMMON, "R Code").unwrap();
        analyses.collect_requests(96, "white");

        let interim = EngineReply::Results {
            analysis_id: id,
            status: "running".into(),
            results: json!({"partial": true}),
            progress: json!(40),
        };
        assert!(analyses.handle_reply(&interim));

        let analysis = analyses.get(id).unwrap();
        assert_eq!(analysis.progress(), &json!(40));
        assert_eq!(analysis.results(), &json!({"partial": true}));
        assert_eq!(analysis.status(), Status::Running);
    }

    #[test]
    fn rewrite_replies_replace_figures() {
        let (_dir, mut analyses) = analyses();
        let id = analyses.create(builtin::COMMON, "R Code").unwrap();
        analyses.collect_requests(96, "white");
        analyses.handle_reply(&EngineReply::Results {
            analysis_id: id,
            status: "complete".into(),
            results: json!({"plot": "old.png"}),
            progress: Value::Null,
        });

        analyses.get_mut(id).unwrap().rewrite_images();
        let requests = analyses.collect_requests(96, "white");
        assert_eq!(requests[0]["perform"], "rewriteImgs");

        let changes = Rc::new(std::cell::Cell::new(0));
        let counter = changes.clone();
        analyses
            .get_mut(id)
            .unwrap()
            .results_changed
            .connect(move |_: &usize| counter.set(counter.get() + 1));

        assert!(analyses.handle_reply(&EngineReply::Results {
            analysis_id: id,
            status: "complete".into(),
            results: json!({"plot": "new.png"}),
            progress: Value::Null,
        }));

        let analysis = analyses.get(id).unwrap();
        assert_eq!(analysis.last_perform(), Some(PerformType::RewriteImgs));
        assert_eq!(analysis.results(), &json!({"plot": "new.png"}));
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn document_round_trip() {
        let (_dir, mut analyses) = analyses();
        let id = analyses.create(builtin::COMMON, "R Code").unwrap();
        {
            let analysis = analyses.get_mut(id).unwrap();
            analysis.set_title("Mine");
            analysis.initialized(false);
        }

        let document = analyses.to_document();
        let (_dir2, mut restored) = self::analyses();
        let errors = restored.load_document(&document);

        assert!(errors.is_empty());
        let analysis = restored.get(id).unwrap();
        assert_eq!(analysis.title(), "Mine");
        assert_eq!(analysis.status(), Status::Complete);
        assert!(analysis.is_dynamic_module());
    }

    #[test]
    fn unknown_modules_in_documents_are_reported() {
        let (_dir, mut analyses) = analyses();
        let document = AnalysesDocument::new(vec![
            json!({"id": 4, "dynamicModule": {"moduleName": "Gone", "analysisEntry": "x"}}),
            json!({"id": 5, "name": "Descriptives", "module": "Common", "title": "Descriptives"}),
            json!(3),
        ]);

        let errors = analyses.load_document(&document);
        assert_eq!(errors.len(), 2);
        assert_eq!(analyses.ids(), vec![5]);
    }
}
