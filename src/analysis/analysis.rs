// src/analysis/analysis.rs
use serde_json::{json, Value};
use std::rc::Rc;

use super::status::Status;
use crate::engine::{EngineState, PerformType};
use crate::file::TempFiles;
use crate::modules::{AnalysisEntry, DynamicModule};
use crate::options::{OptionEvent, OptionValue, Options};
use crate::signal::Signal;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Answer to an interim results callback from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Applied,
    Rejected,
}

impl CallbackOutcome {
    pub fn code(&self) -> i32 {
        match self {
            CallbackOutcome::Applied => 0,
            CallbackOutcome::Rejected => 1,
        }
    }
}

/// One analysis: its options, its status and the last results the
/// backend produced for it.
pub struct Analysis {
    id: usize,
    module: String,
    name: String,
    title: String,
    title_default: String,
    rfile: String,
    version: String,
    status: Status,
    revision: u32,
    refresh_blocked: bool,
    options: Options,
    options_from_jasp_file: Value,
    results: Value,
    progress: Value,
    img_results: Value,
    save_img_options: Value,
    user_data: Value,
    module_data: Option<AnalysisEntry>,
    coded_reference: String,
    help_folder: Option<String>,
    help_file: String,
    uses_jasp_results: bool,
    columns_created: Vec<String>,
    form_refresh_requested: bool,
    last_perform: Option<PerformType>,
    temp_files: Rc<TempFiles>,

    pub results_changed: Signal<usize>,
    pub progress_changed: Signal<usize>,
    pub options_changed: Signal<usize>,
    pub to_refresh: Signal<usize>,
    pub save_image_requested: Signal<usize>,
    pub edit_image_requested: Signal<usize>,
    pub rewrite_images_requested: Signal<usize>,
    pub image_saved: Signal<usize>,
    pub image_edited: Signal<usize>,
    pub title_changed: Signal<String>,
    pub computed_column_requested: Signal<String>,
    pub column_requested: Signal<(String, i32)>,
    pub computed_column_destruction_requested: Signal<String>,
}

impl Analysis {
    fn blank(id: usize, name: &str, title: &str, temp_files: Rc<TempFiles>) -> Self {
        Self {
            id,
            module: String::new(),
            name: name.to_string(),
            title: title.to_string(),
            title_default: title.to_string(),
            rfile: String::new(),
            version: APP_VERSION.to_string(),
            status: Status::Empty,
            revision: 0,
            refresh_blocked: false,
            options: Options::new(),
            options_from_jasp_file: Value::Null,
            results: Value::Null,
            progress: Value::Null,
            img_results: Value::Null,
            save_img_options: Value::Null,
            user_data: Value::Null,
            module_data: None,
            coded_reference: String::new(),
            help_folder: None,
            help_file: String::new(),
            uses_jasp_results: true,
            columns_created: Vec::new(),
            form_refresh_requested: false,
            last_perform: None,
            temp_files,
            results_changed: Signal::new(),
            progress_changed: Signal::new(),
            options_changed: Signal::new(),
            to_refresh: Signal::new(),
            save_image_requested: Signal::new(),
            edit_image_requested: Signal::new(),
            rewrite_images_requested: Signal::new(),
            image_saved: Signal::new(),
            image_edited: Signal::new(),
            title_changed: Signal::new(),
            computed_column_requested: Signal::new(),
            column_requested: Signal::new(),
            computed_column_destruction_requested: Signal::new(),
        }
    }

    /// An analysis of a built-in (non dynamic) module.
    pub fn new(
        id: usize,
        module: &str,
        name: &str,
        title: &str,
        version: &str,
        data: Option<Value>,
        temp_files: Rc<TempFiles>,
    ) -> Self {
        let mut analysis = Self::blank(id, name, title, temp_files);
        analysis.module = module.to_string();
        analysis.version = version.to_string();
        analysis.options_from_jasp_file = data.unwrap_or(Value::Null);
        analysis.help_file = format!("analyses/{}", name);
        analysis
    }

    /// An analysis created from a module's analysis entry.
    pub fn from_entry(
        id: usize,
        entry: &AnalysisEntry,
        module: &DynamicModule,
        title: &str,
        data: Option<Value>,
        temp_files: Rc<TempFiles>,
    ) -> Self {
        let title = if title.is_empty() { entry.title.as_str() } else { title };
        let mut analysis = Self::blank(id, &entry.title, &entry.title, temp_files);
        analysis.title = title.to_string();
        analysis.module = entry.module.clone();
        analysis.uses_jasp_results = entry.uses_jasp_results;
        analysis.options_from_jasp_file = data.unwrap_or(Value::Null);
        analysis.coded_reference = entry.coded_reference();
        analysis.module_data = Some(entry.clone());
        analysis.help_folder = Some(module.help_folder_path());
        analysis.help_file = format!("{}{}", module.help_folder_path(), entry.title);
        analysis
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_default(&self) -> &str {
        &self.title_default
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn rfile(&self) -> &str {
        &self.rfile
    }

    pub fn results(&self) -> &Value {
        &self.results
    }

    pub fn progress(&self) -> &Value {
        &self.progress
    }

    pub fn img_results(&self) -> &Value {
        &self.img_results
    }

    pub fn save_img_options(&self) -> &Value {
        &self.save_img_options
    }

    pub fn user_data(&self) -> &Value {
        &self.user_data
    }

    pub fn uses_jasp_results(&self) -> bool {
        self.uses_jasp_results
    }

    pub fn set_uses_jasp_results(&mut self, uses: bool) {
        self.uses_jasp_results = uses;
    }

    pub fn module_data(&self) -> Option<&AnalysisEntry> {
        self.module_data.as_ref()
    }

    pub fn is_dynamic_module(&self) -> bool {
        self.module_data.is_some()
    }

    pub fn columns_created(&self) -> &[String] {
        &self.columns_created
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_from_jasp_file(&self) -> &Value {
        &self.options_from_jasp_file
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, Status::Aborting | Status::Aborted)
    }

    pub fn help_file(&self) -> &str {
        &self.help_file
    }

    pub fn full_help_path(&self, help_file_name: &str) -> String {
        match &self.help_folder {
            Some(folder) => format!("{}{}", folder, help_file_name),
            None => format!("analyses/{}", help_file_name),
        }
    }

    /// Entering Running or Initializing with results from another version
    /// purges this analysis' temp artifacts first.
    pub fn set_status(&mut self, status: Status) {
        if matches!(status, Status::Running | Status::Initializing) && self.version != APP_VERSION {
            let files = self.temp_files.retrieve_list(self.id);
            let deleted = self.temp_files.delete_list(&files);
            tracing::info!(
                "analysis {} was made with version {}, purged {} temp files",
                self.id,
                self.version,
                deleted
            );
            self.version = APP_VERSION.to_string();
        }
        self.status = status;
    }

    /// Called once the form is bound.
    pub fn initialized(&mut self, is_new_analysis: bool) {
        self.status = if is_new_analysis {
            Status::Empty
        } else {
            Status::Complete
        };
    }

    pub fn desired_perform_type(&self) -> PerformType {
        match self.status {
            Status::Empty if self.uses_jasp_results => PerformType::Run,
            Status::Empty => PerformType::Init,
            Status::SaveImg => PerformType::SaveImg,
            Status::EditImg => PerformType::EditImg,
            Status::RewriteImgs => PerformType::RewriteImgs,
            Status::Aborting => PerformType::Abort,
            _ => PerformType::Run,
        }
    }

    /// Builds the next job request and moves the status along. Calling it
    /// twice before the backend consumes the request yields two different
    /// requests.
    pub fn create_analysis_request_json(&mut self, ppi: i32, image_background: &str) -> Value {
        let perform = self.desired_perform_type();
        self.last_perform = Some(perform);

        match perform {
            PerformType::Init => self.set_status(Status::Initializing),
            PerformType::Abort => self.set_status(Status::Aborted),
            PerformType::Run
            | PerformType::SaveImg
            | PerformType::EditImg
            | PerformType::RewriteImgs => self.set_status(Status::Running),
        }

        let rfile = match self.module_data {
            Some(_) => "",
            None => self.rfile.as_str(),
        };
        let dynamic_module_call = self
            .module_data
            .as_ref()
            .map(AnalysisEntry::full_r_call)
            .unwrap_or_default();

        let mut request = json!({
            "typeRequest": EngineState::Analysis.as_str(),
            "id": self.id,
            "perform": perform.as_str(),
            "revision": self.revision,
            "rfile": rfile,
            "jaspResults": self.uses_jasp_results,
            "dynamicModuleCall": dynamic_module_call,
        });

        if !self.is_aborted() {
            request["name"] = json!(self.name);
            request["title"] = json!(self.title);
            request["ppi"] = json!(ppi);
            request["imageBackground"] = json!(image_background);

            if matches!(perform, PerformType::SaveImg | PerformType::EditImg) {
                request["image"] = self.save_img_options.clone();
            } else {
                request["options"] = self.current_options_json();
            }
        }

        request
    }

    /// The live tree, or the options read from a saved file while no form
    /// has populated the tree yet.
    fn current_options_json(&self) -> Value {
        if self.options.is_empty() && !self.options_from_jasp_file.is_null() {
            self.options_from_jasp_file.clone()
        } else {
            self.options.as_json()
        }
    }

    /// The perform type of the last request sent to the backend.
    pub fn last_perform(&self) -> Option<PerformType> {
        self.last_perform
    }

    pub fn set_progress(&mut self, progress: Value) {
        if self.progress == progress {
            return;
        }
        self.progress = progress;
        self.progress_changed.emit(&self.id);
    }

    pub fn set_results(&mut self, results: Value, progress: Value) {
        self.results = results;
        self.progress = progress;
        self.results_changed.emit(&self.id);
    }

    pub fn image_saved_handler(&mut self, results: Value) {
        self.img_results = results;
        self.image_saved.emit(&self.id);
    }

    pub fn image_edited_handler(&mut self, results: Value) {
        self.img_results = results;
        self.image_edited.emit(&self.id);
    }

    pub fn refresh(&mut self) {
        self.set_status(Status::Empty);
        self.revision += 1;
        self.temp_files.delete_all(self.id);
        self.form_refresh_requested = true;
        self.to_refresh.emit(&self.id);
    }

    /// True once after `refresh`, telling the form to rebuild its table
    /// view models.
    pub fn take_form_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.form_refresh_requested)
    }

    pub fn abort(&mut self) {
        self.set_status(Status::Aborting);
        self.options_changed.emit(&self.id);
    }

    pub fn save_image(&mut self, options: Value) {
        self.set_status(Status::SaveImg);
        self.save_img_options = options;
        self.save_image_requested.emit(&self.id);
    }

    pub fn edit_image(&mut self, options: Value) {
        self.set_status(Status::EditImg);
        self.save_img_options = options;
        self.edit_image_requested.emit(&self.id);
    }

    pub fn rewrite_images(&mut self) {
        self.set_status(Status::RewriteImgs);
        self.rewrite_images_requested.emit(&self.id);
    }

    /// Results of a rewrite-images request: same tables, new figures.
    pub fn images_rewritten(&mut self, results: Value) {
        if !results.is_null() {
            self.results = results;
        }
        self.results_changed.emit(&self.id);
    }

    /// Interim results. Rejected while the analysis is Empty or Aborted.
    pub fn callback(&mut self, results: Value) -> CallbackOutcome {
        if matches!(self.status, Status::Empty | Status::Aborted) {
            return CallbackOutcome::Rejected;
        }
        if !results.is_null() {
            self.results = results;
            self.results_changed.emit(&self.id);
        }
        CallbackOutcome::Applied
    }

    pub fn set_refresh_blocked(&mut self, blocked: bool) {
        self.refresh_blocked = blocked;
    }

    pub fn refresh_blocked(&self) -> bool {
        self.refresh_blocked
    }

    pub fn options_changed_handler(&mut self) {
        if self.refresh_blocked {
            return;
        }
        self.status = Status::Empty;
        self.revision += 1;
        self.options_changed.emit(&self.id);
    }

    /// Runs `f` against the options tree, then reacts to what it recorded.
    pub fn with_options<R>(&mut self, f: impl FnOnce(&mut Options) -> R) -> R {
        let result = f(&mut self.options);
        self.process_option_events();
        result
    }

    pub fn set_option(&mut self, name: &str, value: OptionValue) -> bool {
        self.with_options(|options| options.set(name, value))
    }

    /// Writes many options with a single invalidation at the end.
    pub fn set_options_batch(&mut self, values: Vec<(String, OptionValue)>) {
        let was_blocked = self.refresh_blocked;
        self.refresh_blocked = true;
        let changed = self.with_options(|options| {
            values
                .into_iter()
                .fold(false, |changed, (name, value)| options.set(&name, value) || changed)
        });
        self.refresh_blocked = was_blocked;
        if changed {
            self.options_changed_handler();
        }
    }

    fn process_option_events(&mut self) {
        let mut changed = false;
        for event in self.options.take_events() {
            match event {
                OptionEvent::Changed(_) => changed = true,
                OptionEvent::ComputedColumnRequested(name) => {
                    tracing::info!("analysis {} requests computed column {}", self.id, name);
                    if !self.columns_created.contains(&name) {
                        self.columns_created.push(name.clone());
                    }
                    self.computed_column_requested.emit(&name);
                }
                OptionEvent::ColumnRequested { name, column_type } => {
                    tracing::info!("analysis {} requests column {} ({})", self.id, name, column_type);
                    self.column_requested.emit(&(name, column_type));
                }
                OptionEvent::ComputedColumnDestructionRequested(name) => {
                    tracing::info!("analysis {} releases computed column {}", self.id, name);
                    self.columns_created.retain(|c| *c != name);
                    self.computed_column_destruction_requested.emit(&name);
                }
            }
        }
        if changed {
            self.options_changed_handler();
        }
    }

    pub fn set_title(&mut self, title: &str) {
        let mut stripped = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if stripped.is_empty() {
            stripped = self.title_default.clone();
        }

        if self.title == stripped && stripped == title {
            return;
        }

        let results_is_null = self.results.is_null();
        match self.results.as_object_mut() {
            Some(results) => {
                results.insert("title".to_string(), json!(stripped));
            }
            None if results_is_null => self.results = json!({ "title": stripped }),
            None => {}
        }
        self.title = stripped;
        self.title_changed.emit(&self.title);
    }

    pub fn as_json(&self) -> Value {
        let mut json = json!({
            "id": self.id,
            "name": self.name,
            "title": self.title,
            "titleDef": self.title_default,
            "rfile": self.rfile,
            "module": self.module,
            "progress": self.progress,
            "version": self.version,
            "results": self.results,
            "status": self.status.as_str(),
            "options": self.current_options_json(),
            "userdata": self.user_data,
        });

        if let Some(entry) = &self.module_data {
            json["dynamicModule"] = entry.as_json_for_jasp_file();
        }

        json
    }

    pub fn load_extra_from_json(&mut self, json: &Value) {
        if let Some(title_default) = json.get("titleDef").and_then(Value::as_str) {
            self.title_default = title_default.to_string();
        }
    }

    /// Restores the fields of a saved analysis document that are not part of
    /// the constructor.
    pub fn load_saved_state(&mut self, json: &Value) {
        if let Some(status) = json.get("status").and_then(Value::as_str) {
            self.status = Status::parse(status);
        }
        if let Some(version) = json.get("version").and_then(Value::as_str) {
            self.version = version.to_string();
        }
        if let Some(rfile) = json.get("rfile").and_then(Value::as_str) {
            self.rfile = rfile.to_string();
        }
        self.results = json.get("results").cloned().unwrap_or(Value::Null);
        self.progress = json.get("progress").cloned().unwrap_or(Value::Null);
        self.user_data = json.get("userdata").cloned().unwrap_or(Value::Null);
        self.load_extra_from_json(json);
    }

    /// Re-resolves the analysis entry after its module was reloaded.
    pub fn check_analysis_entry(&mut self, module: &DynamicModule) -> bool {
        if self.coded_reference.is_empty() {
            return true;
        }

        match module.retrieve_corresponding_analysis_entry(&self.coded_reference) {
            Ok(entry) => {
                self.module_data = Some(entry);
                true
            }
            Err(e) => {
                tracing::warn!("analysis {} lost its entry: {}", self.id, e);
                false
            }
        }
    }
}

impl Drop for Analysis {
    fn drop(&mut self) {
        for column in std::mem::take(&mut self.columns_created) {
            self.computed_column_destruction_requested.emit(&column);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn temp_files() -> (TempDir, Rc<TempFiles>) {
        let dir = TempDir::new().unwrap();
        let files = Rc::new(TempFiles::new(dir.path()));
        (dir, files)
    }

    fn legacy(version: &str, files: Rc<TempFiles>) -> Analysis {
        let mut analysis = Analysis::new(1, "Common", "Descriptives", "Descriptives", version, None, files);
        analysis.set_uses_jasp_results(false);
        analysis
    }

    #[test]
    fn running_with_old_version_purges_temp_files() {
        let (_dir, files) = temp_files();
        files.create_file(1, "plot.png").unwrap();
        let mut analysis = legacy("0.1.0-old", files.clone());

        analysis.set_status(Status::Complete);
        assert_eq!(files.retrieve_list(1).len(), 1);

        analysis.set_status(Status::Running);
        assert!(files.retrieve_list(1).is_empty());
        assert_eq!(analysis.version(), APP_VERSION);
    }

    #[test]
    fn same_version_never_purges() {
        let (_dir, files) = temp_files();
        files.create_file(1, "plot.png").unwrap();
        let mut analysis = legacy(APP_VERSION, files.clone());

        analysis.set_status(Status::Running);
        analysis.set_status(Status::Initializing);
        assert_eq!(files.retrieve_list(1).len(), 1);
    }

    #[test]
    fn legacy_empty_analysis_requests_init() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.set_option("x", OptionValue::Boolean(true));

        let request = analysis.create_analysis_request_json(96, "white");

        assert_eq!(request["perform"], "init");
        assert_eq!(request["typeRequest"], "analysis");
        assert_eq!(request["ppi"], 96);
        assert_eq!(request["options"], json!({"x": true}));
        assert_eq!(analysis.status(), Status::Initializing);

        let second = analysis.create_analysis_request_json(96, "white");
        assert_eq!(second["perform"], "run");
        assert_eq!(analysis.status(), Status::Running);
    }

    #[test]
    fn modern_empty_analysis_requests_run() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.set_uses_jasp_results(true);

        let request = analysis.create_analysis_request_json(72, "transparent");
        assert_eq!(request["perform"], "run");
        assert_eq!(analysis.status(), Status::Running);
    }

    #[test]
    fn abort_request_omits_payload() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.abort();
        assert_eq!(analysis.status(), Status::Aborting);

        let request = analysis.create_analysis_request_json(96, "white");
        assert_eq!(request["perform"], "abort");
        assert_eq!(analysis.status(), Status::Aborted);
        assert!(request.get("options").is_none());
        assert!(request.get("name").is_none());
    }

    #[test]
    fn image_requests_carry_image_options() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.save_image(json!({"type": "png"}));

        let request = analysis.create_analysis_request_json(96, "white");
        assert_eq!(request["perform"], "saveImg");
        assert_eq!(request["image"], json!({"type": "png"}));
        assert!(request.get("options").is_none());
    }

    #[test]
    fn saved_options_are_used_until_the_form_binds() {
        let (_dir, files) = temp_files();
        let mut analysis = Analysis::new(
            2,
            "Common",
            "Descriptives",
            "Descriptives",
            APP_VERSION,
            Some(json!({"variables": ["a"]})),
            files,
        );

        let request = analysis.create_analysis_request_json(96, "white");
        assert_eq!(request["options"], json!({"variables": ["a"]}));
    }

    #[test]
    fn option_changes_invalidate_unless_blocked() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.initialized(false);
        assert_eq!(analysis.status(), Status::Complete);

        assert!(analysis.set_option("x", OptionValue::Integer(1)));
        assert_eq!(analysis.status(), Status::Empty);
        assert_eq!(analysis.revision(), 1);

        assert!(!analysis.set_option("x", OptionValue::Integer(1)));
        assert_eq!(analysis.revision(), 1);

        analysis.set_status(Status::Complete);
        analysis.set_refresh_blocked(true);
        analysis.set_option("x", OptionValue::Integer(2));
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(analysis.revision(), 1);
    }

    #[test]
    fn batch_writes_invalidate_once() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.set_options_batch(vec![
            ("a".into(), OptionValue::Integer(1)),
            ("b".into(), OptionValue::Integer(2)),
        ]);
        assert_eq!(analysis.revision(), 1);
        assert!(!analysis.refresh_blocked());
    }

    #[test]
    fn callback_is_rejected_while_empty_or_aborted() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);

        assert_eq!(analysis.callback(json!({"a": 1})), CallbackOutcome::Rejected);
        assert_eq!(analysis.results(), &Value::Null);

        analysis.set_status(Status::Running);
        assert_eq!(analysis.callback(json!({"a": 1})).code(), 0);
        assert_eq!(analysis.results(), &json!({"a": 1}));

        analysis.set_status(Status::Aborted);
        assert_eq!(analysis.callback(json!({"a": 2})).code(), 1);
    }

    #[test]
    fn refresh_bumps_revision_and_purges() {
        let (_dir, files) = temp_files();
        files.create_file(1, "state.rds").unwrap();
        let mut analysis = legacy(APP_VERSION, files.clone());
        analysis.set_status(Status::Complete);

        analysis.refresh();

        assert_eq!(analysis.status(), Status::Empty);
        assert_eq!(analysis.revision(), 1);
        assert!(files.retrieve_list(1).is_empty());
        assert!(analysis.take_form_refresh_request());
        assert!(!analysis.take_form_refresh_request());
    }

    #[test]
    fn dropping_releases_computed_columns() {
        let (_dir, files) = temp_files();
        let released = Rc::new(RefCell::new(Vec::new()));
        {
            let mut analysis = legacy(APP_VERSION, files);
            let sink = released.clone();
            analysis
                .computed_column_destruction_requested
                .connect(move |name: &String| sink.borrow_mut().push(name.clone()));

            analysis.with_options(|options| {
                options.request_computed_column("score");
                options.request_computed_column("residual");
            });
            assert_eq!(analysis.columns_created(), &["score", "residual"]);
        }
        assert_eq!(*released.borrow(), vec!["score", "residual"]);
    }

    #[test]
    fn title_is_simplified_and_mirrored_into_results() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);

        analysis.set_title("  My   analysis ");
        assert_eq!(analysis.title(), "My analysis");
        assert_eq!(analysis.results()["title"], "My analysis");

        analysis.set_title("   ");
        assert_eq!(analysis.title(), "Descriptives");
    }

    #[test]
    fn document_has_every_field() {
        let (_dir, files) = temp_files();
        let mut analysis = legacy(APP_VERSION, files);
        analysis.load_extra_from_json(&json!({"titleDef": "Default"}));
        analysis.abort();

        let json = analysis.as_json();
        for key in [
            "id", "name", "title", "titleDef", "rfile", "module", "progress", "version",
            "results", "status", "options", "userdata",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["titleDef"], "Default");
        assert_eq!(json["status"], "fatalError");
        assert!(json.get("dynamicModule").is_none());
    }

    #[test]
    fn entry_lookup_after_reload() {
        let (_dir, files) = temp_files();
        let mut module = crate::modules::builtin::common();
        let entry = module.entries[0].clone();
        let mut analysis = Analysis::from_entry(5, &entry, &module, "", None, files);

        assert_eq!(analysis.title(), entry.title);
        assert!(analysis.is_dynamic_module());
        assert!(analysis.full_help_path("x.md").starts_with(&module.help_folder_path()));
        assert!(analysis.check_analysis_entry(&module));

        module.entries.clear();
        assert!(!analysis.check_analysis_entry(&module));

        let request = analysis.create_analysis_request_json(96, "white");
        assert_eq!(request["dynamicModuleCall"], entry.full_r_call());
        assert_eq!(request["rfile"], "");
    }
}
