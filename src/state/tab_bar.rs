// src/state/tab_bar.rs
use crate::config::{ModuleToggle, Settings};
use crate::signal::Signal;

/// Exclusive-selection strip of named tabs plus the help menu state.
#[derive(Debug)]
pub struct TabBar {
    tabs: Vec<String>,
    current: Option<usize>,
    current_active_tab: String,
    enabled_modules: Vec<ModuleToggle>,
    help_visible: bool,
    pub about_open: bool,
    pub preferences_open: bool,
    pub current_changed: Signal<usize>,
    pub help_toggled: Signal<bool>,
    pub exact_p_values_changed: Signal<bool>,
    pub fix_decimals_changed: Signal<String>,
    pub empty_values_changed: Signal<Vec<String>>,
}

impl TabBar {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            current: None,
            current_active_tab: String::new(),
            enabled_modules: Vec::new(),
            help_visible: false,
            about_open: false,
            preferences_open: false,
            current_changed: Signal::new(),
            help_toggled: Signal::new(),
            exact_p_values_changed: Signal::new(),
            fix_decimals_changed: Signal::new(),
            empty_values_changed: Signal::new(),
        }
    }

    /// Adds a tab for every module switched on in `settings`. The first tab
    /// stays selected.
    pub fn init(&mut self, settings: &Settings) {
        let selected = self.current;
        for module in ModuleToggle::ALL {
            if module.is_available() && settings.module_enabled(module) {
                self.enabled_modules.push(module);
                self.add_tab(module.tab_name());
            }
        }
        if let Some(index) = selected {
            self.set_current_index(index);
        }
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn count(&self) -> usize {
        self.tabs.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_tab(&self) -> Option<&str> {
        self.current.and_then(|i| self.tabs.get(i)).map(String::as_str)
    }

    pub fn current_active_tab(&self) -> &str {
        &self.current_active_tab
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab == name)
    }

    /// Appends and selects `name`. An existing tab is left alone and the
    /// selection does not move.
    pub fn add_tab(&mut self, name: &str) {
        if self.index_of(name).is_some() {
            return;
        }
        self.tabs.push(name.to_string());
        self.set_current_index(self.tabs.len() - 1);
    }

    /// Removes the tab without changing the selection, except to keep the
    /// index in bounds.
    pub fn remove_tab_at(&mut self, index: usize) {
        if index >= self.tabs.len() {
            return;
        }
        self.tabs.remove(index);
        self.current = match self.current {
            Some(current) if current > index => Some(current - 1),
            Some(current) if current == index => None,
            other => other,
        };
    }

    /// Removes the named tab and selects the tab before it.
    pub fn remove_tab(&mut self, name: &str) {
        let Some(index) = self.index_of(name) else {
            return;
        };
        self.tabs.remove(index);
        if self.tabs.is_empty() {
            self.current = None;
            self.current_active_tab.clear();
        } else {
            self.set_current_index(index.saturating_sub(1));
        }
    }

    pub fn set_current_index(&mut self, index: usize) {
        let Some(name) = self.tabs.get(index) else {
            return;
        };
        self.current_active_tab = name.clone();
        self.current = Some(index);
        self.current_changed.emit(&index);
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn toggle_help(&mut self) {
        self.help_visible = !self.help_visible;
        let visible = self.help_visible;
        self.help_toggled.emit(&visible);
    }

    pub fn module_enabled(&self, module: ModuleToggle) -> bool {
        self.enabled_modules.contains(&module)
    }

    /// Flips the module's tab on or off and records the choice in `settings`.
    /// Returns the new state.
    pub fn toggle_module(&mut self, module: ModuleToggle, settings: &mut Settings) -> bool {
        let enabled = !self.module_enabled(module);
        if enabled {
            self.enabled_modules.push(module);
            self.add_tab(module.tab_name());
        } else {
            self.enabled_modules.retain(|m| *m != module);
            self.remove_tab(module.tab_name());
        }
        settings.set_module_enabled(module, enabled);
        enabled
    }

    pub fn set_exact_p_values(&mut self, exact: bool) {
        self.exact_p_values_changed.emit(&exact);
    }

    pub fn set_fix_decimals(&mut self, num_decimals: &str) {
        self.fix_decimals_changed.emit(&num_decimals.to_string());
    }

    pub fn set_empty_values(&mut self, values: Vec<String>) {
        self.empty_values_changed.emit(&values);
    }
}

impl Default for TabBar {
    fn default() -> Self {
        Self::new()
    }
}
