// src/config/settings.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Optional modules that can be shown as tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleToggle {
    Sem,
    ReinforcementLearning,
    SummaryStats,
    NetworkAnalysis,
}

impl ModuleToggle {
    pub const ALL: [ModuleToggle; 4] = [
        ModuleToggle::Sem,
        ModuleToggle::ReinforcementLearning,
        ModuleToggle::SummaryStats,
        ModuleToggle::NetworkAnalysis,
    ];

    /// Label in the modules menu.
    pub fn label(&self) -> &'static str {
        match self {
            ModuleToggle::Sem => "SEM",
            ModuleToggle::ReinforcementLearning => "Reinforcement Learning",
            ModuleToggle::SummaryStats => "Summary Stats",
            ModuleToggle::NetworkAnalysis => "Network Analysis",
        }
    }

    /// Name of the tab (and module) the toggle shows.
    pub fn tab_name(&self) -> &'static str {
        match self {
            ModuleToggle::Sem => crate::modules::builtin::SEM,
            ModuleToggle::ReinforcementLearning => crate::modules::builtin::REINFORCEMENT_LEARNING,
            ModuleToggle::SummaryStats => crate::modules::builtin::SUMMARY_STATS,
            ModuleToggle::NetworkAnalysis => crate::modules::builtin::NETWORK_ANALYSIS,
        }
    }

    /// Development-only modules are hidden from release builds.
    pub fn is_available(&self) -> bool {
        match self {
            ModuleToggle::ReinforcementLearning => cfg!(debug_assertions),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sem_plugin: bool,
    pub r11t_learn_toolbox: bool,
    pub summary_statistics_toolbox: bool,
    pub network_analysis_plugin: bool,
    pub exact_p_values: bool,
    pub fix_decimals: bool,
    pub num_decimals: u32,
    pub empty_values: Vec<String>,
    pub ppi: i32,
    pub image_background: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sem_plugin: false,
            r11t_learn_toolbox: false,
            summary_statistics_toolbox: false,
            network_analysis_plugin: false,
            exact_p_values: false,
            fix_decimals: false,
            num_decimals: 3,
            empty_values: vec!["NaN".to_string(), "nan".to_string(), ".".to_string()],
            ppi: 96,
            image_background: "white".to_string(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("statdesk").join("settings.ron"))
    }

    /// Reads `path` (if it exists) and applies `STATDESK_*` environment
    /// overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("STATDESK"))
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }

    /// Like `load`, but falls back to defaults and logs the failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{:#}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .context("Failed to serialize settings")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    pub fn module_enabled(&self, module: ModuleToggle) -> bool {
        match module {
            ModuleToggle::Sem => self.sem_plugin,
            ModuleToggle::ReinforcementLearning => self.r11t_learn_toolbox,
            ModuleToggle::SummaryStats => self.summary_statistics_toolbox,
            ModuleToggle::NetworkAnalysis => self.network_analysis_plugin,
        }
    }

    pub fn set_module_enabled(&mut self, module: ModuleToggle, enabled: bool) {
        let flag = match module {
            ModuleToggle::Sem => &mut self.sem_plugin,
            ModuleToggle::ReinforcementLearning => &mut self.r11t_learn_toolbox,
            ModuleToggle::SummaryStats => &mut self.summary_statistics_toolbox,
            ModuleToggle::NetworkAnalysis => &mut self.network_analysis_plugin,
        };
        *flag = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(settings.num_decimals, 3);
        assert!(!settings.sem_plugin);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.ron");

        let mut settings = Settings::default();
        settings.set_module_enabled(ModuleToggle::NetworkAnalysis, true);
        settings.exact_p_values = true;
        settings.num_decimals = 5;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(loaded.module_enabled(ModuleToggle::NetworkAnalysis));
        assert!(!loaded.module_enabled(ModuleToggle::Sem));
        assert!(loaded.exact_p_values);
        assert_eq!(loaded.num_decimals, 5);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        fs::write(&path, "(this is not ron").unwrap();

        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(Some(&path)), Settings::default());
    }
}
