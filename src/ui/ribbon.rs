// src/ui/ribbon.rs
use eframe::egui;

use crate::state::AppState;

/// Analysis buttons of the module behind the current tab.
pub fn show_ribbon(ui: &mut egui::Ui, state: &mut AppState) {
    let Some(tab) = state.tab_bar.current_tab().map(str::to_string) else {
        return;
    };
    let Some(module) = state.analyses.module(&tab) else {
        ui.weak(format!("Module {} is not loaded", tab));
        return;
    };

    let mut requested = None;
    ui.horizontal(|ui| {
        for (group, entries) in module.ribbon_groups() {
            if let [entry] = entries.as_slice() {
                if ui.button(&entry.title).clicked() {
                    requested = Some(entry.title.clone());
                }
                continue;
            }
            ui.menu_button(&group, |ui| {
                for entry in entries {
                    if ui.button(&entry.title).clicked() {
                        requested = Some(entry.title.clone());
                        ui.close_menu();
                    }
                }
            });
        }
    });

    if let Some(title) = requested {
        if let Err(e) = state.create_analysis(&tab, &title) {
            state.error_message = Some(e.to_string());
        }
    }
}
