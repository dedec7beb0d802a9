// src/ui/tab_bar.rs
use eframe::egui;

use crate::config::ModuleToggle;
use crate::state::AppState;

pub fn show_tab_bar(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        let mut clicked = None;
        for (index, name) in state.tab_bar.tabs().iter().enumerate() {
            let selected = state.tab_bar.current_index() == Some(index);
            if ui.selectable_label(selected, name).clicked() {
                clicked = Some(index);
            }
        }
        if let Some(index) = clicked {
            state.tab_bar.set_current_index(index);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.menu_button("☰", |ui| {
                if ui.button("About").clicked() {
                    state.tab_bar.about_open = true;
                    ui.close_menu();
                }

                let mut help = state.tab_bar.help_visible();
                if ui.checkbox(&mut help, "Special Help").clicked() {
                    state.tab_bar.toggle_help();
                }

                if ui.button("Preferences").clicked() {
                    state.tab_bar.preferences_open = true;
                    ui.close_menu();
                }

                ui.separator();
                ui.label("Modules");
                for module in ModuleToggle::ALL {
                    if !module.is_available() {
                        continue;
                    }
                    let mut enabled = state.tab_bar.module_enabled(module);
                    if ui.checkbox(&mut enabled, module.label()).clicked() {
                        state.toggle_module(module);
                    }
                }
            });
        });
    });
}
