// src/ui/preferences.rs
use eframe::egui;

use crate::analysis::APP_VERSION;
use crate::state::AppState;

pub fn show_preferences_window(ctx: &egui::Context, state: &mut AppState) {
    let mut open = state.tab_bar.preferences_open;
    let mut changed = false;

    egui::Window::new("Preferences")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("preferences_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Exact p-values");
                    if ui.checkbox(&mut state.settings.exact_p_values, "").changed() {
                        let exact = state.settings.exact_p_values;
                        state.tab_bar.set_exact_p_values(exact);
                        changed = true;
                    }
                    ui.end_row();

                    ui.label("Fix decimals");
                    ui.horizontal(|ui| {
                        let fix = ui.checkbox(&mut state.settings.fix_decimals, "").changed();
                        let decimals = ui
                            .add_enabled(
                                state.settings.fix_decimals,
                                egui::DragValue::new(&mut state.settings.num_decimals).clamp_range(1..=15),
                            )
                            .changed();
                        if fix || decimals {
                            let num_decimals = if state.settings.fix_decimals {
                                state.settings.num_decimals.to_string()
                            } else {
                                String::new()
                            };
                            state.tab_bar.set_fix_decimals(&num_decimals);
                            changed = true;
                        }
                    });
                    ui.end_row();

                    ui.label("Missing value codes");
                    let mut codes = state.settings.empty_values.join(" ");
                    if ui.text_edit_singleline(&mut codes).lost_focus() {
                        let values: Vec<String> = codes.split_whitespace().map(str::to_string).collect();
                        if values != state.settings.empty_values {
                            state.settings.empty_values = values.clone();
                            state.tab_bar.set_empty_values(values);
                            changed = true;
                        }
                    }
                    ui.end_row();

                    ui.label("Image resolution (ppi)");
                    changed |= ui
                        .add(egui::DragValue::new(&mut state.settings.ppi).clamp_range(48..=600))
                        .changed();
                    ui.end_row();

                    ui.label("Image background");
                    egui::ComboBox::from_id_source("image_background")
                        .selected_text(state.settings.image_background.clone())
                        .show_ui(ui, |ui| {
                            for background in ["white", "transparent"] {
                                changed |= ui
                                    .selectable_value(
                                        &mut state.settings.image_background,
                                        background.to_string(),
                                        background,
                                    )
                                    .changed();
                            }
                        });
                    ui.end_row();
                });
        });

    state.tab_bar.preferences_open = open;
    if changed {
        if let Err(e) = state.save_settings() {
            state.error_message = Some(format!("{:#}", e));
        }
    }
}

pub fn show_about_window(ctx: &egui::Context, state: &mut AppState) {
    let mut open = state.tab_bar.about_open;
    egui::Window::new("About")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("StatDesk");
            ui.label(format!("Version {}", APP_VERSION));
            ui.label("Desktop front end for statistical analyses run by an external engine.");
        });
    state.tab_bar.about_open = open;
}
