// src/ui/analyses.rs
use eframe::egui;
use rfd::FileDialog;

use crate::analysis::Status;
use crate::state::{AnalysisTab, AppState};

fn status_color(status: Status) -> egui::Color32 {
    match status {
        Status::Complete => egui::Color32::DARK_GREEN,
        Status::FatalError | Status::ValidationError => egui::Color32::RED,
        Status::Aborted | Status::Aborting => egui::Color32::GOLD,
        _ => egui::Color32::GRAY,
    }
}

pub fn show_analyses_view(ui: &mut egui::Ui, state: &mut AppState) {
    let available_size = ui.available_size();

    egui::Grid::new("analyses_grid")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            // Left panel - Analysis List
            ui.vertical(|ui| {
                ui.set_min_width(available_size.x * 0.3);
                ui.set_min_height(available_size.y);

                ui.heading("Analyses");
                ui.add_space(4.0);

                if ui.button("⟳ Refresh All").clicked() {
                    state.analyses.refresh_all();
                }

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                egui::ScrollArea::vertical()
                    .id_source("analyses_list_scroll")
                    .show(ui, |ui| {
                        let mut delete_id = None;

                        for analysis in state.analyses.iter() {
                            let id = analysis.id();
                            let is_selected = state.selected_analysis == Some(id);

                            ui.group(|ui| {
                                ui.set_width(ui.available_width());

                                let response = ui.selectable_label(is_selected, analysis.title());
                                if response.clicked() {
                                    state.selected_analysis = Some(id);
                                }
                                ui.colored_label(status_color(analysis.status()), analysis.status().to_string());

                                response.context_menu(|ui| {
                                    if ui.button(egui::RichText::new("🗑 Delete").color(egui::Color32::RED)).clicked() {
                                        delete_id = Some(id);
                                        ui.close_menu();
                                    }
                                });
                            });
                            ui.add_space(4.0);
                        }

                        if let Some(id) = delete_id {
                            state.remove_analysis(id);
                        }
                    });
            });

            // Right panel - Analysis Details
            ui.vertical(|ui| {
                ui.set_min_width(available_size.x * 0.7);
                ui.set_min_height(available_size.y);

                match state.selected_analysis {
                    Some(id) if state.analyses.get(id).is_some() => show_analysis_details(ui, state, id),
                    _ => {
                        ui.label("Pick an analysis from the ribbon, or select one from the list");
                    }
                }
            });
            ui.end_row();
        });
}

fn show_analysis_details(ui: &mut egui::Ui, state: &mut AppState, id: usize) {
    let Some(analysis) = state.analyses.get_mut(id) else {
        return;
    };

    ui.horizontal(|ui| {
        let mut title = analysis.title().to_string();
        let response = ui.add(egui::TextEdit::singleline(&mut title).font(egui::TextStyle::Heading));
        if response.changed() {
            analysis.set_title(&title);
        }
        ui.label(format!("rev {}", analysis.revision()));
    });

    ui.horizontal(|ui| {
        if ui.button("▶ Refresh").clicked() {
            analysis.refresh();
        }
        let can_abort = analysis.status().is_waiting_for_backend();
        if ui.add_enabled(can_abort, egui::Button::new("■ Abort")).clicked() {
            analysis.abort();
        }
        if ui.button("🖼 Rewrite Images").clicked() {
            analysis.rewrite_images();
        }
    });

    if !analysis.help_file().is_empty() {
        ui.weak(format!("Help: {}", analysis.help_file()));
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        for (tab, label) in [
            (AnalysisTab::Form, "Form"),
            (AnalysisTab::Results, "Results"),
            (AnalysisTab::Document, "Document"),
        ] {
            if ui.selectable_label(state.analysis_tab == tab, label).clicked() {
                state.analysis_tab = tab;
            }
        }
    });
    ui.separator();

    egui::ScrollArea::vertical()
        .id_source("analysis_details_scroll")
        .show(ui, |ui| match state.analysis_tab {
            AnalysisTab::Form => crate::ui::form::show_form(ui, state, id),
            AnalysisTab::Results => {
                show_image_export(ui, state, id);
                ui.separator();
                if let Some(analysis) = state.analyses.get(id) {
                    if !analysis.progress().is_null() {
                        ui.weak(format!("Progress: {}", analysis.progress()));
                    }
                    show_json(ui, analysis.results());
                }
            }
            AnalysisTab::Document => {
                if let Some(analysis) = state.analyses.get(id) {
                    show_json(ui, &analysis.as_json());
                }
            }
        });
}

fn show_image_export(ui: &mut egui::Ui, state: &mut AppState, id: usize) {
    egui::CollapsingHeader::new("Figures")
        .id_source("image_export")
        .show(ui, |ui| {
            let export = &mut state.image_export;
            egui::Grid::new("image_export_grid")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Plot");
                    ui.text_edit_singleline(&mut export.plot_name);
                    ui.end_row();

                    ui.label("Format");
                    egui::ComboBox::from_id_source("image_format")
                        .selected_text(export.format.clone())
                        .show_ui(ui, |ui| {
                            for format in ["png", "pdf", "svg", "eps"] {
                                ui.selectable_value(&mut export.format, format.to_string(), format);
                            }
                        });
                    ui.end_row();

                    ui.label("Size");
                    ui.horizontal(|ui| {
                        ui.add(egui::DragValue::new(&mut export.width).clamp_range(50..=4000));
                        ui.label("×");
                        ui.add(egui::DragValue::new(&mut export.height).clamp_range(50..=4000));
                    });
                    ui.end_row();
                });

            let has_plot = !state.image_export.plot_name.is_empty();
            ui.horizontal(|ui| {
                if ui.add_enabled(has_plot, egui::Button::new("💾 Save Image...")).clicked() {
                    let extension = state.image_export.format.clone();
                    let picked = FileDialog::new()
                        .add_filter(extension.to_uppercase(), &[extension.as_str()])
                        .set_title("Save Image")
                        .save_file();
                    if let (Some(path), Some(analysis)) = (picked, state.analyses.get_mut(id)) {
                        analysis.save_image(state.image_export.save_options(&path));
                    }
                }
                if ui.add_enabled(has_plot, egui::Button::new("↔ Resize")).clicked() {
                    if let Some(analysis) = state.analyses.get_mut(id) {
                        analysis.edit_image(state.image_export.edit_options());
                    }
                }
            });
        });
}

fn show_json(ui: &mut egui::Ui, value: &serde_json::Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_default();
    ui.add(egui::Label::new(egui::RichText::new(text).monospace()));
}
