// src/ui/form.rs
use eframe::egui;

use crate::analysis::FormControl;
use crate::models::{BoundColumnName, SortType, TableModel};
use crate::options::Term;
use crate::state::AppState;
use crate::ui::table_view::{show_table, TableAction};

enum FormAction {
    Assign { control: String, term: Term },
    Unassign { control: String, term: Term },
    Sort { control: String, sort_type: SortType },
    Table { control: String, action: TableAction },
    CheckSyntax(String),
    ApplyColumnName(String),
    DismissErrors,
}

pub fn show_form(ui: &mut egui::Ui, state: &mut AppState, id: usize) {
    let Some(form) = state.form(id) else {
        ui.label("This analysis has no form.");
        return;
    };

    let mut actions = Vec::new();

    if !form.errors().is_empty() {
        ui.group(|ui| {
            for error in form.errors() {
                ui.colored_label(egui::Color32::RED, error);
            }
            if ui.small_button("Dismiss").clicked() {
                actions.push(FormAction::DismissErrors);
            }
        });
        ui.add_space(8.0);
    }

    // Assigned lists, keyed by the pool they draw from
    let targets: Vec<(String, String)> = form
        .controls()
        .iter()
        .filter_map(|control| match control {
            FormControl::Assigned(m) => Some((m.available_model().to_string(), m.list.name().to_string())),
            _ => None,
        })
        .collect();

    let data = state.dataset.as_ref();

    for control in form.controls() {
        let name = control.name().to_string();
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.strong(&name);

            match control {
                FormControl::Available(model) => {
                    ui.horizontal(|ui| {
                        for (label, sort_type) in [
                            ("None", SortType::None),
                            ("A-Z", SortType::Ascending),
                            ("Z-A", SortType::Descending),
                        ] {
                            if ui.selectable_label(model.sort_type() == sort_type, label).clicked() {
                                actions.push(FormAction::Sort {
                                    control: name.clone(),
                                    sort_type,
                                });
                            }
                        }
                    });

                    let my_targets: Vec<&String> = targets
                        .iter()
                        .filter(|(source, _)| *source == name)
                        .map(|(_, target)| target)
                        .collect();

                    for term in model.list.terms().iter() {
                        ui.horizontal(|ui| {
                            let text = if model.is_suggested(term) {
                                egui::RichText::new(term.to_string()).strong()
                            } else {
                                egui::RichText::new(term.to_string())
                            };
                            ui.label(text);
                            for target in &my_targets {
                                let button = ui.add_enabled(
                                    model.is_allowed(term),
                                    egui::Button::new(format!("→ {}", target)),
                                );
                                if button.clicked() {
                                    actions.push(FormAction::Assign {
                                        control: (*target).clone(),
                                        term: term.clone(),
                                    });
                                }
                            }
                        });
                    }
                }
                FormControl::Assigned(model) => {
                    if model.list.terms().is_empty() {
                        ui.weak("(empty)");
                    }
                    for term in model.list.terms().iter() {
                        ui.horizontal(|ui| {
                            ui.label(term.to_string());
                            if ui.small_button("✖").clicked() {
                                actions.push(FormAction::Unassign {
                                    control: name.clone(),
                                    term: term.clone(),
                                });
                            }
                        });
                    }
                }
                FormControl::Table(table) => {
                    if let Some(action) = show_table(ui, table.as_ref(), data, &name) {
                        actions.push(FormAction::Table {
                            control: name.clone(),
                            action,
                        });
                    }
                }
                FormControl::TextArea(_) | FormControl::ColumnName(_) => {
                    // Needs the mutable text; drawn below.
                }
            }
        });
        ui.add_space(4.0);
    }

    let editors: Vec<String> = form
        .controls()
        .iter()
        .filter(|c| matches!(c, FormControl::TextArea(_) | FormControl::ColumnName(_)))
        .map(|c| c.name().to_string())
        .collect();

    for name in editors {
        let control = state
            .forms
            .iter_mut()
            .find(|f| f.analysis_id() == id)
            .and_then(|f| f.control_mut(&name));
        let area = match control {
            Some(FormControl::TextArea(area)) => area,
            Some(FormControl::ColumnName(column)) => {
                show_column_name(ui, &name, column, &mut actions);
                continue;
            }
            _ => continue,
        };
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.strong(&name);
            let is_code = area.text_type().is_code();
            let mut editor = egui::TextEdit::multiline(area.text_mut())
                .desired_width(f32::INFINITY)
                .desired_rows(8);
            if is_code {
                editor = editor.code_editor();
            }
            let response = ui.add(editor);

            let apply_shortcut = response.has_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && i.modifiers.command);

            ui.horizontal(|ui| {
                if ui.button("Apply").clicked() || apply_shortcut {
                    actions.push(FormAction::CheckSyntax(name.clone()));
                }
                if let Some(info) = area.apply_script_info() {
                    ui.weak(info);
                }
            });

            if !area.info_text().is_empty() {
                let color = if area.has_script_error() {
                    egui::Color32::RED
                } else {
                    ui.visuals().weak_text_color()
                };
                ui.colored_label(color, area.info_text());
            }
        });
    }

    if actions.is_empty() {
        return;
    }
    apply_actions(state, id, actions);
}

fn apply_actions(state: &mut AppState, id: usize, actions: Vec<FormAction>) {
    let Some((form, analysis, data)) = state.form_context(id) else {
        return;
    };

    for action in actions {
        match action {
            FormAction::Assign { control, term } => form.assign(&control, term, data),
            FormAction::Unassign { control, term } => form.unassign(&control, &term, data),
            FormAction::Sort { control, sort_type } => {
                if let Some(FormControl::Available(model)) = form.control_mut(&control) {
                    model.sort_items(sort_type);
                }
            }
            FormAction::Table { control, action } => match action {
                TableAction::EditCell { col, row, raw } => form.edit_cell(&control, col, row, &raw, data),
                structural => {
                    if let Some(FormControl::Table(table)) = form.control_mut(&control) {
                        apply_structural(table.as_mut(), structural);
                    }
                }
            },
            FormAction::CheckSyntax(control) => form.check_syntax(&control, data),
            FormAction::ApplyColumnName(control) => form.apply_column_name(&control),
            FormAction::DismissErrors => form.clear_errors(),
        }
    }

    form.sync(analysis);
}

fn show_column_name(
    ui: &mut egui::Ui,
    name: &str,
    column: &mut BoundColumnName,
    actions: &mut Vec<FormAction>,
) {
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.strong(name);
        ui.horizontal(|ui| {
            let response = ui.text_edit_singleline(column.text_mut());
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Apply").clicked() || entered {
                actions.push(FormAction::ApplyColumnName(name.to_string()));
            }
        });
        let kind = if column.is_computed() { "Computed column" } else { "Column" };
        if column.applied().is_empty() {
            ui.weak(format!("{}: none", kind));
        } else {
            ui.weak(format!("{}: {}", kind, column.applied()));
        }
    });
}

fn apply_structural(table: &mut dyn TableModel, action: TableAction) {
    match action {
        TableAction::AddRow => table.add_row(),
        TableAction::RemoveRow(row) => table.remove_row(row),
        TableAction::AddColumn => table.add_column(),
        TableAction::RemoveColumn(col) => table.remove_column(col),
        TableAction::Reset => table.reset(),
        TableAction::SetFilter(filter) => table.set_row_filter(&filter),
        TableAction::EditCell { .. } => {}
    }
}
