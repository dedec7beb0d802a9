// src/ui/table_view.rs
use eframe::egui;

use crate::data::DataSet;
use crate::models::{Orientation, TableModel};

#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    EditCell { col: usize, row: usize, raw: String },
    AddRow,
    RemoveRow(usize),
    AddColumn,
    RemoveColumn(usize),
    Reset,
    SetFilter(String),
}

const CHAR_WIDTH: f32 = 8.0;

/// Draws the grid of a table model. Edits are returned, not applied.
pub fn show_table(
    ui: &mut egui::Ui,
    table: &dyn TableModel,
    data: Option<&DataSet>,
    id_source: &str,
) -> Option<TableAction> {
    let base = table.base();
    let mut action = None;

    if let Some(filter) = table.row_filter() {
        ui.horizontal(|ui| {
            ui.label("Filter");
            let filter_id = ui.make_persistent_id((id_source, "filter"));
            if let Some(filter) = edit_cell(ui, filter_id, filter, 240.0) {
                action = Some(TableAction::SetFilter(filter));
            }
        });
    }

    if base.column_count() == 0 {
        ui.weak("(no values)");
    }

    egui::ScrollArea::horizontal()
        .id_source(format!("{}_scroll", id_source))
        .show(ui, |ui| {
            egui::Grid::new(format!("{}_grid", id_source))
                .striped(true)
                .spacing([6.0, 2.0])
                .show(ui, |ui| {
                    ui.label("");
                    for col in 0..base.column_count() {
                        let header = base.header(Orientation::Horizontal, col).unwrap_or_default();
                        ui.strong(header);
                    }
                    ui.end_row();

                    for row in 0..base.row_count() {
                        ui.label(base.header(Orientation::Vertical, row).unwrap_or_default());
                        for col in 0..base.column_count() {
                            let display = table.cell_display(col, row, data).unwrap_or_default();
                            if table.is_editable(col) {
                                let width = table
                                    .max_col_string(col, data)
                                    .map_or(4, |s| s.chars().count()) as f32
                                    * CHAR_WIDTH;
                                let cell_id = ui.make_persistent_id((id_source, col, row));
                                if let Some(raw) = edit_cell(ui, cell_id, &display, width) {
                                    action = Some(TableAction::EditCell { col, row, raw });
                                }
                            } else {
                                ui.label(display);
                            }
                        }
                        ui.end_row();
                    }
                });
        });

    if !table.allows_structural_edits() {
        return action;
    }

    ui.horizontal(|ui| {
        let can_add_row = base.row_count() < base.max_rows;
        let can_add_col = base.column_count() < base.max_columns;
        if ui.add_enabled(can_add_row, egui::Button::new("➕ Row")).clicked() {
            action = Some(TableAction::AddRow);
        }
        if ui.add_enabled(base.row_count() > 0, egui::Button::new("➖ Row")).clicked() {
            action = Some(TableAction::RemoveRow(base.row_count() - 1));
        }
        if ui.add_enabled(can_add_col, egui::Button::new("➕ Column")).clicked() {
            action = Some(TableAction::AddColumn);
        }
        if ui.add_enabled(base.column_count() > 0, egui::Button::new("➖ Column")).clicked() {
            action = Some(TableAction::RemoveColumn(base.column_count() - 1));
        }
        if ui.button("Reset").clicked() {
            action = Some(TableAction::Reset);
        }
    });

    action
}

/// Single-line cell editor. The text being typed lives in egui's temp
/// memory until focus leaves the cell; the committed text is returned then.
fn edit_cell(ui: &mut egui::Ui, id: egui::Id, display: &str, width: f32) -> Option<String> {
    let mut text = ui
        .data(|d| d.get_temp::<String>(id))
        .unwrap_or_else(|| display.to_string());

    let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(width));

    if response.lost_focus() {
        ui.data_mut(|d| d.remove::<String>(id));
        return (text != display).then_some(text);
    }
    if response.has_focus() {
        ui.data_mut(|d| d.insert_temp(id, text));
    }
    None
}
