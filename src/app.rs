// src/app.rs
use eframe::egui;
use rfd::FileDialog;
use std::collections::VecDeque;

use crate::state::AppState;

const REQUEST_LOG_LEN: usize = 50;

pub struct StatDeskApp {
    state: AppState,
    request_log: VecDeque<String>,
    show_request_log: bool,
}

impl StatDeskApp {
    pub fn new() -> Self {
        Self {
            state: AppState::new(),
            request_log: VecDeque::new(),
            show_request_log: false,
        }
    }

    fn show_menu(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Data...").clicked() {
                    self.open_dataset();
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Open Analyses...").clicked() {
                    self.open_analyses();
                    ui.close_menu();
                }
                if ui.button("Save Analyses").clicked() {
                    self.save_analyses(false);
                    ui.close_menu();
                }
                if ui.button("Save Analyses As...").clicked() {
                    self.save_analyses(true);
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                ui.checkbox(&mut self.show_request_log, "Engine requests");
            });

            ui.separator();
            crate::ui::tab_bar::show_tab_bar(ui, &mut self.state);
        });
    }

    fn open_dataset(&mut self) {
        let file_dialog = FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .set_title("Open Data File");

        if let Some(path) = file_dialog.pick_file() {
            if let Err(e) = self.state.load_dataset(&path) {
                self.state.error_message = Some(format!("Error loading data: {:#}", e));
            }
        }
    }

    fn open_analyses(&mut self) {
        let file_dialog = FileDialog::new()
            .add_filter("JSON files", &["json"])
            .set_title("Open Analyses");

        if let Some(path) = file_dialog.pick_file() {
            if let Err(e) = self.state.load_analyses(&path) {
                self.state.error_message = Some(format!("Error loading analyses: {:#}", e));
            }
        }
    }

    fn save_analyses(&mut self, pick_path: bool) {
        let path = match (&self.state.analyses_path, pick_path) {
            (Some(path), false) => Some(path.clone()),
            _ => FileDialog::new()
                .add_filter("JSON files", &["json"])
                .set_title("Save Analyses As")
                .save_file(),
        };

        if let Some(path) = path {
            if let Err(e) = self.state.save_analyses(&path) {
                self.state.error_message = Some(format!("{:#}", e));
            }
        }
    }

    /// One round trip with the engine link: apply replies, queue requests
    /// and move them into the log.
    fn pump_engine(&mut self) {
        self.state.handle_replies();
        self.state.pump_requests();

        for request in self.state.engine.take_outgoing() {
            if self.request_log.len() == REQUEST_LOG_LEN {
                self.request_log.pop_front();
            }
            self.request_log.push_back(request.to_string());
        }
    }

    fn show_request_log(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("request_log")
            .resizable(true)
            .show_animated(ctx, self.show_request_log, |ui| {
                ui.horizontal(|ui| {
                    ui.strong("Engine requests");
                    if ui.small_button("Clear").clicked() {
                        self.request_log.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for request in &self.request_log {
                            ui.monospace(request);
                        }
                    });
            });
    }
}

impl eframe::App for StatDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_engine();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.show_menu(ui);
            ui.separator();
            crate::ui::ribbon::show_ribbon(ui, &mut self.state);
        });

        self.show_request_log(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            crate::ui::analyses::show_analyses_view(ui, &mut self.state);
        });

        crate::ui::preferences::show_preferences_window(ctx, &mut self.state);
        crate::ui::preferences::show_about_window(ctx, &mut self.state);

        // Show error modal if needed
        let error_msg = self.state.error_message.clone();
        if let Some(error) = error_msg {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&error);
                    if ui.button("OK").clicked() {
                        self.state.error_message = None;
                    }
                });
        }
    }
}
