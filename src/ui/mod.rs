// src/ui/mod.rs
pub mod analyses;
pub mod form;
pub mod preferences;
pub mod ribbon;
pub mod tab_bar;
pub mod table_view;
