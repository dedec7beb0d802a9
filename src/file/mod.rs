// src/file/mod.rs
use anyhow::Result;
use std::path::Path;

pub mod analyses;
pub mod temp_files;

pub use analyses::AnalysesFileHandler;
pub use temp_files::{SessionGuard, TempFiles};

// Core trait for file operations
pub trait FileHandler<T> {
    fn load(&self, path: &Path) -> Result<T>;
    fn save(&self, data: &T, path: &Path) -> Result<()>;
}
