// src/analysis/mod.rs
pub mod analyses;
#[allow(clippy::module_inception)]
pub mod analysis;
pub mod form;
pub mod status;

// Re-export commonly used types
pub use analyses::Analyses;
pub use analysis::{Analysis, CallbackOutcome, APP_VERSION};
pub use form::{AnalysisForm, FormControl};
pub use status::Status;
