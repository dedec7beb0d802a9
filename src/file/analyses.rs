// src/file/analyses.rs
use super::FileHandler;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// On-disk list of analysis documents as produced by `Analysis::as_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysesDocument {
    pub version: String,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
    pub analyses: Vec<Value>,
}

impl AnalysesDocument {
    pub fn new(analyses: Vec<Value>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: Utc::now(),
            analyses,
        }
    }
}

#[derive(Debug)]
pub struct AnalysesFileHandler;

impl AnalysesFileHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FileHandler<AnalysesDocument> for AnalysesFileHandler {
    fn load(&self, path: &Path) -> Result<AnalysesDocument> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analyses file {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse analyses file")
    }

    fn save(&self, data: &AnalysesDocument, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(data)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write analyses file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_then_load_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.json");
        let handler = AnalysesFileHandler::new();

        let doc = AnalysesDocument::new(vec![json!({ "id": 1, "status": "complete" })]);
        handler.save(&doc, &path).unwrap();

        let loaded = handler.load(&path).unwrap();
        assert_eq!(loaded.analyses, doc.analyses);
        assert_eq!(loaded.version, env!("CARGO_PKG_VERSION"));
    }
}
