//! Frozen per-engine model configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Fallback input size used when the model declares a fully dynamic
/// input shape and the caller supplied none.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Immutable model configuration, built once at engine construction.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Name of the graph input the preprocessed tensor is bound to.
    pub input_name: String,
    pub input_width: u32,
    pub input_height: u32,
    /// Class labels; index is the class id.
    pub labels: Vec<String>,
}

impl ModelConfig {
    /// Resolve a class id to its label, or a synthesized `cls<id>` when
    /// the id is outside the label list.
    pub fn label(&self, class_id: i64) -> String {
        usize::try_from(class_id)
            .ok()
            .and_then(|id| self.labels.get(id))
            .cloned()
            .unwrap_or_else(|| format!("cls{class_id}"))
    }
}

/// Load class labels from a UTF-8 text file, one label per line.
///
/// Lines are trimmed; blank lines are skipped. The line index after
/// filtering is the class id.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        bail!("labels file not found: {}", path.display());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read labels from {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
