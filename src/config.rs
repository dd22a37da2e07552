use serde::Deserialize;

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// First statement id handed out by the builder.
    pub first_id: u32,
    /// Label nodes with the symbolically folded source instead of the original.
    pub fold_labels: bool,
    /// Mark nodes on the concrete execution path.
    pub highlight: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            first_id: 1,
            fold_labels: false,
            highlight: false,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
