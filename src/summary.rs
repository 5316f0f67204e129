//! Summary types - the structured output requested from the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// The schema derived from this struct is sent with every summary request; the field docs
// below become the per-field descriptions the model sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// A concise summary of the text.
    pub summary: String,
    /// A bulleted list of the 3-5 most important key points or takeaways from the text.
    pub key_points: Vec<String>,
    /// A bulleted list of the 2-3 central themes or main ideas discussed in the text.
    pub main_ideas: Vec<String>,
}

/// Named summary length preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed word-count range. Only ever used as a hint to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRange {
    pub min: u32,
    pub max: u32,
}

impl WordRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for WordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}
