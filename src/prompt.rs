//! Prompt templates: data, not code, hot-swappable at the start of a batch.

use serde::{Deserialize, Serialize};

const DEFAULT_NOVEL_CONDENSER: &str = "\
You are condensing a novel chapter. Rewrite the chapter so the result is \
between {min_ratio}% and {max_ratio}% of the original length, preserving \
plot-critical events, character voice, and dialogue where possible. \
Output only the condensed chapter text, with no commentary.";

const DEFAULT_CHUNK_PREFIX: &str = "This is chunk {chunk_index} of {total_chunks} of a longer chapter. \
Condense only this chunk; do not summarize the whole chapter.";

/// Parameterized prompt strings, loaded from config's `prompt_templates`
/// object (or `customer_prompt`, which takes highest priority over
/// `novel_condenser`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub novel_condenser: String,
    pub chunk_prefix: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            novel_condenser: DEFAULT_NOVEL_CONDENSER.to_string(),
            chunk_prefix: DEFAULT_CHUNK_PREFIX.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Renders the system prompt with the configured ratio targets
    /// substituted as integer percentages.
    pub fn render_system_prompt(&self, min_ratio_percent: u32, max_ratio_percent: u32) -> String {
        self.novel_condenser
            .replace("{min_ratio}", &min_ratio_percent.to_string())
            .replace("{max_ratio}", &max_ratio_percent.to_string())
    }

    /// Renders the system prompt using absolute character counts instead of
    /// percentages, for callers that track length targets that way.
    pub fn render_system_prompt_by_counts(&self, original_count: usize, min_count: usize, max_count: usize) -> String {
        self.novel_condenser
            .replace("{original_count}", &original_count.to_string())
            .replace("{min_count}", &min_count.to_string())
            .replace("{max_count}", &max_count.to_string())
    }

    pub fn render_chunk_prefix(&self, chunk_index: usize, total_chunks: usize) -> String {
        self.chunk_prefix
            .replace("{chunk_index}", &(chunk_index + 1).to_string())
            .replace("{total_chunks}", &total_chunks.to_string())
    }
}
