//! Prompt context builder.
//!
//! Renders retrieved chunks as a numbered block that LLM-backed components
//! can cite:
//!
//! ```text
//! [1] (technical, doc 5f0c…, position 3)
//! Max power: 400W
//! ```
//!
//! The marker `[n]` is the 1-based position of the chunk in the slice that
//! was passed in, which is what `ChunkReference::marker` records.

use serde::{Deserialize, Serialize};

use super::types::Chunk;
use crate::core::config::defaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum total context length in characters
    pub max_context_length: usize,
    /// Whether to print the type/document/position header for each chunk
    pub include_metadata: bool,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_length: defaults::MAX_CONTEXT_CHARS,
            include_metadata: true,
        }
    }
}

/// Rendered context plus how many leading chunks made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedContext {
    pub text: String,
    pub included: usize,
}

impl RenderedContext {
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextBuilderConfig {
        &self.config
    }

    /// Render chunks in order until the length budget is spent. The first
    /// chunk is always included (truncated if needed) so a non-empty input
    /// never renders to an empty context.
    pub fn render(&self, chunks: &[Chunk]) -> RenderedContext {
        let mut text = String::new();
        let mut included = 0;
        let max_length = self.config.max_context_length;

        for (i, chunk) in chunks.iter().enumerate() {
            let block = self.format_block(i + 1, chunk);
            let block_len = block.chars().count();
            let current_len = text.chars().count();

            if current_len + block_len > max_length {
                if included == 0 {
                    text.extend(block.chars().take(max_length));
                    included = 1;
                }
                break;
            }

            text.push_str(&block);
            included += 1;
        }

        RenderedContext {
            text: text.trim().to_string(),
            included,
        }
    }

    fn format_block(&self, marker: usize, chunk: &Chunk) -> String {
        if self.config.include_metadata {
            format!(
                "[{}] ({}, doc {}, position {})\n{}\n\n",
                marker,
                chunk.document_type,
                chunk.document_id,
                chunk.position_index,
                chunk.text.trim()
            )
        } else {
            format!("[{}] {}\n\n", marker, chunk.text.trim())
        }
    }
}
