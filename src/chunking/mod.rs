//! Text chunking for knowledge-base ingestion.
//!
//! Long documents are split into overlapping, size-bounded pieces before embedding so that
//! each vector covers a focused passage.

mod recursive;

pub use recursive::RecursiveSplitter;

use crate::config::ChunkingSettings;

/// Separators tried in order, from paragraph breaks down to single characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Build the splitter from settings.
pub fn from_settings(settings: &ChunkingSettings) -> RecursiveSplitter {
    RecursiveSplitter::new(settings.chunk_size, settings.chunk_overlap)
}
