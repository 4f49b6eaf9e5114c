//! Channel layer for prompt matching and output cleanup.
//!
//! This module handles the interactive side of a CLI session:
//! tail-searched output buffering, prompt detection, and stripping
//! command echo and device error markers out of responses.

mod buffer;
pub mod prompt;

pub use buffer::PatternBuffer;
pub use prompt::PromptPatterns;
