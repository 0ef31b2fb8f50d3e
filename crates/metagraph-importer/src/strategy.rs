//! Extraction strategy selection

use std::path::Path;

use crate::error::ExtractionError;
use crate::formats::ArtefactFormat;

/// Default size limit for the deterministic path, in bytes.
pub const DEFAULT_MAX_DETERMINISTIC_BYTES: u64 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fast, exact, reproducible.
    Deterministic(ArtefactFormat),
    /// Tolerant but slow and non-reproducible.
    Ai,
}

/// Pick the extraction path from extension and size alone.
///
/// Recognized formats at or below `threshold` bytes are parsed
/// deterministically; anything else goes to the AI path when one is
/// available. Without it, oversized recognized files still get their
/// deterministic parser and unrecognized files are unsupported.
pub fn select_strategy(
    path: &Path,
    size: u64,
    threshold: u64,
    ai_available: bool,
) -> Result<Strategy, ExtractionError> {
    match (ArtefactFormat::from_path(path), ai_available) {
        (Some(format), _) if size <= threshold => Ok(Strategy::Deterministic(format)),
        (_, true) => Ok(Strategy::Ai),
        (Some(format), false) => Ok(Strategy::Deterministic(format)),
        (None, false) => Err(ExtractionError::Unsupported(path.to_path_buf())),
    }
}
