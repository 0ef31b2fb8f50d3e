//! Deterministic extractors for recognized artefact formats

pub mod markdown;
pub mod sql;

use std::path::Path;
use std::sync::Arc;

use crate::extractor::ArtefactExtractor;

/// File formats with a fast, exact extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtefactFormat {
    Sql,
    Markdown,
}

impl ArtefactFormat {
    /// Determine format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "sql" => Some(ArtefactFormat::Sql),
            "md" | "markdown" => Some(ArtefactFormat::Markdown),
            _ => None,
        }
    }

    pub fn extractor(self) -> Arc<dyn ArtefactExtractor> {
        match self {
            ArtefactFormat::Sql => Arc::new(sql::SqlExtractor),
            ArtefactFormat::Markdown => Arc::new(markdown::MarkdownExtractor),
        }
    }
}

/// `<path>` or `<path>#L<a>-L<b>`.
pub(crate) fn source_ref(path: &Path, lines: Option<(usize, usize)>) -> String {
    match lines {
        Some((a, b)) => format!("{}#L{}-L{}", path.display(), a, b),
        None => path.display().to_string(),
    }
}
