//! Artefact extractor trait definition

use std::path::Path;

use metagraph_core::Node;

use crate::error::ExtractionError;

/// Turns the text of one artefact into node records.
///
/// Implementations either return a complete, schema-valid node list or fail;
/// they never return a partial list.
#[async_trait::async_trait]
pub trait ArtefactExtractor: Send + Sync {
    async fn extract(&self, path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError>;

    fn name(&self) -> &str;
}
