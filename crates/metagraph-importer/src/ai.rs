//! AI-assisted extraction for artefacts without a deterministic parser

use std::path::Path;
use std::sync::Arc;

use metagraph_ai::{AIProvider, extract_nodes};
use metagraph_core::Node;
use tracing::{info, warn};

use crate::error::ExtractionError;
use crate::extractor::ArtefactExtractor;

pub struct AiExtractor {
    provider: Arc<dyn AIProvider>,
}

impl AiExtractor {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl ArtefactExtractor for AiExtractor {
    async fn extract(&self, path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError> {
        let source = path.display().to_string();
        let extraction = extract_nodes(self.provider.as_ref(), &source, text)
            .await
            .map_err(|e| ExtractionError::Ai {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
        for error in &extraction.errors {
            warn!("{} reported for {}: {}", self.provider.name(), source, error);
        }
        info!(
            "{} extracted {} nodes from {} ({} tokens)",
            self.provider.name(),
            extraction.nodes.len(),
            source,
            extraction.tokens_used
        );
        Ok(extraction.nodes)
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
