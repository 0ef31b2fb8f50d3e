//! Provider trait and the validated node-envelope exchange

use anyhow::Result;
use metagraph_core::{Node, Violation, validate_node};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::{IMPORTER_SYSTEM_PROMPT, REPAIR_SUFFIX, extraction_prompt};

/// Raw model output plus accounting.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub tokens_used: u32,
}

/// AI provider trait for different LLM backends
#[async_trait::async_trait]
pub trait AIProvider: Send + Sync {
    /// Run one chat turn and return the assistant's text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// What the model is asked to return.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    nodes: Vec<serde_json::Value>,
    errors: Vec<String>,
}

/// A decoded, schema-valid envelope.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub nodes: Vec<Node>,
    /// Problems the model reported about the input.
    pub errors: Vec<String>,
    pub tokens_used: u32,
}

/// Why a model answer was rejected.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response is not a node envelope: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("nodes[{index}] is not a node record: {reason}")]
    Node { index: usize, reason: String },

    #[error("nodes[{index}] violates the node schema: {violation}")]
    Invalid { index: usize, violation: Violation },
}

/// Decode and validate a model answer.
///
/// Models wrap JSON in prose or code fences often enough that everything
/// outside the outermost braces is ignored.
pub fn parse_envelope(content: &str) -> std::result::Result<Extraction, EnvelopeError> {
    let start = content.find('{').ok_or(EnvelopeError::NoJson)?;
    let end = content.rfind('}').ok_or(EnvelopeError::NoJson)?;
    if end < start {
        return Err(EnvelopeError::NoJson);
    }
    let raw: RawEnvelope =
        serde_json::from_str(&content[start..=end]).map_err(EnvelopeError::Shape)?;

    let mut nodes = Vec::with_capacity(raw.nodes.len());
    for (index, value) in raw.nodes.into_iter().enumerate() {
        let node: Node = serde_json::from_value(value).map_err(|e| EnvelopeError::Node {
            index,
            reason: e.to_string(),
        })?;
        if let Some(violation) = validate_node(&node).into_iter().next() {
            return Err(EnvelopeError::Invalid { index, violation });
        }
        nodes.push(node);
    }
    Ok(Extraction {
        nodes,
        errors: raw.errors,
        tokens_used: 0,
    })
}

/// Ask `provider` for the nodes in `text`, retrying once with a repair hint
/// if the first answer is not a valid envelope.
pub async fn extract_nodes(provider: &dyn AIProvider, source: &str, text: &str) -> Result<Extraction> {
    let prompt = extraction_prompt(source, text);
    let first = provider.complete(IMPORTER_SYSTEM_PROMPT, &prompt).await?;
    let first_error = match parse_envelope(&first.content) {
        Ok(mut extraction) => {
            extraction.tokens_used = first.tokens_used;
            debug!(
                "{} extracted {} nodes from {} ({} tokens)",
                provider.name(),
                extraction.nodes.len(),
                source,
                extraction.tokens_used
            );
            return Ok(extraction);
        }
        Err(e) => e,
    };

    warn!("{} answer for {} rejected ({}), asking for repair", provider.name(), source, first_error);
    let repair = provider
        .complete(IMPORTER_SYSTEM_PROMPT, &format!("{prompt}{REPAIR_SUFFIX}"))
        .await?;
    match parse_envelope(&repair.content) {
        Ok(mut extraction) => {
            extraction.tokens_used = first.tokens_used + repair.tokens_used;
            Ok(extraction)
        }
        Err(e) => anyhow::bail!("{} returned an invalid envelope after repair: {}", provider.name(), e),
    }
}
