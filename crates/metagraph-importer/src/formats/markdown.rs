//! Markdown user story extractor

use std::path::Path;

use metagraph_core::{Node, NodeId, NodeKind, Provenance, checksum};

use super::source_ref;
use crate::error::ExtractionError;
use crate::extractor::ArtefactExtractor;

pub struct MarkdownExtractor;

/// One `Story` per file: the first `#` line is the title, every other line
/// is the body. A file without a heading yields no nodes.
pub fn parse_markdown(path: &Path, text: &str) -> Vec<Node> {
    let mut title: Option<String> = None;
    let mut body_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if title.is_none() && line.starts_with('#') {
            title = Some(line.trim_start_matches(|c: char| c == '#' || c == ' ').trim().to_string());
        } else {
            body_lines.push(line);
        }
    }
    let Some(title) = title else {
        return Vec::new();
    };

    let story = Node::new(NodeId::derive(NodeKind::Story, &title), NodeKind::Story)
        .with_prop("body", body_lines.join("\n").trim())
        .with_prop("title", title)
        .with_prov(Provenance::new(source_ref(path, None), checksum(text)));
    vec![story]
}

#[async_trait::async_trait]
impl ArtefactExtractor for MarkdownExtractor {
    async fn extract(&self, path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError> {
        Ok(parse_markdown(path, text))
    }

    fn name(&self) -> &str {
        "markdown"
    }
}
