//! Prompt templates for node extraction

use metagraph_core::node_schema;

/// System prompt for every extraction request.
pub const IMPORTER_SYSTEM_PROMPT: &str = r#"You are MetaGraph-ImporterGPT. Return ONLY JSON conforming to: {"nodes":[Node…],"errors":[string…]}"#;

/// Appended to the user prompt on the single retry.
pub const REPAIR_SUFFIX: &str = "\nRepair.";

/// User prompt: the node schema, the artefact's origin and its full text.
pub fn extraction_prompt(source: &str, text: &str) -> String {
    let schema = serde_json::to_string_pretty(&node_schema()).unwrap_or_default();
    format!(
        r#"Extract design-artefact nodes from the file below.

Each Node must match this JSON schema:
{schema}

Rules:
- Derive ids from the artefact's names so the same entity always gets the same id.
- Set prov.source to "{source}".
- Put anything you could not interpret in "errors" instead of guessing.

File: {source}
```
{text}
```"#
    )
}
