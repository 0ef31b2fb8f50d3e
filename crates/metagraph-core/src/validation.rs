//! Structural validation of nodes against the node schema

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result, SchemaViolations, Violation};
use crate::graph::Graph;
use crate::hash::is_checksum;
use crate::model::Node;
use crate::schema::PATH_SEPARATOR;

/// Check one node. Violations come back in field order:
/// `id`, `props`, `edges`, `prov` (`kind` is enforced when decoding).
pub fn validate_node(node: &Node) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut violation = |field: String, reason: &str| {
        out.push(Violation {
            node: node.id.clone(),
            field,
            reason: reason.to_string(),
        })
    };

    if node.id.as_str().is_empty() {
        violation("id".into(), "must not be empty");
    } else if node.id.as_str().contains(PATH_SEPARATOR) {
        violation("id".into(), "must not contain '/'");
    }

    for (key, value) in &node.props {
        if key.is_empty() {
            violation("props".into(), "keys must not be empty");
        }
        if let Some(path) = find_null(value, format!("props.{key}")) {
            violation(path, "must not be null");
        }
    }

    for (i, edge) in node.edges.iter().enumerate() {
        if edge.ty.is_empty() {
            violation(format!("edges[{i}].type"), "must not be empty");
        } else if edge.ty.contains(PATH_SEPARATOR) {
            violation(format!("edges[{i}].type"), "must not contain '/'");
        }
        if edge.to.as_str().is_empty() {
            violation(format!("edges[{i}].to"), "must not be empty");
        } else if edge.to.as_str().contains(PATH_SEPARATOR) {
            violation(format!("edges[{i}].to"), "must not contain '/'");
        }
    }

    if !node.prov.checksum.is_empty() && !is_checksum(&node.prov.checksum) {
        violation("prov.checksum".into(), "must be 64 lowercase hex digits");
    }

    out
}

/// First null found in a prop value, as a dotted path.
fn find_null(value: &Value, path: String) -> Option<String> {
    match value {
        Value::Null => Some(path),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_null(v, format!("{path}[{i}]"))),
        Value::Object(map) => map
            .iter()
            .find_map(|(k, v)| find_null(v, format!("{path}.{k}"))),
        _ => None,
    }
}

/// Validate every node, collecting all violations in node insertion order.
pub fn validate_graph(graph: &Graph) -> Result<()> {
    let violations: Vec<Violation> = graph.nodes().flat_map(|n| validate_node(&n)).collect();
    debug!(
        "Validated {} nodes: {} violation(s)",
        graph.node_count(),
        violations.len()
    );
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::SchemaViolation(SchemaViolations(violations)))
    }
}
