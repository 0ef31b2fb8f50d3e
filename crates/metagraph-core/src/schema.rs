//! Node schema: the shape every node record must satisfy

use serde_json::{Value, json};

use crate::model::NodeKind;

/// Fields a record must carry. The others default when absent.
pub const REQUIRED_FIELDS: [&str; 2] = ["id", "kind"];

/// Separator used in patch paths; ids and edge types may not contain it.
pub const PATH_SEPARATOR: char = '/';

/// JSON description of the node shape, as handed to AI extractors.
pub fn node_schema() -> Value {
    let kinds: Vec<&str> = NodeKind::ALL.iter().map(|k| k.as_str()).collect();
    json!({
        "type": "object",
        "required": REQUIRED_FIELDS,
        "properties": {
            "id": {"type": "string", "minLength": 1, "description": "stable id without '/'"},
            "kind": {"enum": kinds},
            "props": {
                "type": "object",
                "description": "string keys; values are strings, numbers, booleans, objects or arrays, never null"
            },
            "edges": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["type", "to"],
                    "properties": {
                        "type": {"type": "string", "minLength": 1},
                        "to": {"type": "string", "minLength": 1}
                    }
                }
            },
            "prov": {
                "type": "object",
                "properties": {
                    "source": {"type": "string", "description": "path or path#span"},
                    "checksum": {"type": "string", "description": "hex sha256"}
                }
            }
        }
    })
}
