//! Line-oriented graph persistence: one JSON node record per line

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::model::Node;

/// Default graph file name.
pub const GRAPH_FILE: &str = "metagraph.graphson";

/// Load a graph. A missing file is an empty graph, not an error.
pub fn load_graph(path: &Path) -> Result<Graph> {
    if !path.exists() {
        debug!("No graph at {}, starting empty", path.display());
        return Ok(Graph::new());
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let graph = read_graph(BufReader::new(file), path)?;
    debug!(
        "Loaded {} nodes, {} edges from {}",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(graph)
}

/// Parse node records from `reader`. `origin` is only used in error messages.
///
/// Blank lines are skipped. Any other line that is not UTF-8 or does not
/// decode as a node record fails the whole load.
pub fn read_graph<R: BufRead>(reader: R, origin: &Path) -> Result<Graph> {
    let mut graph = Graph::new();
    for (i, line) in reader.split(b'\n').enumerate() {
        let mut line = line.map_err(|e| Error::io(origin, e))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let malformed = |reason: String| Error::MalformedRecord {
            path: origin.to_path_buf(),
            line: i + 1,
            reason,
        };
        let text = std::str::from_utf8(&line).map_err(|e| malformed(e.to_string()))?;
        if text.trim().is_empty() {
            continue;
        }
        let node: Node = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
        graph.insert_node(node);
    }
    Ok(graph)
}

/// Write every defined node, one per line, in insertion order.
///
/// Edges whose source is not a defined node have no record to live in and
/// are skipped. Returns the number of skipped edges.
pub fn write_graph<W: Write>(graph: &Graph, mut writer: W) -> Result<usize> {
    for node in graph.nodes() {
        serde_json::to_writer(&mut writer, &node)?;
        writer
            .write_all(b"\n")
            .map_err(|e| Error::io("<graph writer>", e))?;
    }
    writer.flush().map_err(|e| Error::io("<graph writer>", e))?;
    Ok(graph
        .edges()
        .filter(|e| !graph.contains_node(&e.from))
        .count())
}

/// Persist `graph` to `path`, replacing it atomically (temp file + rename).
pub fn dump_graph(graph: &Graph, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    let skipped = write_graph(graph, BufWriter::new(tmp.as_file()))?;
    if skipped > 0 {
        warn!(
            "Dropped {} edge(s) whose source is not a defined node while writing {}",
            skipped,
            path.display()
        );
    }
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    debug!(
        "Wrote {} nodes to {}",
        graph.node_count(),
        path.display()
    );
    Ok(())
}
