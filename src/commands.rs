//! CLI command implementations

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use metagraph_core::{
    Error, Graph, Node, NodeKind, apply_json, diff_graphs, dump_graph, dump_patch, load_graph,
    validate_graph,
};
use metagraph_importer::{ArtefactExtractor, ArtefactFormat, FsCache, Importer, MetagraphConfig, PatchCache};

pub async fn build(config: &MetagraphConfig, files: &[PathBuf], output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| config.graph.clone());
    let mut graph = load_graph(&output)?;
    let before = graph.node_count();

    for path in files {
        let Some(format) = ArtefactFormat::from_path(path) else {
            tracing::warn!("Skipping {}: no parser for this file type", path.display());
            continue;
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let nodes = format.extractor().extract(path, &text).await?;
        tracing::debug!("{}: {} nodes", path.display(), nodes.len());
        graph.extend(nodes);
    }

    check(&graph)?;
    dump_graph(&graph, &output)?;
    tracing::info!(
        "Built {} ({} new nodes, {} total, {} edges)",
        output.display(),
        graph.node_count() - before,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(())
}

pub fn show(config: &MetagraphConfig, graph: Option<PathBuf>) -> anyhow::Result<()> {
    let path = graph.unwrap_or_else(|| config.graph.clone());
    let graph = load_graph(&path)?;

    let mut by_kind: BTreeMap<NodeKind, Vec<Node>> = BTreeMap::new();
    for node in graph.nodes() {
        by_kind.entry(node.kind).or_default().push(node);
    }

    println!(
        "{}: {} nodes, {} edges",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    for (kind, nodes) in &by_kind {
        println!("{} ({})", kind, nodes.len());
        for node in nodes {
            let label = node
                .prop_str("name")
                .or_else(|| node.prop_str("title"))
                .unwrap_or("");
            println!("  {}  {}", node.id, label);
        }
    }

    let unresolved = graph.unresolved();
    if !unresolved.is_empty() {
        println!("Unresolved ({})", unresolved.len());
        for id in unresolved {
            println!("  {}", id);
        }
    }
    Ok(())
}

pub fn diff(old: &Path, new: &Path) -> anyhow::Result<()> {
    let patch = diff_graphs(&load_graph(old)?, &load_graph(new)?);
    println!("{}", patch.to_json_pretty()?);
    Ok(())
}

pub async fn import(
    config: &MetagraphConfig,
    files: &[PathBuf],
    output: Option<PathBuf>,
    strict: bool,
) -> anyhow::Result<()> {
    let importer = Importer::from_config(config)?;

    let (patch, failures) = if strict {
        (importer.import_files_strict(files).await?, Vec::new())
    } else {
        let batch = importer.import_files(files).await;
        (batch.patch, batch.failures)
    };

    match output {
        Some(path) => {
            dump_patch(&patch, &path)?;
            tracing::info!("Wrote {} ops to {}", patch.len(), path.display());
        }
        None => println!("{}", patch.to_json_pretty()?),
    }

    if !failures.is_empty() {
        for (path, e) in &failures {
            eprintln!("  {}: {}", path.display(), e);
        }
        anyhow::bail!("{} of {} file(s) failed to import", failures.len(), files.len());
    }
    Ok(())
}

pub fn apply(config: &MetagraphConfig, patch: &Path, graph: Option<PathBuf>) -> anyhow::Result<()> {
    let graph_path = graph.unwrap_or_else(|| config.graph.clone());
    let mut graph = load_graph(&graph_path)?;

    let text = std::fs::read_to_string(patch)
        .with_context(|| format!("Failed to read patch {}", patch.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Patch {} is not JSON", patch.display()))?;
    let summary = apply_json(&mut graph, &value)?;

    check(&graph).context("Patched graph is invalid, not saved")?;
    dump_graph(&graph, &graph_path)?;
    tracing::info!(
        "Applied {} to {}: +{} -{} nodes, +{} -{} edges",
        patch.display(),
        graph_path.display(),
        summary.nodes_added,
        summary.nodes_removed,
        summary.edges_added,
        summary.edges_removed
    );
    Ok(())
}

pub fn validate(config: &MetagraphConfig, graph: Option<PathBuf>) -> anyhow::Result<()> {
    let path = graph.unwrap_or_else(|| config.graph.clone());
    let graph = load_graph(&path)?;
    check(&graph)?;
    println!("{}: {} nodes valid", path.display(), graph.node_count());
    Ok(())
}

pub fn clear_cache(config: &MetagraphConfig) -> anyhow::Result<()> {
    tracing::info!("Clearing cache: {}", config.import.cache_dir.display());

    FsCache::new(&config.import.cache_dir).clear()?;

    tracing::info!("Cache cleared");
    Ok(())
}

/// Validate, printing every violation before failing.
fn check(graph: &Graph) -> anyhow::Result<()> {
    match validate_graph(graph) {
        Ok(()) => Ok(()),
        Err(Error::SchemaViolation(violations)) => {
            for violation in violations.iter() {
                eprintln!("  {}", violation);
            }
            anyhow::bail!("{} schema violation(s)", violations.len())
        }
        Err(e) => Err(e.into()),
    }
}
