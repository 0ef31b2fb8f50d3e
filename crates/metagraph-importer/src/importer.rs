//! Import orchestrator: file → cached, reproducible patch

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::{AbortRegistration, Abortable};
use futures_util::stream::{self, StreamExt};
use metagraph_core::{ContentHash, Graph, Node, Patch, diff_graphs};
use tracing::{debug, info, instrument, warn};

use crate::ai::AiExtractor;
use crate::cache::{FsCache, PatchCache};
use crate::config::MetagraphConfig;
use crate::error::{ExtractionError, ImportError};
use crate::extractor::ArtefactExtractor;
use crate::formats::ArtefactFormat;
use crate::strategy::{DEFAULT_MAX_DETERMINISTIC_BYTES, Strategy, select_strategy};

/// Result of a multi-file import that keeps going past failures.
#[derive(Debug, Default)]
pub struct BatchImport {
    /// Patches of the files that imported, concatenated in input order.
    pub patch: Patch,
    pub imported: usize,
    pub failures: Vec<(PathBuf, ImportError)>,
}

impl BatchImport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Importer {
    cache: Arc<dyn PatchCache>,
    extractors: HashMap<ArtefactFormat, Arc<dyn ArtefactExtractor>>,
    ai: Option<Arc<dyn ArtefactExtractor>>,
    max_deterministic_bytes: u64,
    concurrency: usize,
}

impl Importer {
    pub fn new(cache: Arc<dyn PatchCache>) -> Self {
        let extractors = [ArtefactFormat::Sql, ArtefactFormat::Markdown]
            .into_iter()
            .map(|format| (format, format.extractor()))
            .collect();
        Self {
            cache,
            extractors,
            ai: None,
            max_deterministic_bytes: DEFAULT_MAX_DETERMINISTIC_BYTES,
            concurrency: 4,
        }
    }

    /// Filesystem cache, limits and AI provider as configured.
    pub fn from_config(config: &MetagraphConfig) -> Result<Self, ImportError> {
        let cache = Arc::new(FsCache::new(&config.import.cache_dir));
        let mut importer = Self::new(cache)
            .with_max_deterministic_bytes(config.import.max_deterministic_bytes)
            .with_concurrency(config.import.concurrency);
        let provider = config
            .ai_provider()
            .map_err(|e| ImportError::Provider(format!("{e:#}")))?;
        if let Some(provider) = provider {
            info!("AI extraction enabled via {}", provider.name());
            importer = importer.with_ai(Arc::new(AiExtractor::new(provider)));
        }
        Ok(importer)
    }

    pub fn with_ai(mut self, extractor: Arc<dyn ArtefactExtractor>) -> Self {
        self.ai = Some(extractor);
        self
    }

    /// Replace the deterministic extractor for `format`.
    pub fn with_extractor(mut self, format: ArtefactFormat, extractor: Arc<dyn ArtefactExtractor>) -> Self {
        self.extractors.insert(format, extractor);
        self
    }

    pub fn with_max_deterministic_bytes(mut self, bytes: u64) -> Self {
        self.max_deterministic_bytes = bytes;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &dyn PatchCache {
        self.cache.as_ref()
    }

    /// Import one file, answering from the cache when its bytes were seen before.
    pub async fn import_file(&self, path: &Path) -> Result<Patch, ImportError> {
        self.run(path, None).await
    }

    /// Like [`Importer::import_file`], abandoning extraction once the paired
    /// `AbortHandle` fires. A cancelled import caches nothing.
    pub async fn import_file_abortable(
        &self,
        path: &Path,
        registration: AbortRegistration,
    ) -> Result<Patch, ImportError> {
        self.run(path, Some(registration)).await
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn run(&self, path: &Path, abort: Option<AbortRegistration>) -> Result<Patch, ImportError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let size = bytes.len() as u64;
        let strategy = select_strategy(path, size, self.max_deterministic_bytes, self.ai.is_some())?;

        let key = ContentHash::of(&bytes);
        match self.cache.get(&key) {
            Ok(Some(patch)) => {
                debug!("Cache hit for {} ({})", path.display(), key);
                return Ok(patch);
            }
            Ok(None) => debug!("Cache miss for {} ({})", path.display(), key),
            Err(e) => warn!("Ignoring cache entry for {}: {}", path.display(), e),
        }

        let text = String::from_utf8(bytes).map_err(|_| ExtractionError::NotText(path.to_path_buf()))?;
        let extraction = self.extract(strategy, path, &text);
        let nodes = match abort {
            Some(registration) => Abortable::new(extraction, registration)
                .await
                .map_err(|_| ImportError::Cancelled {
                    path: path.to_path_buf(),
                })??,
            None => extraction.await?,
        };

        let patch = patch_from_nodes(nodes);
        if let Err(e) = self.cache.put(&key, &patch) {
            warn!("Could not cache import of {}: {}", path.display(), e);
        }
        Ok(patch)
    }

    async fn extract(&self, strategy: Strategy, path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError> {
        let extractor = match strategy {
            Strategy::Deterministic(format) => {
                if text.len() as u64 > self.max_deterministic_bytes {
                    info!(
                        "{} exceeds {} bytes but no AI provider is configured, parsing deterministically",
                        path.display(),
                        self.max_deterministic_bytes
                    );
                }
                self.extractors
                    .get(&format)
                    .ok_or_else(|| ExtractionError::Unsupported(path.to_path_buf()))?
            }
            Strategy::Ai => self
                .ai
                .as_ref()
                .ok_or_else(|| ExtractionError::Unsupported(path.to_path_buf()))?,
        };
        debug!("Extracting {} with {}", path.display(), extractor.name());
        extractor.extract(path, text).await
    }

    /// Import every file, up to `concurrency` at a time, collecting failures
    /// instead of stopping. Earlier files' patches survive later failures.
    pub async fn import_files(&self, paths: &[PathBuf]) -> BatchImport {
        let mut batch = BatchImport::default();
        let mut results = stream::iter(paths)
            .map(|path| async move { (path, self.import_file(path).await) })
            .buffered(self.concurrency);

        while let Some((path, result)) = results.next().await {
            match result {
                Ok(patch) => {
                    batch.imported += 1;
                    batch.patch.extend(patch);
                }
                Err(e) => {
                    warn!("Import failed for {}: {}", path.display(), e);
                    batch.failures.push((path.clone(), e));
                }
            }
        }
        info!(
            "Imported {}/{} files into {} ops",
            batch.imported,
            paths.len(),
            batch.patch.len()
        );
        batch
    }

    /// Import every file, stopping at the first failure in input order.
    /// Imports still in flight at that point are dropped and cache nothing.
    pub async fn import_files_strict(&self, paths: &[PathBuf]) -> Result<Patch, ImportError> {
        let mut patch = Patch::new();
        let mut results = stream::iter(paths)
            .map(|path| self.import_file(path))
            .buffered(self.concurrency);
        while let Some(result) = results.next().await {
            patch.extend(result?);
        }
        Ok(patch)
    }
}

/// Diff the extracted nodes against an empty graph.
pub fn patch_from_nodes(nodes: Vec<Node>) -> Patch {
    let extracted: Graph = nodes.into_iter().collect();
    diff_graphs(&Graph::new(), &extracted)
}
