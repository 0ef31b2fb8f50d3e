//! Artefact import for MetaGraph
//!
//! Selects an extraction strategy per file, consults a content-addressed
//! cache and turns extracted nodes into a patch against an empty graph.

pub mod ai;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod formats;
pub mod importer;
pub mod strategy;


pub use cache::{FsCache, MemoryCache, PatchCache};
pub use config::MetagraphConfig;
pub use error::{CacheError, ConfigError, ExtractionError, ImportError};
pub use extractor::ArtefactExtractor;
pub use formats::ArtefactFormat;
pub use importer::{BatchImport, Importer, patch_from_nodes};
pub use strategy::{Strategy, select_strategy};
