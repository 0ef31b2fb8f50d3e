//! AI extraction bridge for MetaGraph
//!
//! Turns free-form artefacts into node records by asking an LLM for a
//! `{"nodes": [...], "errors": [...]}` envelope, validating the answer and
//! retrying once with a repair hint when it does not conform.

pub mod bridge;
pub mod prompt;
pub mod providers;


pub use bridge::*;
pub use providers::create_provider;
