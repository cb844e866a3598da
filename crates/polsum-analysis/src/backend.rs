//! Analyzer backend trait: the abstract external text-analysis capability.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

use polsum_core::{StructuredResult, SummaryProfile};

use crate::AnalysisError;

pub type AnalyzerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>;

/// A remote analysis service, modeled as two calls with latency and
/// failure. Both return raw payloads; parsing and schema validation
/// happen at the client boundary, not inside the backend.
pub trait AnalyzerBackend: Send + Sync {
    /// The canonical name of this backend (e.g., "http", "mock").
    fn name(&self) -> &str;

    /// Extract structured policy fields from a chunk of text. The payload
    /// is expected to be a JSON document matching [`StructuredResult`].
    fn analyze<'a>(&'a self, text: &'a str, timeout: Duration) -> AnalyzerFuture<'a>;

    /// Produce a narrative summary of an already-structured result. The
    /// payload is the summary text itself.
    fn summarize<'a>(&'a self, request: &'a SummaryRequest, timeout: Duration)
    -> AnalyzerFuture<'a>;
}

/// Parameters for a narrative summary request.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest {
    pub structured: StructuredResult,
    pub target_paragraphs: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub profile: SummaryProfile,
}
