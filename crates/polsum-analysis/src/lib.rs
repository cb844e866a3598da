use std::time::Duration;

use thiserror::Error;

pub mod backend;
pub mod http;
pub mod mock;
pub mod retry;
pub mod summary;

pub use backend::{AnalyzerBackend, AnalyzerFuture, SummaryRequest};
pub use http::HttpAnalyzer;
pub use retry::{RetryPolicy, RetryingAnalyzerClient};
pub use summary::{
    CompletenessCheck, HeuristicCompleteness, SummaryConfig, SummaryGenerator, template_summary,
};

use polsum_core::ErrorKind;

/// Failure modes of a single analyzer interaction.
///
/// `Timeout` and `Upstream` are transient and retried; `Parse` means the
/// service broke its response contract and is surfaced after one salvage
/// attempt.
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("analyzer call exceeded its {}s deadline", .0.as_secs())]
    Timeout(Duration),
    #[error("analyzer upstream failure: {0}")]
    Upstream(String),
    #[error("analyzer response did not match the expected schema: {0}")]
    Parse(String),
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Timeout(_) | AnalysisError::Upstream(_))
    }

    /// The persisted classification for this error when it reaches the
    /// job-runner boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Timeout(_) => ErrorKind::AnalysisTimeout,
            AnalysisError::Upstream(_) => ErrorKind::AnalysisUpstream,
            AnalysisError::Parse(_) => ErrorKind::AnalysisParse,
            // Cancellation only happens when the overall deadline fires.
            AnalysisError::Cancelled => ErrorKind::JobTimeout,
        }
    }
}
