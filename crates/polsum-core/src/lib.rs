use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod chunk;
pub mod clean;
pub mod config_file;
pub mod merge;

// Re-export for convenience
pub use chunk::split_into_chunks;
pub use clean::clean_text;
pub use merge::merge_results;

/// Media types accepted by the pipeline. Everything else is rejected at
/// the upload boundary, before a job is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Docx => "docx",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document: raw bytes plus declared media type and filename.
/// Never mutated; consumed by the extraction cascade.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type,
            bytes,
        }
    }
}

/// Text recovered from a document, with provenance.
///
/// Invariant: `text` is non-empty after a successful cascade run — a
/// cascade that recovers nothing usable fails instead of returning an
/// empty success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    /// Name of the strategy that produced this text.
    pub strategy_used: String,
    pub pages_recovered: usize,
    pub total_pages: usize,
}

/// A bounded slice of cleaned text submitted to the analyzer independently.
///
/// Chunks are produced in document order and must be merged in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub total_chunks: usize,
    pub content: String,
}

/// One coverage entry extracted from a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coverage {
    pub name: String,
    pub limit: Option<String>,
    pub deductible: Option<String>,
    pub description: Option<String>,
}

/// A contact listed in a policy (claims line, broker, insurer support).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub label: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// The analyzer's structured extraction of policy fields from text.
///
/// Validated with serde at the analyzer-response boundary; every field
/// defaults so a sparse but well-formed response still parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredResult {
    pub policy_type: Option<String>,
    pub insurer: Option<String>,
    pub policy_number: Option<String>,
    pub effective_dates: Option<String>,
    pub coverages: Vec<Coverage>,
    pub exclusions: Vec<String>,
    pub contacts: Vec<Contact>,
    /// Free-text explanation of the policy. On merge, the longest
    /// non-empty value across chunks wins.
    pub explanation: Option<String>,
    pub confidence: Option<f64>,
    pub warnings: Vec<String>,
}

impl StructuredResult {
    /// The documented default returned when no chunk produced a usable
    /// analysis. Never an error: downstream steps (summary, storage)
    /// handle this like any other result.
    pub fn undetermined() -> Self {
        Self {
            explanation: Some(
                "Unable to determine policy details from the document.".to_string(),
            ),
            confidence: Some(0.0),
            warnings: vec!["analysis produced no usable structured data".to_string()],
            ..Default::default()
        }
    }
}

/// Lifecycle of a processing job. `Pending` transitions exactly once to
/// one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

/// Classified failure causes persisted with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No extraction strategy yielded usable text.
    Unextractable,
    /// An analyzer call exceeded its deadline after retries were exhausted.
    AnalysisTimeout,
    /// The analyzer reported a transport or service error.
    AnalysisUpstream,
    /// The analyzer responded, but the payload did not match the schema.
    AnalysisParse,
    /// The whole pipeline exceeded its overall deadline.
    JobTimeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unextractable => "unextractable",
            ErrorKind::AnalysisTimeout => "analysis_timeout",
            ErrorKind::AnalysisUpstream => "analysis_upstream",
            ErrorKind::AnalysisParse => "analysis_parse",
            ErrorKind::JobTimeout => "job_timeout",
        }
    }

    /// Actionable guidance shown to the user alongside a failed status.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Unextractable => {
                "No readable text could be recovered from this document. It may be \
                 a scanned image or corrupted — try a text-based PDF or DOCX, or \
                 re-export the document from its source."
            }
            ErrorKind::AnalysisTimeout => {
                "The analysis service did not respond in time. The service may be \
                 under load — please retry shortly."
            }
            ErrorKind::AnalysisUpstream => {
                "The analysis service is temporarily unavailable. Please retry \
                 shortly."
            }
            ErrorKind::AnalysisParse => {
                "The analysis service returned an unexpected response. Please retry; \
                 if the problem persists, contact support."
            }
            ErrorKind::JobTimeout => {
                "Processing did not finish within the allotted time. The document \
                 may be too large or complex — try splitting it into smaller files, \
                 or retry later."
            }
        }
    }
}

/// One background processing job. Owned exclusively by the job runner
/// from creation until a terminal status is written.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub document_id: Uuid,
    pub status: JobStatus,
    pub started_at: SystemTime,
    pub finished_at: Option<SystemTime>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl ProcessingJob {
    pub fn pending(document_id: Uuid) -> Self {
        Self {
            document_id,
            status: JobStatus::Pending,
            started_at: SystemTime::now(),
            finished_at: None,
            error_kind: None,
            error_message: None,
        }
    }
}

/// Which prompt profile produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryProfile {
    /// The normal narrative prompt.
    Standard,
    /// Stricter, simpler prompt used for the single truncation-repair pass.
    Strict,
    /// Deterministic template built directly from the structured result.
    Template,
}

/// How a summary was produced; stored with each version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub profile: SummaryProfile,
    /// True when the truncation heuristic fired and a regeneration ran.
    pub repaired: bool,
    /// True when the analyzer was unavailable and the template was used.
    pub fallback: bool,
}

/// One versioned summary text. Exactly one version per document is
/// active at a time; regeneration appends a new active version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryVersion {
    pub version: u32,
    pub text: String,
    pub options: SummaryOptions,
    pub active: bool,
    #[serde(skip)]
    pub created_at: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undetermined_result_carries_warning() {
        let r = StructuredResult::undetermined();
        assert!(r.policy_type.is_none());
        assert!(r.coverages.is_empty());
        assert!(!r.warnings.is_empty());
        assert_eq!(r.confidence, Some(0.0));
    }

    #[test]
    fn sparse_json_parses_with_defaults() {
        let r: StructuredResult = serde_json::from_str(r#"{"policy_type": "auto"}"#).unwrap();
        assert_eq!(r.policy_type.as_deref(), Some("auto"));
        assert!(r.coverages.is_empty());
        assert!(r.confidence.is_none());
    }

    #[test]
    fn status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let s = serde_json::to_string(&ErrorKind::AnalysisTimeout).unwrap();
        assert_eq!(s, r#""analysis_timeout""#);
    }
}
