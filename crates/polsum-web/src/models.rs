use serde::Serialize;
use uuid::Uuid;

use polsum_core::{ErrorKind, ExtractedText, StructuredResult, SummaryOptions};
use polsum_pipeline::DocumentRecord;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub status: &'static str,
}

/// The poll-able status contract: safe to call arbitrarily often,
/// reflects the latest terminal state once reached.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub has_result: bool,
    pub has_summary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&DocumentRecord> for StatusResponse {
    fn from(record: &DocumentRecord) -> Self {
        StatusResponse {
            status: record.job.status.as_str(),
            has_result: record.structured.is_some(),
            has_summary: record.active_summary().is_some(),
            error_kind: record.job.error_kind,
            error_message: record.job.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryJson {
    pub version: u32,
    pub text: String,
    pub options: SummaryOptions,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub media_type: String,
    /// Bounded prefix of the cleaned extracted text, with provenance.
    pub extracted: Option<ExtractedText>,
    pub structured: Option<StructuredResult>,
    pub summary: Option<SummaryJson>,
}

impl From<&DocumentRecord> for ResultResponse {
    fn from(record: &DocumentRecord) -> Self {
        ResultResponse {
            document_id: record.id,
            filename: record.filename.clone(),
            media_type: record.media_type.as_str().to_string(),
            extracted: record.extracted.clone(),
            structured: record.structured.clone(),
            summary: record.active_summary().map(|s| SummaryJson {
                version: s.version,
                text: s.text.clone(),
                options: s.options.clone(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub version: u32,
    pub text: String,
    pub options: SummaryOptions,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
