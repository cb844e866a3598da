//! Storage collaborator. The real deployment backs this with a
//! relational store; the pipeline only relies on this trait, so tests
//! and the bundled server use the in-memory implementation. Access is
//! single-record upserts keyed by document id — no cross-document
//! transactions.

use std::time::SystemTime;

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use polsum_core::{
    ErrorKind, ExtractedText, JobStatus, MediaType, ProcessingJob, StructuredResult,
    SummaryOptions, SummaryVersion,
};

/// Everything stored for one uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub media_type: MediaType,
    pub job: ProcessingJob,
    /// Bounded prefix of the cleaned extracted text, with provenance.
    pub extracted: Option<ExtractedText>,
    pub structured: Option<StructuredResult>,
    pub summaries: Vec<SummaryVersion>,
}

impl DocumentRecord {
    pub fn active_summary(&self) -> Option<&SummaryVersion> {
        self.summaries.iter().find(|s| s.active)
    }
}

/// Partial update applied to a document record.
#[derive(Debug, Default)]
pub struct DocumentUpdate {
    pub status: Option<JobStatus>,
    pub error: Option<(ErrorKind, String)>,
    pub extracted: Option<ExtractedText>,
    pub structured: Option<StructuredResult>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(Uuid),
    #[error("job for document {0} already reached a terminal state")]
    TerminalState(Uuid),
}

pub trait DocumentStore: Send + Sync {
    /// Create a document with a fresh id and a `Pending` job. The id is
    /// visible to status pollers immediately, before processing starts.
    fn create_document(&self, filename: &str, media_type: MediaType) -> DocumentRecord;

    /// Apply a partial update. Writing a second terminal status is
    /// refused: the `Pending -> terminal` transition happens exactly once.
    fn update_document(&self, id: Uuid, update: DocumentUpdate) -> Result<(), StoreError>;

    /// Append a new summary version and mark it active, deactivating all
    /// previous versions.
    fn create_summary_version(
        &self,
        id: Uuid,
        text: String,
        options: SummaryOptions,
    ) -> Result<SummaryVersion, StoreError>;

    fn get_document(&self, id: Uuid) -> Option<DocumentRecord>;
}

/// In-memory [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<Uuid, DocumentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn create_document(&self, filename: &str, media_type: MediaType) -> DocumentRecord {
        let id = Uuid::new_v4();
        let record = DocumentRecord {
            id,
            filename: filename.to_string(),
            media_type,
            job: ProcessingJob::pending(id),
            extracted: None,
            structured: None,
            summaries: Vec::new(),
        };
        self.docs.insert(id, record.clone());
        record
    }

    fn update_document(&self, id: Uuid, update: DocumentUpdate) -> Result<(), StoreError> {
        let mut record = self.docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(status) = update.status {
            if record.job.status.is_terminal() {
                return Err(StoreError::TerminalState(id));
            }
            if status.is_terminal() {
                record.job.finished_at = Some(SystemTime::now());
            }
            record.job.status = status;
        }
        if let Some((kind, message)) = update.error {
            record.job.error_kind = Some(kind);
            record.job.error_message = Some(message);
        }
        if let Some(extracted) = update.extracted {
            record.extracted = Some(extracted);
        }
        if let Some(structured) = update.structured {
            record.structured = Some(structured);
        }
        Ok(())
    }

    fn create_summary_version(
        &self,
        id: Uuid,
        text: String,
        options: SummaryOptions,
    ) -> Result<SummaryVersion, StoreError> {
        let mut record = self.docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        for existing in record.summaries.iter_mut() {
            existing.active = false;
        }
        let version = SummaryVersion {
            version: record.summaries.len() as u32 + 1,
            text,
            options,
            active: true,
            created_at: Some(SystemTime::now()),
        };
        record.summaries.push(version.clone());
        Ok(version)
    }

    fn get_document(&self, id: Uuid) -> Option<DocumentRecord> {
        self.docs.get(&id).map(|r| r.value().clone())
    }
}
