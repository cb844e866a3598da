//! Background job runner: one task per uploaded document, racing the
//! whole pipeline against an overall deadline.
//!
//! Every exit path writes a terminal status through the storage
//! collaborator — a job can fail, but it can never leave a document
//! stuck in `Pending`, and it never takes the host process down.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use polsum_analysis::{AnalysisError, RetryingAnalyzerClient, SummaryGenerator};
use polsum_core::config_file::PipelineSection;
use polsum_core::{
    clean_text, merge_results, split_into_chunks, ErrorKind, ExtractedText, JobStatus,
    SourceDocument, StructuredResult, SummaryOptions, SummaryVersion, TextChunk,
};
use polsum_extract::{ExtractError, ExtractionCascade};

use crate::store::{DocumentStore, DocumentUpdate, StoreError};

/// Pipeline-level tunables, distinct from per-component ones.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Overall deadline for one job, extraction through summary.
    pub job_deadline: Duration,
    /// Inputs at or below this character count go to the analyzer in a
    /// single call; longer inputs are chunked.
    pub max_chars: usize,
    pub chunk_size: usize,
    /// Cap on the extracted-text prefix persisted with the record.
    pub stored_text_prefix: usize,
    /// How long cancelled sub-operations get to unwind and release
    /// resources before the failure is recorded.
    pub cancel_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            job_deadline: Duration::from_secs(120),
            max_chars: 12_000,
            chunk_size: 8_000,
            stored_text_prefix: 20_000,
            cancel_grace: Duration::from_secs(2),
        }
    }
}

impl PipelineConfig {
    /// Apply the non-empty fields of a config-file section over this config.
    pub fn overlaid(mut self, section: &PipelineSection) -> Self {
        if let Some(v) = section.job_deadline_secs {
            self.job_deadline = Duration::from_secs(v);
        }
        if let Some(v) = section.max_chars {
            self.max_chars = v;
        }
        if let Some(v) = section.chunk_size {
            self.chunk_size = v;
        }
        if let Some(v) = section.stored_text_prefix_chars {
            self.stored_text_prefix = v;
        }
        self
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("a processing job for document {0} is already running")]
    AlreadyProcessing(Uuid),
}

#[derive(Error, Debug)]
pub enum RegenerateError {
    #[error("a processing job for document {0} is already running")]
    AlreadyProcessing(Uuid),
    #[error("document {0} not found")]
    NotFound(Uuid),
    #[error("document {0} has no analysis result to summarize yet")]
    NotReady(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Internal pipeline failure, classified at the runner boundary.
#[derive(Error, Debug)]
enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("pipeline cancelled by the overall deadline")]
    Cancelled,
    #[error("processing exceeded the {}s overall deadline", .0.as_secs())]
    DeadlineExceeded(Duration),
}

impl PipelineError {
    fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Extract(ExtractError::Cancelled) => ErrorKind::JobTimeout,
            PipelineError::Extract(_) => ErrorKind::Unextractable,
            PipelineError::Cancelled | PipelineError::DeadlineExceeded(_) => ErrorKind::JobTimeout,
        }
    }
}

struct JobOutput {
    extracted: ExtractedText,
    structured: StructuredResult,
    summary_text: String,
    summary_options: SummaryOptions,
}

/// Drives the full pipeline per document. Components are injected, not
/// global: each runner owns its cascade, analyzer client, and summary
/// generator, so tests and deployments configure them independently.
pub struct JobRunner {
    store: Arc<dyn DocumentStore>,
    cascade: Arc<ExtractionCascade>,
    analyzer: Arc<RetryingAnalyzerClient>,
    summarizer: Arc<SummaryGenerator>,
    config: PipelineConfig,
    /// Per-document single-flight guard: no two jobs for the same id.
    inflight: DashMap<Uuid, ()>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cascade: Arc<ExtractionCascade>,
        analyzer: Arc<RetryingAnalyzerClient>,
        summarizer: Arc<SummaryGenerator>,
        config: PipelineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            cascade,
            analyzer,
            summarizer,
            config,
            inflight: DashMap::new(),
        })
    }

    /// Start a background job for an accepted upload. Fire-and-forget:
    /// returns as soon as the task is spawned; progress is observed by
    /// polling the store.
    pub fn spawn(
        self: &Arc<Self>,
        document_id: Uuid,
        source: SourceDocument,
    ) -> Result<(), JobError> {
        if !self.try_claim(document_id) {
            return Err(JobError::AlreadyProcessing(document_id));
        }

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.run(document_id, source).await;
            runner.inflight.remove(&document_id);
        });
        Ok(())
    }

    fn try_claim(&self, document_id: Uuid) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.inflight.entry(document_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    async fn run(&self, document_id: Uuid, source: SourceDocument) {
        tracing::info!(
            document = %document_id,
            filename = %source.filename,
            media = %source.media_type,
            "processing job started"
        );

        let cancel = CancellationToken::new();
        let work = self.process(document_id, source, &cancel);
        tokio::pin!(work);

        let outcome = tokio::select! {
            result = &mut work => result,
            _ = tokio::time::sleep(self.config.job_deadline) => {
                tracing::warn!(
                    document = %document_id,
                    deadline_secs = self.config.job_deadline.as_secs(),
                    "overall deadline elapsed; cancelling in-flight work"
                );
                cancel.cancel();
                // Let sub-operations unwind and release their resources
                // (child processes, temp dirs) before recording failure.
                let _ = tokio::time::timeout(self.config.cancel_grace, &mut work).await;
                Err(PipelineError::DeadlineExceeded(self.config.job_deadline))
            }
        };

        match outcome {
            Ok(output) => self.finish_success(document_id, output),
            Err(e) => self.finish_failure(document_id, e),
        }
    }

    async fn process(
        &self,
        document_id: Uuid,
        source: SourceDocument,
        cancel: &CancellationToken,
    ) -> Result<JobOutput, PipelineError> {
        let raw = self.cascade.extract(source, cancel).await?;

        let cleaned = clean_text(&raw.text);
        if cleaned.is_empty() {
            return Err(PipelineError::Extract(ExtractError::Unextractable {
                hint: "extracted text was empty after normalization".into(),
            }));
        }

        let char_count = cleaned.chars().count();
        let chunks = if char_count <= self.config.max_chars {
            vec![TextChunk {
                index: 0,
                total_chunks: 1,
                content: cleaned.clone(),
            }]
        } else {
            tracing::info!(
                document = %document_id,
                chars = char_count,
                chunk_size = self.config.chunk_size,
                "input exceeds single-call limit; chunking"
            );
            split_into_chunks(&cleaned, self.config.chunk_size)
        };

        let results = self.analyzer.analyze_chunks(&chunks, cancel).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Per-chunk failures are absorbed: the document still gets a
        // result from whatever survived, down to the undetermined
        // default when nothing did.
        let total = results.len();
        let mut survived: Vec<StructuredResult> = Vec::with_capacity(total);
        let mut failed = 0usize;
        let mut first_failure: Option<AnalysisError> = None;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(r) => survived.push(r),
                Err(e) => {
                    tracing::warn!(
                        document = %document_id,
                        chunk = index,
                        error = %e,
                        "chunk analysis failed; continuing without it"
                    );
                    failed += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }

        let mut structured = merge_results(&survived);
        if failed > 0 {
            let cause = first_failure
                .map(|e| e.kind().as_str())
                .unwrap_or("unknown");
            structured.warnings.push(format!(
                "{failed} of {total} sections could not be analyzed ({cause})"
            ));
        }

        let (summary_text, summary_options) =
            self.summarizer.summarize(&structured, cancel).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let extracted = ExtractedText {
            text: truncate_chars(&cleaned, self.config.stored_text_prefix),
            strategy_used: raw.strategy_used,
            pages_recovered: raw.pages_recovered,
            total_pages: raw.total_pages,
        };

        Ok(JobOutput {
            extracted,
            structured,
            summary_text,
            summary_options,
        })
    }

    fn finish_success(&self, document_id: Uuid, output: JobOutput) {
        let update = DocumentUpdate {
            status: Some(JobStatus::Succeeded),
            extracted: Some(output.extracted),
            structured: Some(output.structured),
            ..Default::default()
        };
        if let Err(e) = self.store.update_document(document_id, update) {
            tracing::error!(document = %document_id, error = %e, "failed to persist success");
            return;
        }
        if let Err(e) =
            self.store
                .create_summary_version(document_id, output.summary_text, output.summary_options)
        {
            tracing::error!(document = %document_id, error = %e, "failed to persist summary version");
        }
        tracing::info!(document = %document_id, "processing job succeeded");
    }

    fn finish_failure(&self, document_id: Uuid, error: PipelineError) {
        let kind = error.kind();
        tracing::warn!(
            document = %document_id,
            kind = kind.as_str(),
            error = %error,
            "processing job failed"
        );
        let update = DocumentUpdate {
            status: Some(JobStatus::Failed),
            error: Some((kind, kind.user_message().to_string())),
            ..Default::default()
        };
        if let Err(e) = self.store.update_document(document_id, update) {
            tracing::error!(document = %document_id, error = %e, "failed to persist failure");
        }
    }

    /// Re-run summary generation against the stored structured result,
    /// appending a new active version. Refused while a job for the same
    /// document is in flight.
    pub async fn regenerate_summary(
        &self,
        document_id: Uuid,
    ) -> Result<SummaryVersion, RegenerateError> {
        if !self.try_claim(document_id) {
            return Err(RegenerateError::AlreadyProcessing(document_id));
        }
        let result = self.regenerate_inner(document_id).await;
        self.inflight.remove(&document_id);
        result
    }

    async fn regenerate_inner(
        &self,
        document_id: Uuid,
    ) -> Result<SummaryVersion, RegenerateError> {
        let record = self
            .store
            .get_document(document_id)
            .ok_or(RegenerateError::NotFound(document_id))?;
        if record.job.status != JobStatus::Succeeded {
            return Err(RegenerateError::NotReady(document_id));
        }
        let structured = record
            .structured
            .ok_or(RegenerateError::NotReady(document_id))?;

        let cancel = CancellationToken::new();
        let (text, options) = self.summarizer.summarize(&structured, &cancel).await;
        Ok(self
            .store
            .create_summary_version(document_id, text, options)?)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn config_overlay_applies_only_set_fields() {
        let section = PipelineSection {
            chunk_size: Some(1000),
            job_deadline_secs: Some(30),
            ..Default::default()
        };
        let config = PipelineConfig::default().overlaid(&section);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.job_deadline, Duration::from_secs(30));
        assert_eq!(config.max_chars, 12_000);
    }

    #[test]
    fn extract_errors_classify_as_unextractable() {
        let e = PipelineError::Extract(ExtractError::Extraction("broken".into()));
        assert_eq!(e.kind(), ErrorKind::Unextractable);
    }

    #[test]
    fn deadline_errors_classify_as_job_timeout() {
        assert_eq!(
            PipelineError::DeadlineExceeded(Duration::from_secs(1)).kind(),
            ErrorKind::JobTimeout
        );
        assert_eq!(
            PipelineError::Extract(ExtractError::Cancelled).kind(),
            ErrorKind::JobTimeout
        );
    }
}
