//! Retrying analyzer client: per-attempt deadlines, exponential backoff,
//! and schema validation at the response boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use polsum_core::{StructuredResult, TextChunk};

use crate::backend::AnalyzerBackend;
use crate::AnalysisError;

/// Retry tuning. All three knobs are deployment-profile values, not
/// hard-coded: constrained environments want more attempts with longer
/// waits, local profiles the opposite.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// At least one retry must always occur, whatever the config says.
    pub fn normalized(mut self) -> Self {
        if self.max_attempts < 2 {
            self.max_attempts = 2;
        }
        if self.base_delay.is_zero() {
            self.base_delay = Duration::from_millis(1);
        }
        self
    }

    /// Delay before the attempt following `attempt` (1-based), with up to
    /// 10% jitter so concurrent chunk retries don't align.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = if self.exponential {
            self.base_delay
                .saturating_mul(1u32 << (attempt - 1).min(10))
        } else {
            self.base_delay
        };
        let jitter_ms = (base.as_millis() as u64 / 10).max(1);
        base + Duration::from_millis(fastrand::u64(0..jitter_ms))
    }
}

/// Wraps an [`AnalyzerBackend`] with per-attempt deadlines and bounded
/// retry. Parse failures are a contract violation, not transience, and
/// are not retried — one brace-substring salvage pass runs first.
pub struct RetryingAnalyzerClient {
    backend: Arc<dyn AnalyzerBackend>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl RetryingAnalyzerClient {
    pub fn new(
        backend: Arc<dyn AnalyzerBackend>,
        policy: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            policy: policy.normalized(),
            call_timeout,
        }
    }

    pub fn backend(&self) -> Arc<dyn AnalyzerBackend> {
        Arc::clone(&self.backend)
    }

    /// Analyze one chunk, retrying transient failures with backoff.
    pub async fn analyze_chunk(
        &self,
        chunk: &TextChunk,
        cancel: &CancellationToken,
    ) -> Result<StructuredResult, AnalysisError> {
        let mut last_err = AnalysisError::Upstream("analyzer was never called".into());

        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            let call = self.backend.analyze(&chunk.content, self.call_timeout);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                result = tokio::time::timeout(self.call_timeout, call) => result,
            };

            match outcome {
                // The in-flight call is dropped when the deadline fires.
                Err(_) => {
                    tracing::warn!(chunk = chunk.index, attempt, "analyzer attempt hit deadline");
                    last_err = AnalysisError::Timeout(self.call_timeout);
                }
                Ok(Ok(payload)) => return parse_structured(&payload),
                Ok(Err(e)) if e.is_retryable() => {
                    tracing::warn!(
                        chunk = chunk.index,
                        attempt,
                        error = %e,
                        "analyzer attempt failed"
                    );
                    last_err = e;
                }
                Ok(Err(e)) => return Err(e),
            }

            if attempt < self.policy.max_attempts {
                let delay = self.policy.delay_for(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(last_err)
    }

    /// Analyze all chunks concurrently — the calls are independent and
    /// stateless — and reassemble results by original index, never by
    /// completion order.
    pub async fn analyze_chunks(
        self: &Arc<Self>,
        chunks: &[TextChunk],
        cancel: &CancellationToken,
    ) -> Vec<Result<StructuredResult, AnalysisError>> {
        let mut join_set = tokio::task::JoinSet::new();
        for chunk in chunks.iter().cloned() {
            let client = Arc::clone(self);
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let result = client.analyze_chunk(&chunk, &cancel).await;
                (chunk.index, result)
            });
        }

        let mut results: Vec<Option<Result<StructuredResult, AnalysisError>>> =
            (0..chunks.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            if let Ok((index, result)) = joined
                && index < results.len()
            {
                results[index] = Some(result);
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(AnalysisError::Upstream("analysis task aborted".into())))
            })
            .collect()
    }
}

/// Validate an analyzer payload against the expected schema. Malformed
/// payloads get one salvage pass — extract the largest brace-delimited
/// substring and retry the parse — before the error is surfaced.
pub(crate) fn parse_structured(payload: &str) -> Result<StructuredResult, AnalysisError> {
    match serde_json::from_str::<StructuredResult>(payload) {
        Ok(result) => Ok(result),
        Err(first_err) => {
            if let Some(candidate) = largest_brace_substring(payload)
                && let Ok(result) = serde_json::from_str::<StructuredResult>(candidate)
            {
                tracing::debug!("schema salvage recovered a result from a noisy payload");
                return Ok(result);
            }
            Err(AnalysisError::Parse(first_err.to_string()))
        }
    }
}

fn largest_brace_substring(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}
