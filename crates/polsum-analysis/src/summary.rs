//! Narrative summary generation with truncation repair and a
//! deterministic fallback.
//!
//! The completeness heuristic is deliberately pluggable: stricter
//! validators can replace it without touching the regeneration control
//! flow.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use polsum_core::{StructuredResult, SummaryOptions, SummaryProfile};

use crate::backend::{AnalyzerBackend, SummaryRequest};
use crate::AnalysisError;

/// Decides whether a generated summary looks complete.
pub trait CompletenessCheck: Send + Sync {
    fn is_complete(&self, text: &str) -> bool;
}

/// Default heuristic: the text must end in terminal punctuation AND
/// contain at least the expected number of paragraph breaks.
pub struct HeuristicCompleteness {
    pub min_paragraph_breaks: usize,
}

impl CompletenessCheck for HeuristicCompleteness {
    fn is_complete(&self, text: &str) -> bool {
        let trimmed = text.trim_end();
        let ends_terminally = trimmed.ends_with(['.', '!', '?']);
        let paragraph_breaks = trimmed.matches("\n\n").count();
        ends_terminally && paragraph_breaks >= self.min_paragraph_breaks
    }
}

/// Target shape of the narrative summary.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub target_paragraphs: usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            target_paragraphs: 3,
            min_words: 120,
            max_words: 250,
        }
    }
}

/// Requests a narrative summary, repairs truncated output once, and
/// falls back to a deterministic template on analyzer failure — so
/// summary generation never hard-fails a job.
pub struct SummaryGenerator {
    backend: Arc<dyn AnalyzerBackend>,
    checker: Box<dyn CompletenessCheck>,
    config: SummaryConfig,
    call_timeout: Duration,
}

impl SummaryGenerator {
    pub fn new(
        backend: Arc<dyn AnalyzerBackend>,
        config: SummaryConfig,
        call_timeout: Duration,
    ) -> Self {
        let checker = Box::new(HeuristicCompleteness {
            min_paragraph_breaks: config.target_paragraphs.saturating_sub(1),
        });
        Self {
            backend,
            checker,
            config,
            call_timeout,
        }
    }

    /// Substitute a different completeness validator.
    pub fn with_checker(mut self, checker: Box<dyn CompletenessCheck>) -> Self {
        self.checker = checker;
        self
    }

    /// Produce a summary. Never fails: the worst case is the template.
    pub async fn summarize(
        &self,
        result: &StructuredResult,
        cancel: &CancellationToken,
    ) -> (String, SummaryOptions) {
        let first = match self.request(result, SummaryProfile::Standard, cancel).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("analyzer returned an empty summary; using template fallback");
                return template_outcome(result);
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed; using template fallback");
                return template_outcome(result);
            }
        };

        if self.checker.is_complete(&first) {
            return (
                first,
                SummaryOptions {
                    profile: SummaryProfile::Standard,
                    repaired: false,
                    fallback: false,
                },
            );
        }

        // Exactly one regeneration, strictly sequential with the first
        // attempt. Kept only if strictly longer.
        tracing::info!("summary looks truncated; regenerating once with the strict profile");
        match self.request(result, SummaryProfile::Strict, cancel).await {
            Ok(second) if second.trim().chars().count() > first.trim().chars().count() => (
                second,
                SummaryOptions {
                    profile: SummaryProfile::Strict,
                    repaired: true,
                    fallback: false,
                },
            ),
            _ => (
                first,
                SummaryOptions {
                    profile: SummaryProfile::Standard,
                    repaired: true,
                    fallback: false,
                },
            ),
        }
    }

    async fn request(
        &self,
        result: &StructuredResult,
        profile: SummaryProfile,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let request = SummaryRequest {
            structured: result.clone(),
            target_paragraphs: self.config.target_paragraphs,
            min_words: self.config.min_words,
            max_words: self.config.max_words,
            profile,
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            outcome = tokio::time::timeout(
                self.call_timeout,
                self.backend.summarize(&request, self.call_timeout),
            ) => match outcome {
                Err(_) => Err(AnalysisError::Timeout(self.call_timeout)),
                Ok(inner) => inner,
            },
        }
    }
}

fn template_outcome(result: &StructuredResult) -> (String, SummaryOptions) {
    (
        template_summary(result),
        SummaryOptions {
            profile: SummaryProfile::Template,
            repaired: false,
            fallback: true,
        },
    )
}

/// Deterministic summary built directly from structured fields. Always
/// non-empty, even for the undetermined default result.
pub fn template_summary(result: &StructuredResult) -> String {
    let mut paragraphs: Vec<String> = Vec::new();

    let mut opening = match result.policy_type.as_deref() {
        Some(kind) if !kind.trim().is_empty() => {
            format!("This document appears to be a {} insurance policy", kind.trim())
        }
        _ => "This document appears to be an insurance policy".to_string(),
    };
    if let Some(ref insurer) = result.insurer
        && !insurer.trim().is_empty()
    {
        opening.push_str(&format!(" issued by {}", insurer.trim()));
    }
    if let Some(ref number) = result.policy_number
        && !number.trim().is_empty()
    {
        opening.push_str(&format!(" (policy number {})", number.trim()));
    }
    opening.push('.');
    if let Some(ref dates) = result.effective_dates
        && !dates.trim().is_empty()
    {
        opening.push_str(&format!(" It is effective {}.", dates.trim()));
    }
    paragraphs.push(opening);

    if result.coverages.is_empty() {
        paragraphs.push("No specific coverages could be identified in the document.".to_string());
    } else {
        let listed: Vec<String> = result
            .coverages
            .iter()
            .map(|c| match c.limit.as_deref() {
                Some(limit) if !limit.trim().is_empty() => {
                    format!("{} (limit {})", c.name, limit.trim())
                }
                _ => c.name.clone(),
            })
            .collect();
        paragraphs.push(format!(
            "It lists {} coverage{}: {}.",
            listed.len(),
            if listed.len() == 1 { "" } else { "s" },
            listed.join("; ")
        ));
    }

    let mut closing = if result.exclusions.is_empty() {
        "No exclusions could be identified.".to_string()
    } else {
        format!("Noted exclusions: {}.", result.exclusions.join("; "))
    };
    if !result.contacts.is_empty() {
        let contacts: Vec<String> = result
            .contacts
            .iter()
            .map(|c| {
                let detail = c.phone.as_deref().or(c.email.as_deref()).unwrap_or("");
                if detail.is_empty() {
                    c.label.clone()
                } else {
                    format!("{} ({})", c.label, detail)
                }
            })
            .collect();
        closing.push_str(&format!(" Contacts: {}.", contacts.join("; ")));
    }
    if let Some(ref explanation) = result.explanation
        && !explanation.trim().is_empty()
    {
        closing.push_str(&format!(" {}", explanation.trim()));
        if !closing.trim_end().ends_with(['.', '!', '?']) {
            closing.push('.');
        }
    }
    paragraphs.push(closing);

    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAnalyzer, MockResponse};
    use polsum_core::Coverage;

    const COMPLETE: &str = "First paragraph about the policy.\n\nSecond paragraph on coverages.\n\nThird paragraph, wrapping up.";
    const TRUNCATED: &str = "First paragraph about the policy.\n\nSecond paragraph that was cut off mid";

    fn generator(backend: Arc<MockAnalyzer>) -> SummaryGenerator {
        SummaryGenerator::new(backend, SummaryConfig::default(), Duration::from_secs(10))
    }

    fn sample_result() -> StructuredResult {
        StructuredResult {
            policy_type: Some("homeowners".into()),
            insurer: Some("Acme Mutual".into()),
            coverages: vec![Coverage {
                name: "Dwelling".into(),
                limit: Some("$400,000".into()),
                ..Default::default()
            }],
            exclusions: vec!["flood".into()],
            ..Default::default()
        }
    }

    // ── HeuristicCompleteness ──────────────────────────────────────────

    #[test]
    fn complete_text_passes_heuristic() {
        let checker = HeuristicCompleteness {
            min_paragraph_breaks: 2,
        };
        assert!(checker.is_complete(COMPLETE));
    }

    #[test]
    fn missing_terminal_punctuation_fails_heuristic() {
        let checker = HeuristicCompleteness {
            min_paragraph_breaks: 1,
        };
        assert!(!checker.is_complete(TRUNCATED));
    }

    #[test]
    fn too_few_paragraphs_fails_heuristic() {
        let checker = HeuristicCompleteness {
            min_paragraph_breaks: 2,
        };
        assert!(!checker.is_complete("One single paragraph, properly ended."));
    }

    // ── SummaryGenerator ───────────────────────────────────────────────

    #[tokio::test]
    async fn complete_summary_is_kept_without_regeneration() {
        let backend = Arc::new(
            MockAnalyzer::new(MockResponse::Upstream("unused".into()))
                .with_summarize_sequence(vec![MockResponse::Payload(COMPLETE.into())]),
        );
        let generator = generator(backend.clone());

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;

        assert_eq!(text, COMPLETE);
        assert_eq!(options.profile, SummaryProfile::Standard);
        assert!(!options.repaired);
        assert!(!options.fallback);
        assert_eq!(backend.summarize_calls(), 1);
    }

    #[tokio::test]
    async fn truncated_summary_triggers_exactly_one_regeneration() {
        let backend = Arc::new(
            MockAnalyzer::new(MockResponse::Upstream("unused".into())).with_summarize_sequence(
                vec![
                    MockResponse::Payload(TRUNCATED.into()),
                    MockResponse::Payload(COMPLETE.into()),
                ],
            ),
        );
        let generator = generator(backend.clone());

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;

        assert_eq!(backend.summarize_calls(), 2);
        assert_eq!(text, COMPLETE);
        assert_eq!(options.profile, SummaryProfile::Strict);
        assert!(options.repaired);
    }

    #[tokio::test]
    async fn shorter_regeneration_keeps_first_attempt() {
        let backend = Arc::new(
            MockAnalyzer::new(MockResponse::Upstream("unused".into())).with_summarize_sequence(
                vec![
                    MockResponse::Payload(TRUNCATED.into()),
                    MockResponse::Payload("tiny".into()),
                ],
            ),
        );
        let generator = generator(backend.clone());

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;

        assert_eq!(backend.summarize_calls(), 2);
        assert_eq!(text, TRUNCATED);
        assert_eq!(options.profile, SummaryProfile::Standard);
        assert!(options.repaired);
    }

    #[tokio::test]
    async fn failed_regeneration_keeps_first_attempt() {
        let backend = Arc::new(
            MockAnalyzer::new(MockResponse::Upstream("unused".into())).with_summarize_sequence(
                vec![
                    MockResponse::Payload(TRUNCATED.into()),
                    MockResponse::Upstream("HTTP 503".into()),
                ],
            ),
        );
        let generator = generator(backend);

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;
        assert_eq!(text, TRUNCATED);
        assert!(options.repaired);
        assert!(!options.fallback);
    }

    #[tokio::test]
    async fn analyzer_failure_falls_back_to_template() {
        let backend = Arc::new(MockAnalyzer::new(MockResponse::Upstream("down".into())));
        let generator = generator(backend);

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;

        assert!(!text.is_empty());
        assert!(text.contains("homeowners"));
        assert_eq!(options.profile, SummaryProfile::Template);
        assert!(options.fallback);
    }

    #[tokio::test]
    async fn empty_summary_falls_back_to_template() {
        let backend = Arc::new(
            MockAnalyzer::new(MockResponse::Upstream("unused".into()))
                .with_summarize_sequence(vec![MockResponse::Payload("   ".into())]),
        );
        let generator = generator(backend);

        let (text, options) = generator
            .summarize(&sample_result(), &CancellationToken::new())
            .await;
        assert!(options.fallback);
        assert!(!text.is_empty());
    }

    // ── template_summary ───────────────────────────────────────────────

    #[test]
    fn template_is_deterministic_and_structured() {
        let result = sample_result();
        let a = template_summary(&result);
        let b = template_summary(&result);
        assert_eq!(a, b);
        assert!(a.contains("Acme Mutual"));
        assert!(a.contains("Dwelling (limit $400,000)"));
        assert!(a.contains("flood"));
        assert_eq!(a.matches("\n\n").count(), 2);
    }

    #[test]
    fn template_handles_undetermined_result() {
        let text = template_summary(&StructuredResult::undetermined());
        assert!(text.contains("insurance policy"));
        assert!(text.contains("No specific coverages"));
    }
}
