//! Ordered fallback execution of extraction strategies.
//!
//! Strategies run in list order, each under its own budget. The first
//! yield clearing the minimum-length threshold wins; throwing, timing
//! out, or under-yielding strategies are logged and skipped. Only
//! exhausting the whole list is a hard failure.

use std::sync::Arc;

use polsum_core::{ExtractedText, SourceDocument};
use tokio_util::sync::CancellationToken;

use crate::config::ExtractionConfig;
use crate::strategy::{ExtractionStrategy, SpooledDocument};
use crate::ExtractError;

pub struct ExtractionCascade {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    config: ExtractionConfig,
}

impl ExtractionCascade {
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>, config: ExtractionConfig) -> Self {
        Self { strategies, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the cascade. Deterministic for a fixed strategy list and
    /// buffer: the same input always reports the same `strategy_used`.
    pub async fn extract(
        &self,
        source: SourceDocument,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractError> {
        let media_type = source.media_type;
        let doc = SpooledDocument::spool(source)?;

        let mut attempted = 0usize;
        for strategy in self.strategies.iter().filter(|s| s.supports(media_type)) {
            if cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }
            attempted += 1;

            let budget = strategy.budget(&self.config);
            let outcome =
                tokio::time::timeout(budget, strategy.extract(&doc, &self.config, cancel)).await;

            match outcome {
                Err(_) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        budget_secs = budget.as_secs(),
                        "strategy exceeded its budget; trying next"
                    );
                }
                Ok(Err(ExtractError::Cancelled)) => return Err(ExtractError::Cancelled),
                Ok(Err(e)) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "strategy failed; trying next"
                    );
                }
                Ok(Ok(result)) => {
                    let yield_len = result.text.trim().chars().count();
                    let min_len = if strategy.accepts_partial(&self.config) {
                        1
                    } else {
                        self.config.min_text_len
                    };

                    if yield_len >= min_len {
                        tracing::info!(
                            strategy = strategy.name(),
                            chars = yield_len,
                            pages = result.pages_recovered,
                            "strategy accepted"
                        );
                        return Ok(ExtractedText {
                            text: result.text,
                            strategy_used: strategy.name().to_string(),
                            pages_recovered: result.pages_recovered,
                            total_pages: result.total_pages,
                        });
                    }
                    tracing::warn!(
                        strategy = strategy.name(),
                        chars = yield_len,
                        min = min_len,
                        "yield below minimum length; trying next"
                    );
                }
            }
        }

        let hint = if attempted == 0 {
            format!("no strategy supports {media_type} input")
        } else {
            "the source may be image-based, corrupted, or in an unsupported format".to_string()
        };
        Err(ExtractError::Unextractable { hint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{StrategyFuture, StrategyYield};
    use polsum_core::MediaType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Configurable stub strategy for cascade tests.
    struct StubStrategy {
        name: &'static str,
        text: Option<String>,
        fail: bool,
        delay: Option<Duration>,
        partial_ok: bool,
        calls: AtomicUsize,
    }

    impl StubStrategy {
        fn yielding(name: &'static str, text: &str) -> Self {
            Self {
                name,
                text: Some(text.to_string()),
                fail: false,
                delay: None,
                partial_ok: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                text: None,
                fail: true,
                delay: None,
                partial_ok: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(name: &'static str, text: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::yielding(name, text)
            }
        }

        fn partial(name: &'static str, text: &str) -> Self {
            Self {
                partial_ok: true,
                ..Self::yielding(name, text)
            }
        }
    }

    impl ExtractionStrategy for StubStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, media_type: MediaType) -> bool {
            media_type == MediaType::Pdf
        }

        fn budget(&self, _config: &ExtractionConfig) -> Duration {
            Duration::from_secs(5)
        }

        fn accepts_partial(&self, config: &ExtractionConfig) -> bool {
            self.partial_ok && config.accept_partial_ocr
        }

        fn extract<'a>(
            &'a self,
            _doc: &'a SpooledDocument,
            _config: &'a ExtractionConfig,
            _cancel: &'a CancellationToken,
        ) -> StrategyFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                if self.fail {
                    return Err(ExtractError::Extraction("stub failure".into()));
                }
                let text = self.text.clone().unwrap_or_default();
                Ok(StrategyYield {
                    pages_recovered: 1,
                    total_pages: 1,
                    text,
                })
            })
        }
    }

    fn pdf_source() -> SourceDocument {
        SourceDocument::new("policy.pdf", MediaType::Pdf, b"%PDF-1.4".to_vec())
    }

    const LONG_TEXT: &str = "This homeowners policy covers dwelling and personal property.";

    #[tokio::test]
    async fn first_acceptable_strategy_wins() {
        let cascade = ExtractionCascade::new(
            vec![
                Arc::new(StubStrategy::yielding("rich", LONG_TEXT)),
                Arc::new(StubStrategy::yielding("tolerant", LONG_TEXT)),
            ],
            ExtractionConfig::default(),
        );
        let out = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.strategy_used, "rich");
    }

    #[tokio::test]
    async fn failing_and_short_strategies_are_skipped() {
        let cascade = ExtractionCascade::new(
            vec![
                Arc::new(StubStrategy::failing("broken")),
                Arc::new(StubStrategy::yielding("short", "tiny")),
                Arc::new(StubStrategy::yielding("good", LONG_TEXT)),
            ],
            ExtractionConfig::default(),
        );
        let out = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.strategy_used, "good");
    }

    #[tokio::test]
    async fn exhaustion_is_unextractable() {
        let cascade = ExtractionCascade::new(
            vec![
                Arc::new(StubStrategy::failing("broken")),
                Arc::new(StubStrategy::yielding("empty", "")),
            ],
            ExtractionConfig::default(),
        );
        let err = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unextractable { .. }));
    }

    #[tokio::test]
    async fn no_supporting_strategy_is_unextractable() {
        let cascade =
            ExtractionCascade::new(vec![], ExtractionConfig::default());
        let err = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unextractable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn over_budget_strategy_is_skipped() {
        let cascade = ExtractionCascade::new(
            vec![
                Arc::new(StubStrategy::slow("stuck", LONG_TEXT, Duration::from_secs(60))),
                Arc::new(StubStrategy::yielding("fallback", LONG_TEXT)),
            ],
            ExtractionConfig::default(),
        );
        let out = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.strategy_used, "fallback");
    }

    #[tokio::test]
    async fn rerun_reports_same_strategy() {
        let config = ExtractionConfig::default();
        let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![
            Arc::new(StubStrategy::failing("broken")),
            Arc::new(StubStrategy::yielding("stable", LONG_TEXT)),
        ];
        let cascade = ExtractionCascade::new(strategies, config);

        let first = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        let second = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.strategy_used, second.strategy_used);
    }

    #[tokio::test]
    async fn partial_ocr_yield_accepted_when_configured() {
        let config = ExtractionConfig {
            accept_partial_ocr: true,
            ..Default::default()
        };
        let cascade = ExtractionCascade::new(
            vec![Arc::new(StubStrategy::partial("ocr", "few"))],
            config,
        );
        let out = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.strategy_used, "ocr");
        assert_eq!(out.text, "few");
    }

    #[tokio::test]
    async fn partial_yield_rejected_by_default() {
        let cascade = ExtractionCascade::new(
            vec![Arc::new(StubStrategy::partial("ocr", "few"))],
            ExtractionConfig::default(),
        );
        let err = cascade
            .extract(pdf_source(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unextractable { .. }));
    }

    #[tokio::test]
    async fn cancelled_before_start_short_circuits() {
        let probe = Arc::new(StubStrategy::yielding("never", LONG_TEXT));
        let cascade = ExtractionCascade::new(
            vec![probe.clone() as Arc<dyn ExtractionStrategy>],
            ExtractionConfig::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = cascade.extract(pdf_source(), &cancel).await.unwrap_err();
        assert!(matches!(err, ExtractError::Cancelled));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }
}
