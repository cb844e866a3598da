//! Lenient whole-document PDF extraction via the `pdf-extract` crate.
//!
//! Second in the PDF cascade: a different parser engine than the
//! structural mupdf pass, so it survives a different class of malformed
//! files (and vice versa). Output quality is lower — inter-word spacing
//! and reading order can suffer — which is why it runs after the
//! structural pass, not before.

use tokio_util::sync::CancellationToken;

use polsum_core::MediaType;

use crate::config::ExtractionConfig;
use crate::strategy::{ExtractionStrategy, SpooledDocument, StrategyFuture, StrategyYield};
use crate::ExtractError;

pub struct LenientPdfStrategy;

/// Derive page stats from form-feed separators, which `pdf-extract`
/// emits between pages.
pub(crate) fn page_stats(text: &str) -> (usize, usize) {
    let pages: Vec<&str> = text.split('\u{C}').collect();
    let total = pages.len();
    let recovered = pages.iter().filter(|p| !p.trim().is_empty()).count();
    (recovered, total)
}

impl ExtractionStrategy for LenientPdfStrategy {
    fn name(&self) -> &'static str {
        "pdf-lenient"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Pdf
    }

    fn budget(&self, config: &ExtractionConfig) -> std::time::Duration {
        config.structural_timeout
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        _config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a> {
        Box::pin(async move {
            let data = doc.bytes().to_vec();
            let handle = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&data)
                    .map_err(|e| ExtractError::Extraction(e.to_string()))
            });

            let text = tokio::select! {
                _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                joined = handle => match joined {
                    Ok(result) => result?,
                    // pdf-extract is known to panic on some malformed
                    // content streams; treat that as "strategy yielded
                    // nothing" like any other failure.
                    Err(_) => return Err(ExtractError::Extraction("pdf parser panicked".into())),
                },
            };

            let (pages_recovered, total_pages) = page_stats(&text);
            Ok(StrategyYield {
                text,
                pages_recovered,
                total_pages,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_stats_counts_form_feed_pages() {
        let (recovered, total) = page_stats("page one\u{C}page two\u{C}page three");
        assert_eq!((recovered, total), (3, 3));
    }

    #[test]
    fn page_stats_skips_blank_pages() {
        let (recovered, total) = page_stats("text\u{C}  \u{C}more");
        assert_eq!((recovered, total), (2, 3));
    }

    #[test]
    fn page_stats_single_page_without_separator() {
        assert_eq!(page_stats("just one page"), (1, 1));
    }
}
