//! MuPDF-backed extraction strategies.
//!
//! This crate is the sole AGPL island — it isolates the mupdf dependency
//! (which is AGPL-3.0) so that non-PDF code paths do not transitively
//! depend on it.
//!
//! Two strategies share the same text-page walk but differ in failure
//! semantics: [`MupdfStructural`] demands every page parse cleanly and
//! sits first in the cascade; [`MupdfSalvage`] skips unreadable pages
//! and keeps going, recovering what it can from damaged files.

use std::path::Path;
use std::time::Duration;

use mupdf::{Document, Page, TextPageFlags};
use tokio_util::sync::CancellationToken;

use polsum_core::MediaType;
use polsum_extract::{
    ExtractError, ExtractionConfig, ExtractionStrategy, SpooledDocument, StrategyFuture,
    StrategyYield,
};

/// Strict structural extraction: full font and layout support, any page
/// failure fails the whole strategy.
pub struct MupdfStructural;

/// Lenient page-by-page salvage: unreadable pages are skipped, readable
/// ones are kept in order.
pub struct MupdfSalvage;

impl ExtractionStrategy for MupdfStructural {
    fn name(&self) -> &'static str {
        "mupdf-structural"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Pdf
    }

    fn budget(&self, config: &ExtractionConfig) -> Duration {
        config.structural_timeout
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        _config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a> {
        let path = doc.path().to_path_buf();
        let token = cancel.clone();
        Box::pin(async move {
            run_blocking(cancel, move || extract_structural(&path, &token)).await
        })
    }
}

impl ExtractionStrategy for MupdfSalvage {
    fn name(&self) -> &'static str {
        "mupdf-salvage"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Pdf
    }

    fn budget(&self, config: &ExtractionConfig) -> Duration {
        config.salvage_timeout
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        _config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a> {
        let path = doc.path().to_path_buf();
        let token = cancel.clone();
        Box::pin(async move {
            run_blocking(cancel, move || extract_salvage(&path, &token)).await
        })
    }
}

/// Run a blocking mupdf walk on the blocking pool, abandoning the await
/// (not the thread — the closure checks the token itself) on cancellation.
async fn run_blocking<F>(cancel: &CancellationToken, f: F) -> Result<StrategyYield, ExtractError>
where
    F: FnOnce() -> Result<StrategyYield, ExtractError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);
    tokio::select! {
        _ = cancel.cancelled() => Err(ExtractError::Cancelled),
        joined = handle => match joined {
            Ok(result) => result,
            Err(_) => Err(ExtractError::Extraction("mupdf worker panicked".into())),
        },
    }
}

fn open_document(path: &Path) -> Result<Document, ExtractError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ExtractError::Open("invalid path encoding".into()))?;
    Document::open(path_str).map_err(|e| ExtractError::Open(e.to_string()))
}

/// Extract text from one page via block/line iteration.
fn page_text(page: &Page) -> Result<String, String> {
    let text_page = page
        .to_text_page(TextPageFlags::empty())
        .map_err(|e| e.to_string())?;

    let mut out = String::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let line_text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            out.push_str(&line_text);
            out.push('\n');
        }
    }
    Ok(out)
}

fn extract_structural(
    path: &Path,
    cancel: &CancellationToken,
) -> Result<StrategyYield, ExtractError> {
    let document = open_document(path)?;

    let mut pages_text = Vec::new();
    for page_result in document
        .pages()
        .map_err(|e| ExtractError::Extraction(e.to_string()))?
    {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        let page = page_result.map_err(|e| ExtractError::Extraction(e.to_string()))?;
        pages_text.push(page_text(&page).map_err(ExtractError::Extraction)?);
    }

    let total_pages = pages_text.len();
    Ok(StrategyYield {
        text: pages_text.join("\n"),
        pages_recovered: total_pages,
        total_pages,
    })
}

fn extract_salvage(
    path: &Path,
    cancel: &CancellationToken,
) -> Result<StrategyYield, ExtractError> {
    let document = open_document(path)?;

    let mut pages_text = Vec::new();
    let mut total_pages = 0usize;
    for (index, page_result) in document
        .pages()
        .map_err(|e| ExtractError::Extraction(e.to_string()))?
        .enumerate()
    {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        total_pages += 1;

        let page = match page_result {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(page = index + 1, error = %e, "skipping unreadable page");
                continue;
            }
        };
        match page_text(&page) {
            Ok(text) if !text.trim().is_empty() => pages_text.push(text),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(page = index + 1, error = %e, "skipping page with broken text");
            }
        }
    }

    if pages_text.is_empty() {
        return Err(ExtractError::Extraction(
            "no page yielded readable text".into(),
        ));
    }

    let pages_recovered = pages_text.len();
    Ok(StrategyYield {
        text: pages_text.join("\n"),
        pages_recovered,
        total_pages,
    })
}
