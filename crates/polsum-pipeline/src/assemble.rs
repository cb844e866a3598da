//! Default pipeline assembly.
//!
//! Components are constructed explicitly and injected; there are no
//! process-wide singletons. Binaries call these helpers and then wire
//! the result into a [`crate::JobRunner`] together with their own
//! analyzer client and store.

use std::sync::Arc;

use polsum_extract::{
    DocxStrategy, ExtractionCascade, ExtractionConfig, ExtractionStrategy, LenientPdfStrategy,
    OcrStrategy,
};

/// The standard strategy order: richest structural parse first, then the
/// tolerant whole-document engine, then page salvage, then OCR as the
/// last resort. DOCX documents take the single DOCX path.
pub fn default_strategies() -> Vec<Arc<dyn ExtractionStrategy>> {
    let mut strategies: Vec<Arc<dyn ExtractionStrategy>> = Vec::new();
    #[cfg(feature = "mupdf")]
    strategies.push(Arc::new(polsum_pdf_mupdf::MupdfStructural));
    strategies.push(Arc::new(LenientPdfStrategy));
    #[cfg(feature = "mupdf")]
    strategies.push(Arc::new(polsum_pdf_mupdf::MupdfSalvage));
    strategies.push(Arc::new(OcrStrategy));
    strategies.push(Arc::new(DocxStrategy));
    strategies
}

pub fn default_cascade(config: ExtractionConfig) -> ExtractionCascade {
    ExtractionCascade::new(default_strategies(), config)
}
