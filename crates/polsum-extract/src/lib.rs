use thiserror::Error;

pub mod cascade;
pub mod config;
pub mod docx;
pub mod lenient;
pub mod ocr;
pub mod strategy;

pub use cascade::ExtractionCascade;
pub use config::ExtractionConfig;
pub use docx::DocxStrategy;
pub use lenient::LenientPdfStrategy;
pub use ocr::OcrStrategy;
pub use strategy::{ExtractionStrategy, SpooledDocument, StrategyFuture, StrategyYield};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error("extraction cancelled")]
    Cancelled,
    #[error("no extraction strategy produced usable text; {hint}")]
    Unextractable { hint: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
