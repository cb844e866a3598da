use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use polsum_core::{MediaType, SourceDocument};
use tokio_util::sync::CancellationToken;

use crate::config::ExtractionConfig;
use crate::ExtractError;

/// Text yielded by a single strategy attempt, before cleaning.
#[derive(Debug, Clone)]
pub struct StrategyYield {
    pub text: String,
    /// Pages that contributed text.
    pub pages_recovered: usize,
    /// Pages the strategy saw (rendered pages for OCR, which is capped).
    pub total_pages: usize,
}

pub type StrategyFuture<'a> = Pin<Box<dyn Future<Output = Result<StrategyYield, ExtractError>> + Send + 'a>>;

/// One self-contained algorithm for turning document bytes into text.
///
/// Strategies are ordered by the cascade from richest to most tolerant;
/// each runs under its own budget and may be abandoned mid-flight, so
/// implementations must keep any external resources (subprocesses, temp
/// files) scoped to the call.
pub trait ExtractionStrategy: Send + Sync {
    /// Stable name recorded as `strategy_used` provenance.
    fn name(&self) -> &'static str;

    fn supports(&self, media_type: MediaType) -> bool;

    /// Per-strategy time budget. OCR gets a larger one than structural parses.
    fn budget(&self, config: &ExtractionConfig) -> Duration;

    /// Whether a non-empty yield below `min_text_len` is still acceptable
    /// from this strategy. Only the OCR last resort opts in, and only when
    /// the deployment is configured for it.
    fn accepts_partial(&self, _config: &ExtractionConfig) -> bool {
        false
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a>;
}

/// A source document spooled to a per-job temp file, for strategies that
/// work on paths (mupdf, the rasterizer subprocess). The temp directory
/// lives exactly as long as the cascade attempt and is removed on drop,
/// success or failure.
pub struct SpooledDocument {
    source: SourceDocument,
    path: PathBuf,
    dir: tempfile::TempDir,
}

impl SpooledDocument {
    pub fn spool(source: SourceDocument) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join(format!("document.{}", source.media_type.as_str()));
        std::fs::write(&path, &source.bytes)?;
        Ok(Self { source, path, dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.source.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.source.media_type
    }

    pub fn filename(&self) -> &str {
        &self.source.filename
    }

    /// Scratch space for strategy by-products (rendered page images).
    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }
}
