//! Last-resort OCR strategy: rasterize the leading pages with
//! `pdftoppm`, then run each image through the Tesseract CLI.
//!
//! Both tools run as child processes with `kill_on_drop`, so abandoning
//! the future (cascade budget, overall job deadline, cancellation)
//! reaps them instead of leaving orphans. Rendered images live in a
//! scratch directory scoped to this single attempt and are removed on
//! every exit path.
//!
//! Page count and resolution are capped: OCR cost grows linearly with
//! both, and the leading pages of a policy carry the declarations that
//! matter most.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use polsum_core::MediaType;

use crate::config::ExtractionConfig;
use crate::strategy::{ExtractionStrategy, SpooledDocument, StrategyFuture, StrategyYield};
use crate::ExtractError;

pub struct OcrStrategy;

impl ExtractionStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr-tesseract"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Pdf
    }

    fn budget(&self, config: &ExtractionConfig) -> Duration {
        config.ocr_timeout
    }

    fn accepts_partial(&self, config: &ExtractionConfig) -> bool {
        config.accept_partial_ocr
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a> {
        Box::pin(async move {
            let render_dir = tempfile::tempdir_in(doc.scratch_dir())?;
            let prefix = render_dir.path().join("page");

            let mut render = Command::new(&config.pdftoppm_path);
            render
                .arg("-png")
                .arg("-r")
                .arg(config.ocr_dpi.to_string())
                .arg("-f")
                .arg("1")
                .arg("-l")
                .arg(config.ocr_max_pages.to_string())
                .arg(doc.path())
                .arg(&prefix);

            let render_budget = config
                .ocr_page_timeout
                .saturating_mul(config.ocr_max_pages.max(1) as u32);
            let output = run_subprocess(render, render_budget, cancel).await?;
            if !output.status.success() {
                return Err(ExtractError::Extraction(format!(
                    "pdftoppm exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            let images = rendered_pages(render_dir.path())?;
            if images.is_empty() {
                return Err(ExtractError::Extraction(
                    "rasterizer produced no page images".into(),
                ));
            }

            let total_pages = images.len();
            let mut page_texts: Vec<String> = Vec::with_capacity(total_pages);

            for (page_index, image) in images.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(ExtractError::Cancelled);
                }

                let mut ocr = Command::new(&config.tesseract_path);
                ocr.arg(image)
                    .arg("stdout")
                    .arg("-l")
                    .arg(&config.ocr_language);

                match run_subprocess(ocr, config.ocr_page_timeout, cancel).await {
                    Ok(out) if out.status.success() => {
                        let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
                        if !text.is_empty() {
                            page_texts.push(text);
                        }
                    }
                    Ok(out) => {
                        tracing::warn!(
                            page = page_index + 1,
                            status = %out.status,
                            "tesseract failed on page; skipping"
                        );
                    }
                    Err(ExtractError::Cancelled) => return Err(ExtractError::Cancelled),
                    Err(e) => {
                        tracing::warn!(
                            page = page_index + 1,
                            error = %e,
                            "OCR page attempt failed; skipping"
                        );
                    }
                }
            }

            let pages_recovered = page_texts.len();
            Ok(StrategyYield {
                text: page_texts.join("\n\n"),
                pages_recovered,
                total_pages,
            })
        })
    }
}

/// Collect rendered page images sorted by filename. `pdftoppm` pads page
/// numbers to a fixed width, so lexicographic order is page order.
fn rendered_pages(dir: &std::path::Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    images.sort();
    Ok(images)
}

/// Run a child process under a budget, reaped on cancellation or timeout.
async fn run_subprocess(
    mut cmd: Command,
    budget: Duration,
    cancel: &CancellationToken,
) -> Result<std::process::Output, ExtractError> {
    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| ExtractError::Extraction(format!("failed to spawn {program}: {e}")))?;

    tokio::select! {
        _ = cancel.cancelled() => Err(ExtractError::Cancelled),
        result = tokio::time::timeout(budget, child.wait_with_output()) => match result {
            Err(_) => Err(ExtractError::Extraction(format!(
                "{program} exceeded its {}s budget",
                budget.as_secs()
            ))),
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ExtractError::Io(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_pages_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-03.png", "page-01.png", "page-02.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pages = rendered_pages(dir.path()).unwrap();
        let names: Vec<String> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["page-01.png", "page-02.png", "page-03.png"]);
    }

    #[tokio::test]
    async fn missing_binary_is_an_extraction_error() {
        let cmd = Command::new("polsum-no-such-binary");
        let err = run_subprocess(cmd, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Extraction(_)));
    }

    #[tokio::test]
    async fn cancelled_subprocess_is_reaped() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_subprocess(cmd, Duration::from_secs(60), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Cancelled));
    }
}
