use std::time::Duration;

use polsum_core::config_file::ExtractionSection;

/// Tunable knobs for the extraction cascade. Injected into every
/// strategy call; deployment profiles override individual fields via the
/// config file cascade or env vars in the binary.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for a strategy yield to be accepted.
    pub min_text_len: usize,
    /// Budget for structural parses (mupdf strict, lenient whole-document).
    pub structural_timeout: Duration,
    /// Budget for the page-by-page salvage pass.
    pub salvage_timeout: Duration,
    /// Overall budget for the OCR strategy.
    pub ocr_timeout: Duration,
    /// Budget for a single rendered page passed to the OCR engine.
    pub ocr_page_timeout: Duration,
    /// How many leading pages are rasterized for OCR.
    pub ocr_max_pages: usize,
    /// Rasterization resolution. Higher is more accurate and much slower.
    pub ocr_dpi: u32,
    /// Constrained deployments accept any non-empty OCR yield rather than
    /// failing the document outright (availability over accuracy).
    pub accept_partial_ocr: bool,
    pub pdftoppm_path: String,
    pub tesseract_path: String,
    pub ocr_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            structural_timeout: Duration::from_secs(10),
            salvage_timeout: Duration::from_secs(15),
            ocr_timeout: Duration::from_secs(90),
            ocr_page_timeout: Duration::from_secs(20),
            ocr_max_pages: 3,
            ocr_dpi: 150,
            accept_partial_ocr: false,
            pdftoppm_path: "pdftoppm".to_string(),
            tesseract_path: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Apply the non-empty fields of a config-file section over this config.
    pub fn overlaid(mut self, section: &ExtractionSection) -> Self {
        if let Some(v) = section.min_text_len {
            self.min_text_len = v;
        }
        if let Some(v) = section.structural_timeout_secs {
            self.structural_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.salvage_timeout_secs {
            self.salvage_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.ocr_timeout_secs {
            self.ocr_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.ocr_page_timeout_secs {
            self.ocr_page_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.ocr_max_pages {
            self.ocr_max_pages = v;
        }
        if let Some(v) = section.ocr_dpi {
            self.ocr_dpi = v;
        }
        if let Some(v) = section.accept_partial_ocr {
            self.accept_partial_ocr = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_applies_only_set_fields() {
        let section = ExtractionSection {
            min_text_len: Some(5),
            ocr_dpi: Some(200),
            ..Default::default()
        };
        let config = ExtractionConfig::default().overlaid(&section);
        assert_eq!(config.min_text_len, 5);
        assert_eq!(config.ocr_dpi, 200);
        assert_eq!(config.ocr_max_pages, 3);
    }
}
