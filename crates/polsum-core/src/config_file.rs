use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
/// Deployment profiles ("fast local" vs "constrained hosted") are just
/// different files; env vars applied by the binary win over both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub analyzer: Option<AnalyzerSection>,
    pub extraction: Option<ExtractionSection>,
    pub pipeline: Option<PipelineSection>,
    pub summary: Option<SummarySection>,
    pub server: Option<ServerSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub call_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub exponential_backoff: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSection {
    pub min_text_len: Option<usize>,
    pub structural_timeout_secs: Option<u64>,
    pub salvage_timeout_secs: Option<u64>,
    pub ocr_timeout_secs: Option<u64>,
    pub ocr_page_timeout_secs: Option<u64>,
    pub ocr_max_pages: Option<usize>,
    pub ocr_dpi: Option<u32>,
    pub accept_partial_ocr: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    pub job_deadline_secs: Option<u64>,
    pub max_chars: Option<usize>,
    pub chunk_size: Option<usize>,
    pub stored_text_prefix_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarySection {
    pub target_paragraphs: Option<usize>,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind_addr: Option<String>,
    pub max_upload_mb: Option<u64>,
}

/// Platform config directory path: `<config_dir>/polsum/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("polsum").join("config.toml"))
}

/// Load config by cascading CWD `.polsum.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".polsum.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<T: Clone>(overlay: &Option<T>, base: &Option<T>) -> Option<T> {
    overlay.clone().or_else(|| base.clone())
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let ba = base.analyzer.unwrap_or_default();
    let oa = overlay.analyzer.unwrap_or_default();
    let be = base.extraction.unwrap_or_default();
    let oe = overlay.extraction.unwrap_or_default();
    let bp = base.pipeline.unwrap_or_default();
    let op = overlay.pipeline.unwrap_or_default();
    let bs = base.summary.unwrap_or_default();
    let os = overlay.summary.unwrap_or_default();
    let bv = base.server.unwrap_or_default();
    let ov = overlay.server.unwrap_or_default();

    ConfigFile {
        analyzer: Some(AnalyzerSection {
            base_url: pick(&oa.base_url, &ba.base_url),
            api_key: pick(&oa.api_key, &ba.api_key),
            call_timeout_secs: pick(&oa.call_timeout_secs, &ba.call_timeout_secs),
            max_attempts: pick(&oa.max_attempts, &ba.max_attempts),
            backoff_base_ms: pick(&oa.backoff_base_ms, &ba.backoff_base_ms),
            exponential_backoff: pick(&oa.exponential_backoff, &ba.exponential_backoff),
        }),
        extraction: Some(ExtractionSection {
            min_text_len: pick(&oe.min_text_len, &be.min_text_len),
            structural_timeout_secs: pick(&oe.structural_timeout_secs, &be.structural_timeout_secs),
            salvage_timeout_secs: pick(&oe.salvage_timeout_secs, &be.salvage_timeout_secs),
            ocr_timeout_secs: pick(&oe.ocr_timeout_secs, &be.ocr_timeout_secs),
            ocr_page_timeout_secs: pick(&oe.ocr_page_timeout_secs, &be.ocr_page_timeout_secs),
            ocr_max_pages: pick(&oe.ocr_max_pages, &be.ocr_max_pages),
            ocr_dpi: pick(&oe.ocr_dpi, &be.ocr_dpi),
            accept_partial_ocr: pick(&oe.accept_partial_ocr, &be.accept_partial_ocr),
        }),
        pipeline: Some(PipelineSection {
            job_deadline_secs: pick(&op.job_deadline_secs, &bp.job_deadline_secs),
            max_chars: pick(&op.max_chars, &bp.max_chars),
            chunk_size: pick(&op.chunk_size, &bp.chunk_size),
            stored_text_prefix_chars: pick(
                &op.stored_text_prefix_chars,
                &bp.stored_text_prefix_chars,
            ),
        }),
        summary: Some(SummarySection {
            target_paragraphs: pick(&os.target_paragraphs, &bs.target_paragraphs),
            min_words: pick(&os.min_words, &bs.min_words),
            max_words: pick(&os.max_words, &bs.max_words),
        }),
        server: Some(ServerSection {
            bind_addr: pick(&ov.bind_addr, &bv.bind_addr),
            max_upload_mb: pick(&ov.max_upload_mb, &bv.max_upload_mb),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let config = ConfigFile {
            pipeline: Some(PipelineSection {
                chunk_size: Some(4000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.pipeline.unwrap().chunk_size, Some(4000));
    }

    #[test]
    fn absent_fields_deserialize_as_none() {
        let parsed: ConfigFile =
            toml::from_str("[analyzer]\nbase_url = \"http://localhost:8090\"\n").unwrap();
        let analyzer = parsed.analyzer.unwrap();
        assert_eq!(analyzer.base_url.as_deref(), Some("http://localhost:8090"));
        assert!(analyzer.max_attempts.is_none());
        assert!(parsed.pipeline.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            pipeline: Some(PipelineSection {
                chunk_size: Some(8000),
                job_deadline_secs: Some(120),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            pipeline: Some(PipelineSection {
                chunk_size: Some(2000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let pipeline = merged.pipeline.unwrap();
        assert_eq!(pipeline.chunk_size, Some(2000));
        assert_eq!(pipeline.job_deadline_secs, Some(120));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            analyzer: Some(AnalyzerSection {
                api_key: Some("secret".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.analyzer.unwrap().api_key.as_deref(), Some("secret"));
    }
}
