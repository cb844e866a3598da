use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

mod handlers;
mod models;
mod state;
mod upload;

use polsum_analysis::{
    HttpAnalyzer, RetryPolicy, RetryingAnalyzerClient, SummaryConfig, SummaryGenerator,
};
use polsum_core::config_file;
use polsum_extract::ExtractionConfig;
use polsum_pipeline::{default_cascade, DocumentStore, JobRunner, MemoryStore, PipelineConfig};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Config file cascade first, env vars win.
    let file_config = config_file::load_config();
    let analyzer_section = file_config.analyzer.unwrap_or_default();
    let extraction_section = file_config.extraction.unwrap_or_default();
    let pipeline_section = file_config.pipeline.unwrap_or_default();
    let summary_section = file_config.summary.unwrap_or_default();
    let server_section = file_config.server.unwrap_or_default();

    let base_url = std::env::var("ANALYZER_BASE_URL")
        .ok()
        .or(analyzer_section.base_url)
        .unwrap_or_else(|| "http://localhost:8090".to_string());
    let api_key = std::env::var("ANALYZER_API_KEY")
        .ok()
        .or(analyzer_section.api_key);
    if api_key.is_none() {
        tracing::warn!("no analyzer API key configured; upstream may reject requests");
    }

    let call_timeout = Duration::from_secs(
        env_u64("ANALYZER_TIMEOUT_SECS")
            .or(analyzer_section.call_timeout_secs)
            .unwrap_or(30),
    );
    let retry_policy = RetryPolicy {
        max_attempts: env_u64("ANALYZER_MAX_ATTEMPTS")
            .map(|v| v as u32)
            .or(analyzer_section.max_attempts)
            .unwrap_or(3),
        base_delay: Duration::from_millis(
            env_u64("ANALYZER_BACKOFF_BASE_MS")
                .or(analyzer_section.backoff_base_ms)
                .unwrap_or(500),
        ),
        exponential: env_bool("ANALYZER_EXPONENTIAL_BACKOFF")
            .or(analyzer_section.exponential_backoff)
            .unwrap_or(true),
    };

    let extraction_config = ExtractionConfig::default().overlaid(&extraction_section);
    let pipeline_config = PipelineConfig::default().overlaid(&pipeline_section);

    let mut summary_config = SummaryConfig::default();
    if let Some(v) = summary_section.target_paragraphs {
        summary_config.target_paragraphs = v;
    }
    if let Some(v) = summary_section.min_words {
        summary_config.min_words = v;
    }
    if let Some(v) = summary_section.max_words {
        summary_config.max_words = v;
    }

    // Explicit wiring, no globals: every component is constructed here
    // and handed to the runner.
    let backend = Arc::new(HttpAnalyzer::new(base_url.clone(), api_key));
    let analyzer = Arc::new(RetryingAnalyzerClient::new(
        backend.clone(),
        retry_policy,
        call_timeout,
    ));
    let summarizer = Arc::new(SummaryGenerator::new(backend, summary_config, call_timeout));
    let cascade = Arc::new(default_cascade(extraction_config));
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let runner = JobRunner::new(
        store.clone(),
        cascade,
        analyzer,
        summarizer,
        pipeline_config,
    );

    let state = Arc::new(AppState { store, runner });

    let max_upload_mb = env_u64("MAX_UPLOAD_MB")
        .or(server_section.max_upload_mb)
        .unwrap_or(10);
    let body_limit =
        axum::extract::DefaultBodyLimit::max((max_upload_mb * 1024 * 1024) as usize);

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(handlers::healthz))
        .route("/api/documents", axum::routing::post(handlers::upload::upload))
        .route(
            "/api/documents/{id}/status",
            axum::routing::get(handlers::status::status),
        )
        .route(
            "/api/documents/{id}/result",
            axum::routing::get(handlers::result::result),
        )
        .route(
            "/api/documents/{id}/summary/regenerate",
            axum::routing::post(handlers::regenerate::regenerate),
        )
        .layer(body_limit)
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state);

    let bind = std::env::var("BIND_ADDR")
        .ok()
        .or(server_section.bind_addr)
        .unwrap_or_else(|| "0.0.0.0:5001".to_string());
    let addr: SocketAddr = bind.parse()?;
    tracing::info!(%addr, analyzer = %base_url, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_bool(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
