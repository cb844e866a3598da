//! HTTP implementation of [`AnalyzerBackend`].

use std::time::Duration;

use crate::backend::{AnalyzerBackend, AnalyzerFuture, SummaryRequest};
use crate::AnalysisError;

pub struct HttpAnalyzer {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout(timeout)
    } else {
        AnalysisError::Upstream(e.to_string())
    }
}

impl AnalyzerBackend for HttpAnalyzer {
    fn name(&self) -> &str {
        "http"
    }

    fn analyze<'a>(&'a self, text: &'a str, timeout: Duration) -> AnalyzerFuture<'a> {
        Box::pin(async move {
            let resp = self
                .request("/v1/analyze")
                .json(&serde_json::json!({ "text": text }))
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(e, timeout))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(AnalysisError::Upstream(format!("HTTP {status}")));
            }

            resp.text().await.map_err(|e| classify(e, timeout))
        })
    }

    fn summarize<'a>(
        &'a self,
        request: &'a SummaryRequest,
        timeout: Duration,
    ) -> AnalyzerFuture<'a> {
        Box::pin(async move {
            let resp = self
                .request("/v1/summarize")
                .json(request)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(e, timeout))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(AnalysisError::Upstream(format!("HTTP {status}")));
            }

            let body: serde_json::Value = resp.json().await.map_err(|e| classify(e, timeout))?;
            body.get("summary")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    AnalysisError::Parse("summary response missing `summary` field".into())
                })
        })
    }
}
