//! Mock analyzer backend for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::{AnalyzerBackend, AnalyzerFuture, SummaryRequest};
use crate::AnalysisError;

/// A configurable mock response for [`MockAnalyzer`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this payload as a successful response.
    Payload(String),
    /// Simulate a per-call deadline expiry.
    Timeout,
    /// Simulate a transport/service error.
    Upstream(String),
}

type AnalyzeFn = Box<dyn Fn(&str) -> MockResponse + Send + Sync>;

/// A hand-rolled mock implementing [`AnalyzerBackend`] for tests.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last), **or**
/// - A function of the input text (for concurrent callers where call
///   order is nondeterministic).
/// - Optional per-call latency and call counting.
pub struct MockAnalyzer {
    analyze_responses: Mutex<Vec<MockResponse>>,
    analyze_fallback: MockResponse,
    analyze_fn: Option<AnalyzeFn>,
    summarize_responses: Mutex<Vec<MockResponse>>,
    summarize_fallback: Option<MockResponse>,
    delay: Option<Duration>,
    analyze_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
}

impl MockAnalyzer {
    /// Create a mock that always returns `response`, for both calls.
    pub fn new(response: MockResponse) -> Self {
        Self {
            analyze_responses: Mutex::new(Vec::new()),
            analyze_fallback: response,
            analyze_fn: None,
            summarize_responses: Mutex::new(Vec::new()),
            summarize_fallback: None,
            delay: None,
            analyze_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
        }
    }

    /// Analyze calls return responses in order, repeating the last one.
    pub fn with_analyze_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        let fallback = responses.last().cloned().unwrap();
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        let mut mock = Self::new(fallback);
        mock.analyze_responses = Mutex::new(responses);
        mock
    }

    /// Analyze calls are answered by a function of the input text.
    pub fn with_analyze_fn(f: impl Fn(&str) -> MockResponse + Send + Sync + 'static) -> Self {
        let mut mock = Self::new(MockResponse::Upstream("no response scripted".into()));
        mock.analyze_fn = Some(Box::new(f));
        mock
    }

    /// Summarize calls return responses in order, repeating the last one.
    pub fn with_summarize_sequence(mut self, mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        self.summarize_fallback = responses.last().cloned();
        responses.reverse();
        self.summarize_responses = Mutex::new(responses);
        self
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `analyze()` has been called.
    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// How many times `summarize()` has been called.
    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    fn next_analyze(&self, text: &str) -> MockResponse {
        if let Some(ref f) = self.analyze_fn {
            return f(text);
        }
        let mut seq = self.analyze_responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.analyze_fallback.clone())
    }

    fn next_summarize(&self) -> MockResponse {
        let mut seq = self.summarize_responses.lock().unwrap();
        if let Some(resp) = seq.pop() {
            return resp;
        }
        self.summarize_fallback
            .clone()
            .unwrap_or_else(|| self.analyze_fallback.clone())
    }
}

fn resolve(
    response: MockResponse,
    delay: Option<Duration>,
    timeout: Duration,
) -> AnalyzerFuture<'static> {
    Box::pin(async move {
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match response {
            MockResponse::Payload(p) => Ok(p),
            MockResponse::Timeout => Err(AnalysisError::Timeout(timeout)),
            MockResponse::Upstream(msg) => Err(AnalysisError::Upstream(msg)),
        }
    })
}

impl AnalyzerBackend for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    fn analyze<'a>(&'a self, text: &'a str, timeout: Duration) -> AnalyzerFuture<'a> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        resolve(self.next_analyze(text), self.delay, timeout)
    }

    fn summarize<'a>(
        &'a self,
        _request: &'a SummaryRequest,
        timeout: Duration,
    ) -> AnalyzerFuture<'a> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        resolve(self.next_summarize(), self.delay, timeout)
    }
}
