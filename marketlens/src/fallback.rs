//! Fallback plumbing shared by the sentiment and news services.
//!
//! Every public operation in this crate is total: a failed remote call is
//! turned into synthetic data and the reason goes to a [`DiagnosticSink`]
//! instead of the caller.

use std::future::Future;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

/// Why a remote call was abandoned in favour of synthetic data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackReason {
    #[error("no credential configured")]
    MissingCredential,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("service reported an error: {0}")]
    ServiceReported(String),
}

impl FallbackReason {
    /// Short stable name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FallbackReason::MissingCredential => "missing_credential",
            FallbackReason::Transport(_) => "transport",
            FallbackReason::MalformedResponse(_) => "malformed_response",
            FallbackReason::ServiceReported(_) => "service_reported",
        }
    }
}

impl From<reqwest::Error> for FallbackReason {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FallbackReason::MalformedResponse(err.to_string())
        } else {
            FallbackReason::Transport(err.to_string())
        }
    }
}

/// One fallback occurrence, as seen by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEvent {
    pub operation: &'static str,
    pub reason: FallbackReason,
}

/// Side channel receiving the reason each time an operation falls back.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, operation: &'static str, reason: &FallbackReason);
}

/// Default sink: a `warn!` line per fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, operation: &'static str, reason: &FallbackReason) {
        warn!(operation, kind = reason.kind(), "{}, using mock data", reason);
    }
}

/// Keeps every event in memory. Also logs like [`TracingSink`].
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<FallbackEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FallbackEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().map(|events| events.is_empty()).unwrap_or(true)
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, operation: &'static str, reason: &FallbackReason) {
        TracingSink.record(operation, reason);
        if let Ok(mut events) = self.events.lock() {
            events.push(FallbackEvent {
                operation,
                reason: reason.clone(),
            });
        }
    }
}

/// Await `attempt`; on error report it to `sink` and return `fallback()` instead.
pub async fn with_fallback<T, Fut, F>(
    operation: &'static str,
    sink: &dyn DiagnosticSink,
    attempt: Fut,
    fallback: F,
) -> T
where
    Fut: Future<Output = Result<T, FallbackReason>>,
    F: FnOnce() -> T,
{
    match attempt.await {
        Ok(value) => value,
        Err(reason) => {
            sink.record(operation, &reason);
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_skips_fallback_and_sink() {
        let sink = RecordingSink::new();
        let value = with_fallback("op", &sink, async { Ok::<_, FallbackReason>(7) }, || 0).await;

        assert_eq!(value, 7);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn failure_records_reason_and_uses_fallback() {
        let sink = RecordingSink::new();
        let value = with_fallback(
            "op",
            &sink,
            async { Err::<i32, _>(FallbackReason::MalformedResponse("no choices".into())) },
            || 42,
        )
        .await;

        assert_eq!(value, 42);
        assert_eq!(
            sink.events(),
            vec![FallbackEvent {
                operation: "op",
                reason: FallbackReason::MalformedResponse("no choices".into()),
            }]
        );
    }

    #[test]
    fn reason_kinds_are_distinct() {
        let kinds = [
            FallbackReason::MissingCredential.kind(),
            FallbackReason::Transport(String::new()).kind(),
            FallbackReason::MalformedResponse(String::new()).kind(),
            FallbackReason::ServiceReported(String::new()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
