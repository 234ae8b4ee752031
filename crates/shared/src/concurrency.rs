//! Request-scoped context and concurrency primitives.
//!
//! Request handling is single-threaded cooperative with parallel fan-out to
//! external I/O. `RequestContext` carries the correlation id, a cancellation
//! token, and an optional deadline across boundaries; `settle_all2` awaits
//! two fallible futures without letting one abort the other.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// A correlation identifier used for logging and envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier from user input.
    ///
    /// The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::<str>::from(trimmed)))
    }

    /// Create a new request id, best-effort unique within this process.
    #[must_use]
    pub fn new_request_id() -> Self {
        let n = REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::<str>::from(format!("req_{n}").into_boxed_str()))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A clonable cancellation token that can be awaited.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Cancel the token and wake all current/future waiters.
    pub fn cancel(&self) {
        let was_cancelled = self.inner.cancelled.swap(true, Ordering::SeqCst);
        if !was_cancelled {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns true if the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }

        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Request-scoped context passed across boundaries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a new request context with a fresh cancellation token.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Convenience constructor: create a context with an auto-generated `req_*` id.
    #[must_use]
    pub fn new_request() -> Self {
        Self::new(CorrelationId::new_request_id())
    }

    /// Attach a deadline to this context.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Return a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Await cancellation.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Return the configured deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time remaining before the deadline, `None` when no deadline is set.
    #[must_use]
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Return a cancellation error when cancelled, including operation metadata.
    pub fn ensure_not_cancelled(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ErrorEnvelope::cancelled("operation cancelled")
                .with_metadata("operation", operation));
        }
        Ok(())
    }

    /// Return a deadline error when the deadline has passed.
    pub fn ensure_within_deadline(&self, operation: &'static str) -> Result<()> {
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ErrorEnvelope::deadline_exceeded("request deadline exceeded")
                .with_metadata("operation", operation));
        }
        Ok(())
    }

    /// Combined cancellation + deadline check.
    pub fn checkpoint(&self, operation: &'static str) -> Result<()> {
        self.ensure_not_cancelled(operation)?;
        self.ensure_within_deadline(operation)
    }
}

/// Await two fallible futures, settling both.
///
/// Neither outcome aborts the sibling; callers decide how to combine the two
/// results (e.g. proceed when at least one succeeded).
pub async fn settle_all2<A, B, FutA, FutB>(a: FutA, b: FutB) -> (Result<A>, Result<B>)
where
    FutA: Future<Output = Result<A>>,
    FutB: Future<Output = Result<B>>,
{
    tokio::join!(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn correlation_id_rejects_empty_input() {
        assert!(CorrelationId::parse("   ").is_err());
        assert!(CorrelationId::parse("req_1").is_ok());
    }

    #[tokio::test]
    async fn cancellation_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        token.cancel();
        assert!(token.is_cancelled());
        assert!(handle.await.is_ok());
    }

    #[test]
    fn deadline_checkpoint_fails_once_past() {
        let ctx = RequestContext::new_request()
            .with_deadline(Instant::now() - Duration::from_millis(1));
        let error = ctx.checkpoint("test.op").err();
        assert!(matches!(error, Some(e) if e.is_deadline_exceeded()));
    }

    #[test]
    fn checkpoint_passes_without_deadline() {
        let ctx = RequestContext::new_request();
        assert!(ctx.checkpoint("test.op").is_ok());
    }

    #[tokio::test]
    async fn settle_all2_reports_both_outcomes() {
        let ok = async { Ok::<_, ErrorEnvelope>(1u32) };
        let err = async {
            Err::<u32, _>(ErrorEnvelope::unexpected(
                ErrorCode::transport(),
                "pass failed",
                crate::ErrorClass::Retriable,
            ))
        };

        let (left, right) = settle_all2(ok, err).await;
        assert!(matches!(left, Ok(1)));
        assert!(right.is_err());
    }
}
