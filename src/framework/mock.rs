//! # Mock Framework
//!
//! Utilities for testing resources without a network.
//!
//! Use [`FakeTransport`] behind a [`DataProvider`](crate::provider::DataProvider) to script
//! responses per request path, and [`recorder`] to collect what an observer receives.
//!
//! # Example
//! ```ignore
//! let transport = Arc::new(FakeTransport::new(Duration::from_millis(10)));
//! transport.respond("/user", TransportOutcome::new(200, r#"{"name":"ada"}"#));
//!
//! let resource = Resource::new(configuration, Arc::new(DataProvider::new(transport.clone())));
//! let (callback, mut recording) = recorder();
//! let _token = resource.observe(callback);
//!
//! assert!(recording.next().await.is_some());
//! assert_eq!(transport.invocations("/user"), 1);
//! ```

use crate::framework::response::FetchResult;
use crate::framework::sync::Exclusive;
use crate::provider::{Transport, TransportOutcome};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// FAKE TRANSPORT
// =============================================================================

/// Error reported for a path nobody scripted.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FakeTransportError {
    #[error("No response scripted for {0}")]
    NoResponse(String),
}

#[derive(Default)]
struct Script {
    sticky: HashMap<String, TransportOutcome>,
    queued: HashMap<String, VecDeque<TransportOutcome>>,
    invocations: HashMap<String, usize>,
}

/// An in-memory transport keyed by request path.
///
/// Queued responses are served first, in order; once a path's queue is empty its sticky
/// response (if any) is served on every call.
pub struct FakeTransport {
    latency: Duration,
    script: Exclusive<Script>,
}

impl FakeTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            script: Exclusive::new(Script::default()),
        }
    }

    /// Serves `outcome` for `path` from now on.
    pub fn respond(&self, path: impl Into<String>, outcome: TransportOutcome) {
        self.script.execute(|script| {
            script.sticky.insert(path.into(), outcome);
        });
    }

    /// Serves `outcome` for `path` exactly once, ahead of the sticky response.
    pub fn enqueue(&self, path: impl Into<String>, outcome: TransportOutcome) {
        self.script.execute(|script| {
            script
                .queued
                .entry(path.into())
                .or_default()
                .push_back(outcome);
        });
    }

    /// How many times `path` has been executed.
    pub fn invocations(&self, path: &str) -> usize {
        self.script
            .execute(|script| script.invocations.get(path).copied().unwrap_or(0))
    }

    pub fn total_invocations(&self) -> usize {
        self.script
            .execute(|script| script.invocations.values().sum())
    }

    /// Forgets every scripted response and invocation count.
    pub fn cleanup(&self) {
        self.script.execute(|script| *script = Script::default());
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Request = String;

    async fn execute(&self, request: String) -> TransportOutcome {
        let outcome = self.script.execute(|script| {
            *script.invocations.entry(request.clone()).or_default() += 1;
            script
                .queued
                .get_mut(&request)
                .and_then(VecDeque::pop_front)
                .or_else(|| script.sticky.get(&request).cloned())
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        outcome.unwrap_or_else(|| {
            TransportOutcome::unreachable(FakeTransportError::NoResponse(request))
        })
    }
}

// =============================================================================
// RECORDING OBSERVER
// =============================================================================

const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// The receiving end of a [`recorder`].
pub struct RecordingObserver<T, E> {
    receiver: mpsc::UnboundedReceiver<FetchResult<T, E>>,
}

impl<T, E> RecordingObserver<T, E> {
    /// Waits (up to two seconds) for the next emission.
    pub async fn next(&mut self) -> Option<FetchResult<T, E>> {
        self.next_within(DEFAULT_WAIT).await
    }

    /// Waits up to `wait` for the next emission.
    pub async fn next_within(&mut self, wait: Duration) -> Option<FetchResult<T, E>> {
        tokio::time::timeout(wait, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// The next emission if one has already arrived.
    pub fn try_next(&mut self) -> Option<FetchResult<T, E>> {
        self.receiver.try_recv().ok()
    }
}

/// Creates a callback that forwards every emission to the returned [`RecordingObserver`].
pub fn recorder<T, E>() -> (
    impl Fn(FetchResult<T, E>) + Send + Sync + 'static,
    RecordingObserver<T, E>,
)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel::<FetchResult<T, E>>();
    let callback = move |result: FetchResult<T, E>| {
        // The test may have stopped listening.
        let _ = sender.send(result);
    };
    (callback, RecordingObserver { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::Response;

    #[tokio::test]
    async fn test_queued_before_sticky() {
        let transport = FakeTransport::new(Duration::ZERO);
        transport.respond("/a", TransportOutcome::new(200, "sticky"));
        transport.enqueue("/a", TransportOutcome::new(500, "once"));

        assert_eq!(transport.execute("/a".to_string()).await.status, Some(500));
        assert_eq!(transport.execute("/a".to_string()).await.status, Some(200));
        assert_eq!(transport.execute("/a".to_string()).await.status, Some(200));
        assert_eq!(transport.invocations("/a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_path_is_unreachable() {
        let transport = FakeTransport::new(Duration::ZERO);
        let outcome = transport.execute("/missing".to_string()).await;

        assert_eq!(outcome.status, None);
        assert_eq!(
            outcome.error.map(|e| e.to_string()),
            Some("No response scripted for /missing".to_string())
        );
        assert_eq!(transport.total_invocations(), 1);

        transport.cleanup();
        assert_eq!(transport.total_invocations(), 0);
    }

    #[tokio::test]
    async fn test_recorder_collects_in_order() {
        let (callback, mut recording) = recorder::<u32, String>();
        callback(Ok(Response::Value(1)));
        callback(Ok(Response::EmptyValue));

        assert_eq!(recording.next().await, Some(Ok(Response::Value(1))));
        assert_eq!(recording.try_next(), Some(Ok(Response::EmptyValue)));
        assert_eq!(recording.next_within(Duration::from_millis(10)).await, None);
    }
}
