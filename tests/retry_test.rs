use fetch_engine::configuration::{EmptyTransformer, EndpointConfiguration, JsonTransformer};
use fetch_engine::decorators::{Backoff, ObservableExt, OnDue};
use fetch_engine::framework::mock::{recorder, FakeTransport};
use fetch_engine::framework::{CancellationToken, FetchError, Observable, Resource, Response};
use fetch_engine::provider::{DataProvider, TransportOutcome};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

type CountConfiguration = EndpointConfiguration<String, u32, ()>;

fn count_configuration() -> CountConfiguration {
    EndpointConfiguration::new(
        |_| Ok("/count".to_string()),
        JsonTransformer::new(),
        EmptyTransformer::new(),
    )
}

fn resource(
    transport: &Arc<FakeTransport>,
) -> Resource<CountConfiguration, DataProvider<FakeTransport>> {
    let provider = Arc::new(DataProvider::new(Arc::clone(transport)));
    Resource::new(count_configuration(), provider)
}

/// Fires `on_due` on the next scheduling step, giving up at `limit`.
fn immediate(
    limit: u32,
    calls: Arc<AtomicU32>,
) -> impl Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync + 'static {
    move |attempt: u32, on_due: OnDue| {
        calls.fetch_add(1, Ordering::SeqCst);
        if attempt >= limit {
            return None;
        }
        tokio::spawn(async move { on_due() });
        Some(CancellationToken::noop())
    }
}

/// Scheduler gives up at attempt 2: one fetch plus two retries reach the transport.
#[tokio::test]
async fn test_retry_exhaustion() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO));
    transport.respond("/count", TransportOutcome::new(500, ""));
    let calls = Arc::new(AtomicU32::new(0));
    let retry = resource(&transport).with_retry(|_| true, immediate(2, Arc::clone(&calls)));

    let (callback, mut results) = recorder();
    let _token = retry.observe(callback);

    assert_eq!(
        results.next().await,
        Some(Ok(Response::EmptyError(FetchError::UnexpectedStatus(500))))
    );
    assert_eq!(results.next_within(Duration::from_millis(100)).await, None);
    assert_eq!(transport.invocations("/count"), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(retry.attempt(), None);
    assert!(!retry.is_running());
}

/// Failures before a success are absorbed; the observer only sees the success.
#[tokio::test]
async fn test_retry_success() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO));
    transport.enqueue("/count", TransportOutcome::new(503, ""));
    transport.enqueue("/count", TransportOutcome::unreachable(std::io::Error::other("reset")));
    transport.respond("/count", TransportOutcome::new(200, "42"));
    let retry =
        resource(&transport).with_retry_after(3, Backoff::Linear(Duration::from_millis(10)));

    let (callback, mut results) = recorder();
    let _token = retry.observe(callback);

    assert_eq!(results.next().await, Some(Ok(Response::Value(42))));
    assert_eq!(results.next_within(Duration::from_millis(50)).await, None);
    assert_eq!(transport.invocations("/count"), 3);
    assert_eq!(retry.attempt(), None);
}

/// Results the predicate rejects are forwarded without retrying.
#[tokio::test]
async fn test_retry_predicate() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO));
    transport.respond("/count", TransportOutcome::new(500, ""));
    let calls = Arc::new(AtomicU32::new(0));
    let retry = resource(&transport).with_retry(
        |result| !matches!(result, Ok(Response::EmptyError(FetchError::UnexpectedStatus(500)))),
        immediate(5, Arc::clone(&calls)),
    );

    let (callback, mut results) = recorder();
    let _token = retry.observe(callback);

    assert!(results.next().await.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.invocations("/count"), 1);
}

/// Releasing the observation cancels a scheduled retry.
#[tokio::test]
async fn test_release_cancels_scheduled_retry() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO));
    transport.respond("/count", TransportOutcome::new(500, ""));
    let retry =
        resource(&transport).with_retry_after(3, Backoff::Constant(Duration::from_millis(100)));

    let (callback, _results) = recorder();
    let token = retry.observe(callback);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(retry.is_running());
    token.release();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(transport.invocations("/count"), 1);
}
