use fetch_engine::configuration::{
    BlockTransformer, EmptyTransformer, EndpointConfiguration, Expiration, JsonTransformer,
};
use fetch_engine::framework::mock::{recorder, FakeTransport};
use fetch_engine::framework::{
    ExecutionContext, FetchError, MapError, Observable, Resource, ResourceState, Response,
};
use fetch_engine::provider::{DataProvider, TransportOutcome};
use serde::Deserialize;
use std::sync::{Arc, Barrier};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct User {
    name: String,
    age: u32,
}

type UserConfiguration = EndpointConfiguration<String, User, String>;
type Provider = DataProvider<FakeTransport>;

const ADA: &str = r#"{"name":"Ada","age":36}"#;

fn ada() -> User {
    User {
        name: "Ada".to_string(),
        age: 36,
    }
}

fn user_configuration() -> UserConfiguration {
    EndpointConfiguration::new(
        |_| Ok("/user".to_string()),
        JsonTransformer::new(),
        BlockTransformer::new(|bytes| Ok(String::from_utf8_lossy(bytes).into_owned())),
    )
}

fn setup(latency: Duration) -> (Arc<FakeTransport>, Arc<Provider>) {
    let transport = Arc::new(FakeTransport::new(latency));
    let provider = Arc::new(DataProvider::new(Arc::clone(&transport)));
    (transport, provider)
}

/// Two observers registered while a fetch is running share that fetch.
#[tokio::test]
async fn test_concurrent_observers_share_one_fetch() {
    let (transport, provider) = setup(Duration::from_millis(50));
    transport.respond("/user", TransportOutcome::new(200, ADA));
    let resource = Resource::new(user_configuration(), provider);

    let (first, mut first_results) = recorder();
    let (second, mut second_results) = recorder();
    let _first = resource.observe(first);
    let _second = resource.observe(second);
    assert!(resource.is_running());

    assert_eq!(first_results.next().await, Some(Ok(Response::Value(ada()))));
    assert_eq!(second_results.next().await, Some(Ok(Response::Value(ada()))));
    assert_eq!(transport.invocations("/user"), 1);
    assert!(!resource.is_running());
}

/// A fresh cached response is served to a new observer without contacting the transport.
#[tokio::test]
async fn test_cache_hit_and_expiration() {
    let (transport, provider) = setup(Duration::ZERO);
    transport.respond("/user", TransportOutcome::new(200, ADA));
    let configuration =
        user_configuration().with_expiration(Expiration::Interval(Duration::from_millis(100)));
    let resource = Resource::new(configuration, provider);

    let (callback, mut results) = recorder();
    let _token = resource.observe(callback);
    assert!(results.next().await.is_some());
    assert!(!resource.is_resource_expired());

    let (callback, mut cached) = recorder();
    let _cached = resource.observe(callback);
    assert_eq!(cached.try_next(), Some(Ok(Response::Value(ada()))));
    assert_eq!(transport.invocations("/user"), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(resource.is_resource_expired());

    let (callback, mut late) = recorder();
    let _late = resource.observe(callback);
    assert!(late.next().await.is_some());
    assert_eq!(transport.invocations("/user"), 2);
}

/// Releasing the last token cancels the fetch; nobody hears about it afterwards.
#[tokio::test]
async fn test_teardown_cancels_fetch() {
    let (transport, provider) = setup(Duration::from_millis(100));
    transport.respond("/user", TransportOutcome::new(200, ADA));
    let resource = Resource::new(user_configuration(), provider);

    let (callback, mut results) = recorder();
    let token = resource.observe(callback);
    assert!(resource.is_running());

    token.release();
    assert!(!resource.is_running());

    assert_eq!(results.next_within(Duration::from_millis(200)).await, None);
    assert_eq!(resource.state(), ResourceState::Initial);
}

/// A declining value transformer yields `EmptyValue`, which still counts as a success.
#[tokio::test]
async fn test_graceful_empty_value() {
    let (transport, provider) = setup(Duration::ZERO);
    transport.respond("/ping", TransportOutcome::new(204, ""));
    let configuration: EndpointConfiguration<String, (), ()> = EndpointConfiguration::new(
        |_| Ok("/ping".to_string()),
        EmptyTransformer::new(),
        EmptyTransformer::new(),
    )
    .with_expiration(Expiration::Interval(Duration::from_secs(60)));
    let resource = Resource::new(configuration, provider);

    let (callback, mut results) = recorder();
    let _token = resource.observe(callback);

    assert_eq!(results.next().await, Some(Ok(Response::EmptyValue)));
    assert_eq!(resource.state(), ResourceState::Data(Response::EmptyValue));
    assert!(!resource.is_resource_expired());
}

/// A declining error transformer yields `EmptyError` carrying the original failure.
#[tokio::test]
async fn test_graceful_empty_error() {
    let (transport, provider) = setup(Duration::ZERO);
    transport.respond("/ping", TransportOutcome::new(503, ""));
    let configuration: EndpointConfiguration<String, (), ()> = EndpointConfiguration::new(
        |_| Ok("/ping".to_string()),
        EmptyTransformer::new(),
        EmptyTransformer::new(),
    );
    let resource = Resource::new(configuration, provider);

    let (callback, mut results) = recorder();
    let _token = resource.observe(callback);

    assert_eq!(
        results.next().await,
        Some(Ok(Response::EmptyError(FetchError::UnexpectedStatus(503))))
    );
}

/// Domain errors are mapped values, raw failures are not.
#[tokio::test]
async fn test_error_classification() {
    let (transport, provider) = setup(Duration::ZERO);
    transport.enqueue("/user", TransportOutcome::new(404, "no such user"));
    transport.enqueue("/user", TransportOutcome::new(200, "{"));
    let resource = Resource::new(user_configuration(), provider);

    let (callback, mut results) = recorder();
    let _token = resource.observe(callback);
    assert_eq!(
        results.next().await,
        Some(Ok(Response::Error("no such user".to_string())))
    );

    resource.refresh();
    match results.next().await {
        Some(Err(FetchError::Mapping(MapError::Decode(_)))) => {}
        other => panic!("expected a decode failure, got {other:?}"),
    }
    assert!(matches!(resource.state(), ResourceState::Error(_)));

    // Nothing scripted anymore: the transport reports an unreachable path.
    resource.refresh();
    assert!(matches!(
        results.next().await,
        Some(Err(FetchError::Transport(_)))
    ));
}

/// Observers bound to the runtime context receive results on a drain task, in order.
#[tokio::test]
async fn test_runtime_execution_context() {
    let (transport, provider) = setup(Duration::ZERO);
    transport.enqueue("/user", TransportOutcome::new(200, ADA));
    transport.respond("/user", TransportOutcome::new(200, r#"{"name":"Ada","age":37}"#));
    let resource = Resource::new(user_configuration(), provider);

    let (callback, mut results) = recorder();
    let _token = resource.observe_on(ExecutionContext::current(), callback);
    assert_eq!(results.next().await, Some(Ok(Response::Value(ada()))));

    resource.refresh();
    let older = User {
        name: "Ada".to_string(),
        age: 37,
    };
    assert_eq!(results.next().await, Some(Ok(Response::Value(older))));
}

/// Observers registering from many OS threads at once still share a single fetch.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_observers_share_one_fetch() {
    const THREADS: usize = 16;
    let (transport, provider) = setup(Duration::from_millis(200));
    transport.respond("/user", TransportOutcome::new(200, ADA));
    let resource = Resource::new(user_configuration(), provider);
    let barrier = Arc::new(Barrier::new(THREADS));

    let threads: Vec<_> = (0..THREADS)
        .map(|_| {
            let resource = resource.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let (callback, results) = recorder();
                barrier.wait();
                let token = resource.observe(callback);
                (token, results)
            })
        })
        .collect();
    let mut observations: Vec<_> = threads
        .into_iter()
        .map(|thread| thread.join().expect("observer thread panicked"))
        .collect();

    for (_token, results) in &mut observations {
        assert_eq!(results.next().await, Some(Ok(Response::Value(ada()))));
    }
    assert_eq!(transport.invocations("/user"), 1);
    assert_eq!(resource.observer_count(), THREADS);
}

/// Interleaved observe, refresh and release from many threads leaves the resource idle.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_refresh_and_release_settle() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 25;
    let (transport, provider) = setup(Duration::from_millis(2));
    transport.respond("/user", TransportOutcome::new(200, ADA));
    let resource = Resource::new(user_configuration(), provider);
    let barrier = Arc::new(Barrier::new(THREADS));

    let threads: Vec<_> = (0..THREADS)
        .map(|thread| {
            let resource = resource.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    let (callback, _results) = recorder();
                    let token = resource.observe(callback);
                    resource.refresh();
                    if (thread + round) % 3 == 0 {
                        std::thread::sleep(Duration::from_millis(3));
                    }
                    if round % 2 == 0 {
                        token.release();
                    } else {
                        drop(token);
                    }
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("observer thread panicked");
    }

    assert_eq!(resource.observer_count(), 0);
    assert!(!resource.is_running());
    assert!(transport.invocations("/user") >= 1);

    // Late completions of cancelled fetches leave it idle.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!resource.is_running());
}
