use fetch_engine::configuration::{BlockTransformer, EndpointConfiguration};
use fetch_engine::decorators::ObservableExt;
use fetch_engine::framework::mock::{recorder, FakeTransport};
use fetch_engine::framework::{Observable, Resource, Response};
use fetch_engine::provider::{DataProvider, TransportOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type TextConfiguration = EndpointConfiguration<String, String, String>;
type Provider = DataProvider<FakeTransport>;

fn text(path: &'static str) -> TextConfiguration {
    let utf8 = || {
        BlockTransformer::new(|bytes: &[u8]| Ok(String::from_utf8_lossy(bytes).into_owned()))
    };
    EndpointConfiguration::new(move |_| Ok(path.to_string()), utf8(), utf8())
}

fn is_unauthorized(result: &fetch_engine::framework::FetchResult<String, String>) -> bool {
    matches!(result, Ok(Response::Error(body)) if body == "unauthorized")
}

fn setup() -> (Arc<FakeTransport>, Arc<Provider>) {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(5)));
    let provider = Arc::new(DataProvider::new(Arc::clone(&transport)));
    (transport, provider)
}

/// 401 on the primary, login succeeds, the primary is refreshed and succeeds.
#[tokio::test]
async fn test_recovery_flow() {
    let (transport, provider) = setup();
    transport.enqueue("/profile", TransportOutcome::new(401, "unauthorized"));
    transport.respond("/profile", TransportOutcome::new(200, "ada"));
    transport.respond("/login", TransportOutcome::new(200, "token-1"));

    let sessions: Arc<Mutex<Vec<String>>> = Arc::default();
    let store = Arc::clone(&sessions);
    let login = Resource::new(text("/login"), Arc::clone(&provider));
    let profile = Resource::new(text("/profile"), provider).with_recovery(
        login,
        is_unauthorized,
        move |response| {
            if let Some(token) = response.value() {
                store.lock().unwrap().push(token.clone());
            }
        },
    );

    let (callback, mut results) = recorder();
    let _token = profile.observe(callback);

    assert_eq!(results.next().await, Some(Ok(Response::Value("ada".to_string()))));
    assert_eq!(results.next_within(Duration::from_millis(50)).await, None);
    assert_eq!(*sessions.lock().unwrap(), vec!["token-1".to_string()]);
    assert_eq!(transport.invocations("/profile"), 2);
    assert_eq!(transport.invocations("/login"), 1);
    assert!(!profile.is_recovering());
}

/// When the secondary fails, the observer gets the original primary failure.
#[tokio::test]
async fn test_failed_recovery_forwards_original() {
    let (transport, provider) = setup();
    transport.respond("/profile", TransportOutcome::new(401, "unauthorized"));
    transport.respond("/login", TransportOutcome::new(403, "locked"));

    let recovered = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&recovered);
    let login = Resource::new(text("/login"), Arc::clone(&provider));
    let profile = Resource::new(text("/profile"), provider).with_recovery(
        login,
        is_unauthorized,
        move |_| *counter.lock().unwrap() += 1,
    );

    let (callback, mut results) = recorder();
    let _token = profile.observe(callback);

    assert_eq!(
        results.next().await,
        Some(Ok(Response::Error("unauthorized".to_string())))
    );
    assert_eq!(*recovered.lock().unwrap(), 0);
    assert_eq!(transport.invocations("/profile"), 1);
    assert!(!profile.is_running());
}
