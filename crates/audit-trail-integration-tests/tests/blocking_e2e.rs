//! Blocking client against the in-process fake service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use audit_trail_sdk::{BlockingClient, ClientBuilder, ErrorKind, SearchCriteria};
use audit_trail_test::{TEST_TENANT, sample_event, sample_events};
use common::{FakeService, TEST_API_KEY, refused_url};
use tokio::runtime::Runtime;

/// Start the fake service on its own runtime; keep the runtime alive for the test.
fn serve() -> (Runtime, FakeService) {
    let runtime = Runtime::new().unwrap();
    let service = runtime.block_on(FakeService::start());
    (runtime, service)
}

fn blocking_client(service: &FakeService) -> BlockingClient {
    ClientBuilder::new()
        .server_url(service.url())
        .api_key(TEST_API_KEY)
        .build_blocking()
        .unwrap()
}

#[test]
fn test_blocking_round_trip() {
    let (_runtime, service) = serve();
    let client = blocking_client(&service);

    let response = client.log(&sample_event()).unwrap();
    let stored = client.get_by_id(&response.id).unwrap().unwrap();
    assert_eq!(stored.hash.as_deref(), Some(response.hash.as_str()));
    assert!(client.get_by_id("nope").unwrap().is_none());
}

#[test]
fn test_blocking_batch_and_search() {
    let (_runtime, service) = serve();
    let client = blocking_client(&service);

    let batch = client.log_batch(&sample_events(3)).unwrap();
    assert!(batch.is_success());
    assert_eq!(batch.succeeded, 3);

    let page = client
        .search(&SearchCriteria::for_tenant(TEST_TENANT))
        .unwrap();
    assert_eq!(page.total_count, 3);

    let quick = client.quick_search("user-2", TEST_TENANT, 0, 10).unwrap();
    assert_eq!(quick.total_count, 1);
}

#[test]
fn test_blocking_shared_across_threads() {
    let (_runtime, service) = serve();
    let client = Arc::new(blocking_client(&service));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || client.log(&sample_event()).map(|r| r.id))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(service.stored_count(), 4);
}

#[test]
fn test_blocking_surfaces_same_errors() {
    let client = ClientBuilder::new()
        .server_url(refused_url())
        .retry_attempts(1)
        .retry_delay(Duration::from_millis(5))
        .build_blocking()
        .unwrap();

    let err = client.log(&sample_event()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);

    let err = client
        .search(&SearchCriteria::for_tenant(""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_inside_async_context() {
    let service = FakeService::start().await;
    let client = blocking_client(&service);

    let response = client.log(&sample_event()).unwrap();
    assert_eq!(response.status, "STORED");
    drop(client);
}

#[test]
fn test_async_client_wrapped_later() {
    let (_runtime, service) = serve();
    let async_client = ClientBuilder::new()
        .server_url(service.url())
        .api_key(TEST_API_KEY)
        .build()
        .unwrap();
    let client = BlockingClient::new(async_client).unwrap();
    assert!(client.log(&sample_event()).is_ok());
    assert_eq!(client.config().retry_attempts(), 3);
}
