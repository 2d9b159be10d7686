//! The full startup sequence against the mock control plane.

use std::time::Duration;

use lib_common::core::{LoopTimings, Orchestrator, RelayError, RelayOptions, RetryPolicy};
use lib_common::ingestors::{stream_url, LiveStreamConnector};
use lib_common::rooms::{ClientIdentity, DirectoryClient, SubscriptionClient, DEFAULT_ROOM_FIELD};
use project_tests::MockControlPlane;
use serde_json::json;
use tokio::time::timeout;

const IDENTITY: &str = "dd-stats-test";

fn orchestrator(mock: &MockControlPlane, force_subscribe_first: bool) -> Orchestrator<DirectoryClient, SubscriptionClient> {
    let http_timeout = Duration::from_secs(5);
    let identity = ClientIdentity::new(IDENTITY);
    let directory = DirectoryClient::new(&mock.roster_url(), DEFAULT_ROOM_FIELD, http_timeout).unwrap();
    let subscriptions = SubscriptionClient::new(&mock.base_url(), &identity, http_timeout).unwrap();
    let connector = LiveStreamConnector::new(
        stream_url(&mock.host(), false, identity.as_str()).unwrap(),
        Duration::from_millis(100),
    );
    let options = RelayOptions {
        force_subscribe_first,
        guard_refetch_on_empty: false,
        timings: LoopTimings {
            guard_interval: Duration::from_millis(150),
            refresh_interval: Duration::from_secs(60),
            retry: RetryPolicy::forever(Duration::from_millis(50)),
        },
    };
    Orchestrator::new(directory, subscriptions, connector, options)
}

#[tokio::test]
async fn missing_roster_aborts_before_anything_starts() {
    let mock = MockControlPlane::start().await.unwrap();

    let result = timeout(Duration::from_secs(5), orchestrator(&mock, true).run()).await.unwrap();
    assert!(matches!(result, Err(RelayError::Startup(_))), "{:?}", result.err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.roster_calls(), 1);
    assert_eq!(mock.apply_calls(), 0);
    assert_eq!(mock.query_calls(), 0);
    assert!(mock.stream_ids().is_empty());
}

#[tokio::test]
async fn force_subscribe_then_stream_and_guard() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.set_roster(json!({
        "a": { "room_id": 255 },
        "b": { "room_id": 22361593 }
    }));

    let _ = timeout(Duration::from_millis(400), orchestrator(&mock, true).run()).await;

    assert_eq!(mock.subscribed(IDENTITY), vec![255, 22361593]);
    assert_eq!(mock.apply_calls(), 1, "guard found a non-empty set and left it alone");
    assert!(mock.query_calls() >= 1);
    assert_eq!(mock.stream_ids().first().map(String::as_str), Some(IDENTITY));
}

#[tokio::test]
async fn guard_restores_a_wiped_control_plane() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.set_roster(json!({ "a": { "room_id": 7 } }));

    // No eager subscribe: the set starts empty and the guard's first check fills it.
    let _ = timeout(Duration::from_millis(400), orchestrator(&mock, false).run()).await;

    assert_eq!(mock.subscribed(IDENTITY), vec![7]);
    assert!(mock.apply_calls() >= 1);
}
