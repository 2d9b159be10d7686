//! `SubscriptionClient` against the mock control plane.

use std::time::Duration;

use lib_common::rooms::{ClientIdentity, RoomId, SubscriptionApplyError, SubscriptionClient, SubscriptionQueryError};
use project_tests::MockControlPlane;

const IDENTITY: &str = "dd-stats-test";

fn rooms(raw: &[u64]) -> Vec<RoomId> {
    raw.iter().filter_map(|r| RoomId::new(*r)).collect()
}

async fn client(mock: &MockControlPlane) -> SubscriptionClient {
    SubscriptionClient::new(&mock.base_url(), &ClientIdentity::new(IDENTITY), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn apply_then_query_round_trip() {
    let mock = MockControlPlane::start().await.unwrap();
    let client = client(&mock).await;

    assert!(client.query().await.unwrap().is_empty());

    let applied = client.apply(&rooms(&[255, 22361593])).await.unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(mock.subscribed(IDENTITY), vec![255, 22361593]);

    assert_eq!(client.query().await.unwrap().len(), 2);
    assert_eq!(mock.apply_calls(), 1);
    assert_eq!(mock.query_calls(), 2);
}

#[tokio::test]
async fn apply_replaces_the_whole_set() {
    let mock = MockControlPlane::start().await.unwrap();
    let client = client(&mock).await;

    client.apply(&rooms(&[1, 2, 3])).await.unwrap();
    client.apply(&rooms(&[4])).await.unwrap();
    assert_eq!(mock.subscribed(IDENTITY), vec![4]);
}

#[tokio::test]
async fn wiped_control_plane_reports_empty_set() {
    let mock = MockControlPlane::start().await.unwrap();
    let client = client(&mock).await;

    client.apply(&rooms(&[7])).await.unwrap();
    mock.wipe_subscriptions();
    assert!(client.query().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejection_with_error_detail() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.fail_subscribe(Some((400, r#"{"error":"too many rooms"}"#)));
    let client = client(&mock).await;

    match client.apply(&rooms(&[1])).await {
        Err(SubscriptionApplyError::Rejected { status, detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail, "too many rooms");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn rejection_without_error_detail_keeps_raw_body() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.fail_subscribe(Some((502, "<html>bad gateway</html>")));
    let client = client(&mock).await;

    match client.apply(&rooms(&[1])).await {
        Err(SubscriptionApplyError::RawBody { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "<html>bad gateway</html>");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_control_plane_is_a_fetch_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let client = SubscriptionClient::new(&base, &ClientIdentity::new(IDENTITY), Duration::from_secs(2)).unwrap();
    assert!(matches!(client.query().await, Err(SubscriptionQueryError::Fetch(_))));
}
