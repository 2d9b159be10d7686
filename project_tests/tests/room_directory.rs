//! `DirectoryClient` over HTTP.

use std::time::Duration;

use lib_common::rooms::{DirectoryClient, DirectoryError, RoomId, DEFAULT_ROOM_FIELD};
use project_tests::MockControlPlane;
use serde_json::json;

fn ids(roster: &[RoomId]) -> Vec<u64> {
    roster.iter().map(|r| r.get()).collect()
}

#[tokio::test]
async fn roster_keeps_directory_order_and_drops_unset_rooms() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.set_roster(json!({
        "zeta": { "name": "Z", "room_id": 22361593 },
        "alpha": { "name": "A", "room_id": 0 },
        "mid": { "name": "M", "room_id": 255 },
        "neg": { "name": "N", "room_id": -1 },
        "again": { "name": "Z2", "room_id": 22361593 }
    }));

    let directory = DirectoryClient::new(&mock.roster_url(), DEFAULT_ROOM_FIELD, Duration::from_secs(5)).unwrap();
    let roster = directory.fetch().await.unwrap();

    assert_eq!(ids(&roster), vec![22361593, 255, 22361593]);
    assert_eq!(mock.roster_calls(), 1);
}

#[tokio::test]
async fn unavailable_directory_reports_status() {
    let mock = MockControlPlane::start().await.unwrap();
    let directory = DirectoryClient::new(&mock.roster_url(), DEFAULT_ROOM_FIELD, Duration::from_secs(5)).unwrap();

    assert!(matches!(directory.fetch().await, Err(DirectoryError::Status(503))));
}

#[tokio::test]
async fn non_object_document_is_malformed() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.set_roster(json!([1, 2, 3]));
    let directory = DirectoryClient::new(&mock.roster_url(), DEFAULT_ROOM_FIELD, Duration::from_secs(5)).unwrap();

    assert!(matches!(directory.fetch().await, Err(DirectoryError::Malformed(_))));
}
