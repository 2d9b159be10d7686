//! `LiveStreamConnector` against the mock stream endpoint.

use std::time::Duration;

use lib_common::ingestors::{stream_url, LiveStreamConnector, SessionEnd, StreamFrame, StreamState};
use project_tests::{MockControlPlane, GREETING};
use tokio::time::timeout;

const IDENTITY: &str = "dd-stats-test";

#[tokio::test]
async fn close_frame_ends_session_cleanly() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.close_streams_after_greeting(true);

    let url = stream_url(&mock.host(), false, IDENTITY).unwrap();
    let connector = LiveStreamConnector::new(url, Duration::from_millis(100));
    let mut frames = connector.frames();
    let state = connector.state();

    let end = timeout(Duration::from_secs(5), connector.run_session()).await.unwrap();
    assert!(matches!(end, Ok(SessionEnd::CloseFrame)), "{:?}", end);
    assert_eq!(*state.borrow(), StreamState::Disconnected);

    match frames.try_recv() {
        Ok(frame) => assert_eq!(*frame, StreamFrame::Text(GREETING.to_string())),
        Err(e) => panic!("greeting was not relayed: {:?}", e),
    }
    assert_eq!(mock.stream_ids(), vec![IDENTITY.to_string()]);
}

#[tokio::test]
async fn run_reconnects_after_each_close() {
    let mock = MockControlPlane::start().await.unwrap();
    mock.close_streams_after_greeting(true);

    let url = stream_url(&mock.host(), false, IDENTITY).unwrap();
    let connector = LiveStreamConnector::new(url, Duration::from_millis(100));

    let _ = timeout(Duration::from_millis(450), connector.run()).await;
    let connections = mock.stream_ids().len();
    assert!((2..=5).contains(&connections), "{} connections", connections);
}

#[tokio::test]
async fn open_stream_stays_connected() {
    let mock = MockControlPlane::start().await.unwrap();

    let url = stream_url(&mock.host(), false, IDENTITY).unwrap();
    let connector = LiveStreamConnector::new(url, Duration::from_millis(100));
    let mut state = connector.state();

    let session = connector.run_session();
    tokio::pin!(session);
    let connected = tokio::select! {
        _ = &mut session => panic!("session ended while the server held it open"),
        changed = timeout(Duration::from_secs(5), state.wait_for(|s| *s == StreamState::Connected)) => {
            matches!(changed, Ok(Ok(_)))
        }
    };
    assert!(connected);
    assert_eq!(mock.stream_ids().len(), 1);
}

#[tokio::test]
async fn silent_endpoint_is_observed_as_a_timeout() {
    // Accepts TCP (via the backlog) but never answers the upgrade.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();

    let connector = LiveStreamConnector::new(stream_url(&host, false, IDENTITY).unwrap(), Duration::from_millis(100));
    let state = connector.state();

    assert!(timeout(Duration::from_millis(300), connector.run_session()).await.is_err());
    assert_eq!(*state.borrow(), StreamState::Connecting);
    drop(listener);
}

#[tokio::test]
async fn refused_connection_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let connector = LiveStreamConnector::new(stream_url(&host, false, IDENTITY).unwrap(), Duration::from_millis(100));
    assert!(timeout(Duration::from_secs(5), connector.run_session()).await.unwrap().is_err());
}
