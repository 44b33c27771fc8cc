use crate::{cgi_response, config_for};
use interlink_common::{BridgeError, ConnectPolicy, Endpoint};
use interlink_core::{Bridge, ConnectionManager, Phase};
use interlink_protocol::RequestContext;
use interlink_tests::{refused_endpoint, StubBackend};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_backup_used_when_primary_refuses() {
    let backup = StubBackend::tcp(|_| cgi_response(&["Content-Type: text/plain"], b"ok"))
        .await
        .unwrap();
    let primary = refused_endpoint().await.unwrap();

    let manager = ConnectionManager::new(
        vec![primary, backup.endpoint()],
        ConnectPolicy {
            tries: 1,
            retry_delay_secs: 0,
        },
    );
    let conn = manager.connect().await.unwrap();

    assert_eq!(conn.endpoint(), &backup.endpoint());
    assert_eq!(conn.phase(), Phase::Sending);
}

#[tokio::test]
async fn test_exhausted_after_every_round() {
    let primary = refused_endpoint().await.unwrap();
    let backup = refused_endpoint().await.unwrap();

    let manager = ConnectionManager::new(
        vec![primary, backup],
        ConnectPolicy {
            tries: 3,
            retry_delay_secs: 0,
        },
    );

    match manager.connect().await {
        Err(BridgeError::ConnectionExhausted { attempts }) => assert_eq!(attempts, 6),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_delay_between_rounds() {
    let endpoint = refused_endpoint().await.unwrap();
    let manager = ConnectionManager::new(
        vec![endpoint],
        ConnectPolicy {
            tries: 2,
            retry_delay_secs: 1,
        },
    );

    let started = Instant::now();
    assert!(manager.connect().await.is_err());
    // One sleep between the two rounds, none after the last.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_unix_socket_is_exhausted() {
    let config = config_for(vec![Endpoint::unix("/nonexistent/interlink.sock")]);
    let bridge = Bridge::from_config(&config, false).unwrap();

    let err = bridge.open(&RequestContext::new()).await.unwrap_err();
    assert!(matches!(err, BridgeError::ConnectionExhausted { attempts: 2 }));
    assert_eq!(err.status_hint(), 503);
}
