//! Connection Pool Edge Cases & Error Handling Tests

use connpool::{ConnPoolError, ConnectionPool, PoolSettings};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

/// Loopback listener that never accepts, with its backlog already full so
/// further handshakes stall until the dialer gives up.
async fn saturated_listener() -> (TcpListener, Vec<TcpStream>, String) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut fillers = Vec::new();
    for _ in 0..16 {
        match tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => fillers.push(stream),
            _ => break,
        }
    }
    assert!(!fillers.is_empty(), "backlog filler never connected");

    (listener, fillers, addr.to_string())
}

#[tokio::test]
async fn unresolvable_host_is_resolution_error() {
    let pool = ConnectionPool::default();

    let err = pool.get("no-such-host.invalid").await.unwrap_err();
    assert!(err.is_resolution(), "unexpected error: {:?}", err);
    assert!(!err.is_dial());
    assert_eq!(pool.stats().destinations, 0);
}

#[tokio::test]
async fn closed_server_is_dial_error() {
    let pool = ConnectionPool::default();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = pool.get(&target).await.unwrap_err();
    assert!(err.is_dial(), "unexpected error: {:?}", err);
    assert!(!err.is_timeout());
    assert_eq!(pool.connection_count(&target).await.unwrap(), 0);
}

#[tokio::test]
async fn bounded_dial_to_full_backlog_is_timeout() {
    let (_listener, _fillers, target) = saturated_listener().await;
    let pool = ConnectionPool::default();

    let start = Instant::now();
    let err = pool
        .get_with_timeout(&target, Duration::from_millis(200))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "unexpected error: {:?}", err);
    assert!(err.is_dial());
    match err {
        ConnPoolError::Timeout { address, timeout } => {
            assert_eq!(address, target);
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(200), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    assert_eq!(pool.connection_count(&target).await.unwrap(), 0);
}

#[tokio::test]
async fn bounded_dial_to_unresponsive_host_fails_fast() {
    let pool = ConnectionPool::default();

    // RFC 5737 TEST-NET-1, never answers
    let start = Instant::now();
    let result = pool
        .get_with_timeout("192.0.2.1:9999", Duration::from_millis(200))
        .await;
    let elapsed = start.elapsed();

    match result {
        Err(ConnPoolError::Timeout { address, timeout }) => {
            assert_eq!(address, "192.0.2.1:9999");
            assert_eq!(timeout, Duration::from_millis(200));
            assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
        }
        // Hosts without a route fail before the bound is reached.
        Err(e) => assert!(e.is_dial(), "unexpected error: {:?}", e),
        Ok(_) => panic!("TEST-NET-1 should not accept connections"),
    }
}

#[tokio::test]
async fn configured_connect_timeout_bounds_plain_get() {
    let (_listener, _fillers, target) = saturated_listener().await;
    let pool = ConnectionPool::new(PoolSettings {
        connect_timeout_ms: Some(150),
        ..Default::default()
    });

    let start = Instant::now();
    let err = pool.get(&target).await.unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {:?}", err);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn host_without_port_uses_configured_default() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let pool = ConnectionPool::new(PoolSettings {
        default_port: port,
        ..Default::default()
    });

    let conn = pool.get("127.0.0.1").await.unwrap();
    assert_eq!(conn.address().port(), port);
    assert_eq!(pool.connection_count("127.0.0.1").await.unwrap(), 1);
}

#[tokio::test]
async fn dropping_checked_out_connection_forgets_it() {
    let pool = ConnectionPool::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();

    {
        let _conn = pool.get(&target).await.unwrap();
        assert_eq!(pool.stats().busy, 1);
    }

    let stats = pool.stats();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.destinations, 1, "partitions outlive their connections");
}

#[tokio::test]
async fn close_idle_then_get_dials_again() {
    let pool = ConnectionPool::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();

    let conn = pool.get(&target).await.unwrap();
    let id = conn.id();
    pool.put(conn);

    assert_eq!(pool.close_idle().await, 1);
    assert_eq!(pool.close_idle().await, 0);

    let conn = pool.get(&target).await.unwrap();
    assert_ne!(conn.id(), id);
}

#[tokio::test]
async fn zero_keep_alive_evicts_promptly() {
    let pool = ConnectionPool::default();
    pool.set_keep_alive_timeout(Duration::ZERO);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();

    let conn = pool.get(&target).await.unwrap();
    pool.put(conn);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pool.connection_count(&target).await.unwrap(), 0);
}
