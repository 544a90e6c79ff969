//! Transport-level failure mapping against raw TCP peers

use forge_connect::RemoteStore;
use forge_core_interface::{ForgeStore, Guidance, StoreError, SystemDraft};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answer every connection with the same canned HTTP response
async fn canned_server(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_connection_refused_asks_for_configuration_check() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = RemoteStore::new(&format!("http://{addr}")).unwrap();
    let err = store.list_systems().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Unreachable {
            guidance: Guidance::CheckConfiguration,
            ..
        }
    ));
}

#[tokio::test]
async fn test_silent_backend_times_out_with_retry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let store = RemoteStore::with_timeouts(
        &format!("http://{addr}"),
        Duration::from_secs(1),
        Duration::from_millis(200),
    )
    .unwrap();
    let err = store
        .create_system(SystemDraft::new("Nova", "0xAAA", 5.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Unreachable {
            guidance: Guidance::Retry,
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let base = canned_server("503 Service Unavailable", r#"{"detail":"overloaded"}"#).await;
    let store = RemoteStore::new(&base).unwrap();
    let err = store.list_systems().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Unreachable {
            guidance: Guidance::Retry,
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_success_body_is_protocol_error() {
    let base = canned_server("200 OK", r#"{"star_systems": "nope"}"#).await;
    let store = RemoteStore::new(&base).unwrap();
    let err = store.list_systems().await.unwrap_err();
    assert!(matches!(err, StoreError::Protocol(_)));
}

#[tokio::test]
async fn test_validation_never_reaches_the_network() {
    // Nothing listens here; a request would surface as Unreachable.
    let store = RemoteStore::new("http://127.0.0.1:9").unwrap();
    let err = store
        .create_system(SystemDraft::new("No", "0xAAA", 5.0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::InvalidInput("Star system name must be at least 3 characters".into())
    );
}
