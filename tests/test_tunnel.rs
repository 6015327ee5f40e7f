//! Tunnel session lifecycle over loopback transports
mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kubectl_curl::errors::KubectlCurlError;
use kubectl_curl::k8s::{ForwardTarget, Readiness, TunnelSession, TunnelState};

use common::{
    echo_server, free_port, http_get, FailingTransport, LoopbackTransport, PendingTransport,
};

fn target(port: u16) -> ForwardTarget {
    ForwardTarget {
        namespace: "default".to_string(),
        pod: "web-0".to_string(),
        port,
    }
}

async fn wait_for(session: &TunnelSession, expected: TunnelState) {
    for _ in 0..100 {
        if session.state() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("tunnel stuck in {:?}, expected {:?}", session.state(), expected);
}

// ============================================================================
// Relaying
// ============================================================================

#[tokio::test]
async fn test_relays_bytes_both_ways() {
    let upstream = echo_server().await;
    let transport = Arc::new(LoopbackTransport::new(upstream));
    let cancel = CancellationToken::new();

    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session.start(transport.clone(), target(8080)).unwrap();
    assert_eq!(session.wait_ready(&cancel).await.unwrap(), Readiness::Ready);
    assert_eq!(session.state(), TunnelState::Ready);

    for message in [&b"first"[..], &b"second"[..]] {
        let mut stream = TcpStream::connect(("127.0.0.1", session.local_port()))
            .await
            .unwrap();
        stream.write_all(message).await.unwrap();
        let mut buf = vec![0u8; message.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, message);
    }

    assert!(transport.opened().iter().all(|t| *t == target(8080)));
    session.close().await;
}

#[tokio::test]
async fn test_http_through_tunnel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let transport = Arc::new(LoopbackTransport::new(*server.address()));
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session.start(transport, target(80)).unwrap();
    session.wait_ready(&cancel).await.unwrap();

    let response = http_get(session.local_port(), "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    session.close().await;
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_close_releases_port() {
    let upstream = echo_server().await;
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    let port = session.local_port();

    session
        .start(Arc::new(LoopbackTransport::new(upstream)), target(8080))
        .unwrap();
    session.wait_ready(&cancel).await.unwrap();

    session.close().await;
    assert_eq!(session.state(), TunnelState::Closed);
    session.close().await;
    assert_eq!(session.state(), TunnelState::Closed);

    std::net::TcpListener::bind(("127.0.0.1", port)).expect("port still bound after close");
}

#[tokio::test]
async fn test_cancel_while_forwarding() {
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session.start(Arc::new(PendingTransport), target(8080)).unwrap();
    wait_for(&session, TunnelState::Forwarding).await;

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let readiness = tokio::time::timeout(Duration::from_secs(5), session.wait_ready(&cancel))
        .await
        .expect("cancellation did not stop the wait")
        .unwrap();
    assert_eq!(readiness, Readiness::Cancelled);
    assert_eq!(session.state(), TunnelState::Closed);
}

#[tokio::test]
async fn test_parent_cancel_closes_ready_tunnel() {
    let upstream = echo_server().await;
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session
        .start(Arc::new(LoopbackTransport::new(upstream)), target(8080))
        .unwrap();
    session.wait_ready(&cancel).await.unwrap();

    cancel.cancel();
    wait_for(&session, TunnelState::Closed).await;
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_transport_failure_is_fatal() {
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session.start(Arc::new(FailingTransport), target(8080)).unwrap();

    let err = session.wait_ready(&cancel).await.unwrap_err();
    assert!(matches!(err, KubectlCurlError::TunnelEstablish(_)));
    assert!(err.to_string().contains("web-0"));
    assert!(matches!(session.state(), TunnelState::Failed(_)));
}

#[tokio::test]
async fn test_port_in_use_is_fatal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let upstream = echo_server().await;
    let cancel = CancellationToken::new();

    let mut session = TunnelSession::with_port(port, &cancel);
    session
        .start(Arc::new(LoopbackTransport::new(upstream)), target(8080))
        .unwrap();

    let err = session.wait_ready(&cancel).await.unwrap_err();
    assert!(matches!(err, KubectlCurlError::TunnelEstablish(_)));
}

#[tokio::test]
async fn test_start_twice() {
    let cancel = CancellationToken::new();
    let mut session = TunnelSession::with_port(free_port(), &cancel);
    session.start(Arc::new(PendingTransport), target(8080)).unwrap();

    let err = session
        .start(Arc::new(PendingTransport), target(8080))
        .unwrap_err();
    assert!(matches!(err, KubectlCurlError::TunnelEstablish(_)));
    session.close().await;
}
