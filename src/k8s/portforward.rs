//! Port forwarding to a pod
//!
//! A [`TunnelSession`] owns one local port for the duration of an
//! invocation. Its lifecycle is
//!
//! ```text
//! Allocated -> Forwarding -> Ready -> Closed
//!                   \          \
//!                    `----------`-> Failed
//! ```
//!
//! A single background task owns the listener and every relay. The
//! foreground only reads the state through a watch channel, so the task is
//! the only writer.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::Client;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{KubectlCurlError, Result};

/// Lowest local port handed out (inclusive)
pub const LOCAL_PORT_MIN: u16 = 10200;
/// Highest local port handed out (exclusive)
pub const LOCAL_PORT_MAX: u16 = 16383;

/// Range local ports are drawn from, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: LOCAL_PORT_MIN,
            end: LOCAL_PORT_MAX,
        }
    }
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start == 0 || start >= end {
            return Err(KubectlCurlError::Config(format!(
                "invalid local port range {}..{}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..self.end).contains(&port)
    }

    /// Pick a port at random
    ///
    /// Nothing checks that the port is free; a taken port fails the bind.
    pub fn random_port(&self) -> u16 {
        rand::rng().random_range(self.start..self.end)
    }
}

/// Where the tunnel leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub namespace: String,
    pub pod: String,
    pub port: u16,
}

/// Opens byte streams to a pod port
///
/// Each accepted local connection gets its own stream.
pub trait TunnelTransport: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn open(&self, target: &ForwardTarget) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Any bidirectional async byte stream
pub trait Duplex: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Duplex for T {}

/// Transport over the API server's pod `portforward` subresource
#[derive(Clone)]
pub struct KubeTransport {
    client: Client,
}

impl KubeTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl TunnelTransport for KubeTransport {
    type Stream = Box<dyn Duplex>;

    async fn open(&self, target: &ForwardTarget) -> Result<Self::Stream> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);
        let mut forwarder = pods
            .portforward(&target.pod, &[target.port])
            .await
            .map_err(|e| {
                KubectlCurlError::TunnelEstablish(format!(
                    "unable to upgrade connection to pod {}: {}",
                    target.pod, e
                ))
            })?;

        let stream = forwarder.take_stream(target.port).ok_or_else(|| {
            KubectlCurlError::TunnelEstablish(format!(
                "no stream for port {} of pod {}",
                target.port, target.pod
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = forwarder.join().await {
                debug!(error = %e, "port forwarder ended with error");
            }
        });

        Ok(Box::new(stream))
    }
}

/// Lifecycle state of a tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelState {
    /// Local port chosen, nothing bound yet
    Allocated,
    /// Binding the local port and opening the first upstream stream
    Forwarding,
    /// Accepting local connections
    Ready,
    /// Background task finished without error
    Closed,
    /// Background task finished with an error
    Failed(String),
}

impl TunnelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TunnelState::Closed | TunnelState::Failed(_))
    }
}

/// Outcome of waiting for the tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Cancelled,
}

/// One local-port-to-pod-port tunnel
pub struct TunnelSession {
    local_port: u16,
    state_tx: Option<watch::Sender<TunnelState>>,
    state_rx: watch::Receiver<TunnelState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TunnelSession {
    /// Reserve a random port from `range`
    ///
    /// The session shuts down when `cancel` fires.
    pub fn allocate(range: PortRange, cancel: &CancellationToken) -> Self {
        Self::with_port(range.random_port(), cancel)
    }

    pub fn with_port(local_port: u16, cancel: &CancellationToken) -> Self {
        let (state_tx, state_rx) = watch::channel(TunnelState::Allocated);
        Self {
            local_port,
            state_tx: Some(state_tx),
            state_rx,
            shutdown: cancel.child_token(),
            task: None,
        }
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn state(&self) -> TunnelState {
        self.state_rx.borrow().clone()
    }

    /// Spawn the background task that binds the port and relays traffic
    pub fn start<T: TunnelTransport>(
        &mut self,
        transport: Arc<T>,
        target: ForwardTarget,
    ) -> Result<()> {
        let state = self.state_tx.take().ok_or_else(|| {
            KubectlCurlError::TunnelEstablish("tunnel already started".to_string())
        })?;
        state.send_replace(TunnelState::Forwarding);

        let shutdown = self.shutdown.clone();
        let local_port = self.local_port;
        self.task = Some(tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Ok(()),
                result = forward(transport, target, local_port, &state) => result,
            };

            let last = match outcome {
                Ok(()) => TunnelState::Closed,
                Err(e) => TunnelState::Failed(e.to_string()),
            };
            debug!(local_port, state = ?last, "port forwarder stopped");
            state.send_replace(last);
        }));

        Ok(())
    }

    /// Block until the tunnel is ready or `cancel` fires
    ///
    /// Cancellation wins over readiness and closes the session before
    /// returning, so a `Cancelled` result never leaves the port bound.
    pub async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<Readiness> {
        if self.state_tx.is_some() {
            return Err(KubectlCurlError::TunnelEstablish(
                "tunnel not started".to_string(),
            ));
        }

        loop {
            if cancel.is_cancelled() {
                self.close().await;
                return Ok(Readiness::Cancelled);
            }

            let state = self.state_rx.borrow_and_update().clone();
            match state {
                TunnelState::Ready => return Ok(Readiness::Ready),
                TunnelState::Failed(msg) => return Err(KubectlCurlError::TunnelEstablish(msg)),
                TunnelState::Closed => return Ok(Readiness::Cancelled),
                TunnelState::Allocated | TunnelState::Forwarding => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                changed = self.state_rx.changed() => {
                    if changed.is_err() && !self.state_rx.borrow().is_terminal() {
                        return Err(KubectlCurlError::TunnelEstablish(
                            "port forwarder exited unexpectedly".to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// Stop forwarding and release the local port
    ///
    /// Idempotent. Returns once the background task and all relays are gone.
    pub async fn close(&mut self) {
        self.shutdown.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("port forwarder panicked");
                }
            }
        }

        if let Some(state) = self.state_tx.take() {
            state.send_replace(TunnelState::Closed);
        }
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Bind the local port, check the upstream, then relay until dropped
async fn forward<T: TunnelTransport>(
    transport: Arc<T>,
    target: ForwardTarget,
    local_port: u16,
    state: &watch::Sender<TunnelState>,
) -> Result<()> {
    let v4 = TcpListener::bind((Ipv4Addr::LOCALHOST, local_port))
        .await
        .map_err(|e| {
            KubectlCurlError::TunnelEstablish(format!(
                "unable to listen on port {}: {}",
                local_port, e
            ))
        })?;
    let v6 = match TcpListener::bind((Ipv6Addr::LOCALHOST, local_port)).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            debug!(local_port, error = %e, "not listening on [::1]");
            None
        }
    };

    // Opening one stream up front surfaces upgrade failures before Ready.
    let mut warm = Some(transport.open(&target).await?);

    state.send_replace(TunnelState::Ready);
    debug!(
        "Forwarding from localhost:{} -> {}/{}:{}",
        local_port, target.namespace, target.pod, target.port
    );

    let mut relays = JoinSet::new();
    loop {
        tokio::select! {
            accepted = accept(&v4, v6.as_ref()) => match accepted {
                Ok((inbound, peer)) => {
                    debug!(%peer, "handling connection");
                    let upstream = warm.take();
                    let transport = Arc::clone(&transport);
                    let target = target.clone();
                    relays.spawn(async move {
                        let upstream = match upstream {
                            Some(stream) => stream,
                            None => transport.open(&target).await?,
                        };
                        relay(inbound, upstream).await
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            },
            Some(finished) = relays.join_next() => match finished {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "connection relay failed"),
                Err(e) if e.is_panic() => warn!("connection relay panicked"),
                Err(_) => {}
            },
        }
    }
}

async fn accept(
    v4: &TcpListener,
    v6: Option<&TcpListener>,
) -> io::Result<(TcpStream, SocketAddr)> {
    match v6 {
        Some(v6) => tokio::select! {
            accepted = v4.accept() => accepted,
            accepted = v6.accept() => accepted,
        },
        None => v4.accept().await,
    }
}

async fn relay<S>(mut inbound: TcpStream, mut upstream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sent, received) = tokio::io::copy_bidirectional(&mut inbound, &mut upstream).await?;
    debug!(sent, received, "connection closed");
    Ok(())
}
