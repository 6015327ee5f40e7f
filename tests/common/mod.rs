//! Common test utilities for kubectl-curl integration tests
//!
//! This module provides shared test infrastructure including:
//! - An in-memory cluster implementing `ClusterApi` and `NameProbe`
//! - Tunnel transports that relay to local TCP servers, hang, or fail
//! - CLI invocation helpers with an isolated config directory

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use kubectl_curl::errors::{KubectlCurlError, Result};
use kubectl_curl::k8s::{
    ClusterApi, ContainerInfo, ContainerPortInfo, ForwardTarget, NameProbe, PodInfo, ProbeKind,
    TunnelTransport, WorkloadKind,
};

pub const NAMESPACE: &str = "default";

// ============================================================================
// Pod builders
// ============================================================================

/// A container port; protocol as the API reports it
pub fn port(name: &str, number: i32, protocol: &str) -> ContainerPortInfo {
    ContainerPortInfo {
        name: Some(name.to_string()),
        container_port: number,
        protocol: protocol.to_string(),
    }
}

pub fn container(name: &str, ports: Vec<ContainerPortInfo>) -> ContainerInfo {
    ContainerInfo {
        name: name.to_string(),
        ports,
    }
}

pub fn pod_with_phase(name: &str, phase: &str, containers: Vec<ContainerInfo>) -> PodInfo {
    PodInfo {
        name: name.to_string(),
        namespace: NAMESPACE.to_string(),
        phase: phase.to_string(),
        containers,
    }
}

/// A running pod with one `app` container exposing `http` on 8080
pub fn web_pod(name: &str) -> PodInfo {
    pod_with_phase(
        name,
        "Running",
        vec![container("app", vec![port("http", 8080, "TCP")])],
    )
}

// ============================================================================
// In-memory cluster
// ============================================================================

/// Cluster contents held in memory
#[derive(Default)]
pub struct FakeCluster {
    pods: HashMap<String, PodInfo>,
    workloads: HashMap<(WorkloadKind, String), String>,
    selected: HashMap<String, Vec<PodInfo>>,
    /// Every call made, as `kubectl get` would spell it
    pub calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod(mut self, pod: PodInfo) -> Self {
        self.pods.insert(pod.name.clone(), pod);
        self
    }

    /// A workload selecting `pods`, in this listing order
    ///
    /// The pods are not reachable by name; add them with `with_pod` too
    /// when that matters.
    pub fn with_workload(mut self, kind: WorkloadKind, name: &str, pods: Vec<PodInfo>) -> Self {
        let selector = format!("app={}-{}", kind, name);
        self.workloads.insert((kind, name.to_string()), selector.clone());
        self.selected.insert(selector, pods);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ClusterApi for FakeCluster {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    async fn get_pod(&self, name: &str) -> Result<PodInfo> {
        self.record(format!("pod/{}", name));
        self.pods
            .get(name)
            .cloned()
            .ok_or_else(|| KubectlCurlError::PodNotFound {
                pod: name.to_string(),
                namespace: NAMESPACE.to_string(),
            })
    }

    async fn get_workload_selector(&self, kind: WorkloadKind, name: &str) -> Result<String> {
        self.record(format!("{}/{}", kind, name));
        self.workloads
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| KubectlCurlError::WorkloadNotFound {
                kind,
                name: name.to_string(),
            })
    }

    async fn list_pods(&self, selector: &str) -> Result<Vec<PodInfo>> {
        self.record(format!("pods -l {}", selector));
        Ok(self.selected.get(selector).cloned().unwrap_or_default())
    }
}

impl NameProbe for FakeCluster {
    async fn exists(&self, kind: ProbeKind, name: &str) -> bool {
        match kind {
            ProbeKind::Pod => self.pods.contains_key(name),
            ProbeKind::Workload(kind) => self.workloads.contains_key(&(kind, name.to_string())),
        }
    }
}

// ============================================================================
// Transports
// ============================================================================

/// Relays every tunnel connection to a local TCP address
pub struct LoopbackTransport {
    addr: SocketAddr,
    pub opened: Mutex<Vec<ForwardTarget>>,
}

impl LoopbackTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<ForwardTarget> {
        self.opened.lock().unwrap().clone()
    }
}

impl TunnelTransport for LoopbackTransport {
    type Stream = TcpStream;

    async fn open(&self, target: &ForwardTarget) -> Result<TcpStream> {
        self.opened.lock().unwrap().push(target.clone());
        TcpStream::connect(self.addr)
            .await
            .map_err(|e| KubectlCurlError::TunnelEstablish(e.to_string()))
    }
}

/// Never finishes opening a stream
pub struct PendingTransport;

impl TunnelTransport for PendingTransport {
    type Stream = TcpStream;

    async fn open(&self, _target: &ForwardTarget) -> Result<TcpStream> {
        std::future::pending().await
    }
}

/// Refuses every stream, like an API server that cannot upgrade
pub struct FailingTransport;

impl TunnelTransport for FailingTransport {
    type Stream = TcpStream;

    async fn open(&self, target: &ForwardTarget) -> Result<TcpStream> {
        Err(KubectlCurlError::TunnelEstablish(format!(
            "unable to upgrade connection to pod {}",
            target.pod
        )))
    }
}

// ============================================================================
// Local servers
// ============================================================================

/// Start a TCP server that echoes everything back
pub async fn echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// A port that was free a moment ago
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Send a bare HTTP/1.1 GET and return the whole response
pub async fn http_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
        path, port
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

// ============================================================================
// CLI helpers
// ============================================================================

/// Isolated environment for running the binary
pub struct TestEnv {
    /// Temporary config directory
    pub config_dir: TempDir,
    /// Environment variables to set
    pub env_vars: HashMap<String, String>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().expect("Failed to create temp config dir"),
            env_vars: HashMap::new(),
        }
    }

    pub fn set_env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().to_path_buf()
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), content)
            .expect("Failed to write config");
    }

    /// The binary, pointed at this environment's config directory
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_kubectl-curl"));
        cmd.env("KUBECTL_CURL_CONFIG_DIR", self.config_path());
        cmd.env_remove("KUBECTL_CURL_LOG_FORMAT");
        cmd.env_remove("RUST_LOG");
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }
}
