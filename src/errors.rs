//! Error types for kubectl-curl

use thiserror::Error;

use crate::k8s::WorkloadKind;

/// Main error type for kubectl-curl
///
/// Every variant is terminal to the invocation. The `Display` form is the
/// single-line diagnostic printed to the operator.
#[derive(Error, Debug)]
pub enum KubectlCurlError {
    #[error("malformed URL: {0}")]
    MalformedAddress(String),

    #[error("unsupported resource type: {0}")]
    UnsupportedWorkloadKind(String),

    #[error("{kind} {name} not found")]
    WorkloadNotFound { kind: WorkloadKind, name: String },

    #[error("no pods found for {kind} {name}")]
    NoPodsForWorkload { kind: WorkloadKind, name: String },

    #[error("pod {pod} not found in namespace {namespace}")]
    PodNotFound { pod: String, namespace: String },

    #[error("unable to forward port because pod {pod} is not running. Current status={phase}")]
    PodNotRunning { pod: String, phase: String },

    #[error("pod {pod} had no containers exposing a {port} port")]
    NoMatchingPort { pod: String, port: String },

    #[error(
        "pod {pod} has multiple containers with a {port} port, \
         use kubectl curl URL [container] to specify which one to use"
    )]
    AmbiguousPort { pod: String, port: String },

    #[error("port forwarding failed: {0}")]
    TunnelEstablish(String),

    #[error("curl exited with status {code}")]
    ExternalClient { code: i32 },

    #[error("{0}")]
    Argument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubectlCurlError {
    /// Whether this is a usage error that should be followed by the usage text
    pub fn is_usage(&self) -> bool {
        matches!(self, KubectlCurlError::Argument(_))
    }
}

pub type Result<T> = std::result::Result<T, KubectlCurlError>;
