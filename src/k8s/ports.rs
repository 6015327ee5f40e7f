//! Container port selection
//!
//! A numeric port is forwarded as-is. A symbolic port name (or the scheme,
//! when no port was given) must match exactly one TCP port across the pod's
//! containers, optionally restricted to one container.

use crate::errors::{KubectlCurlError, Result};
use crate::k8s::cluster::PodInfo;

/// The port the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortRequest {
    Number(u16),
    Name(String),
}

impl PortRequest {
    /// Interpret the requested port token
    ///
    /// An empty token, or `0`, means "the port named after the scheme".
    /// A base-10 integer outside `1..=65535` is a malformed address.
    pub fn from_requested(requested: &str, scheme: &str) -> Result<Self> {
        if requested.is_empty() {
            return Ok(PortRequest::Name(scheme.to_string()));
        }

        match requested.parse::<i64>() {
            Ok(0) => Ok(PortRequest::Name(scheme.to_string())),
            Ok(n) => u16::try_from(n).map(PortRequest::Number).map_err(|_| {
                KubectlCurlError::MalformedAddress(format!("port {} out of range", requested))
            }),
            Err(_) => Ok(PortRequest::Name(requested.to_string())),
        }
    }
}

/// The container port chosen for a symbolic request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPortMatch {
    pub container: String,
    pub container_port: u16,
    pub protocol: String,
}

/// Find the single TCP container port named `port_name`
pub fn select_container_port(
    pod: &PodInfo,
    container: Option<&str>,
    port_name: &str,
) -> Result<ContainerPortMatch> {
    let mut candidates = pod
        .containers
        .iter()
        .filter(|c| container.is_none_or(|name| c.name == name))
        .flat_map(|c| {
            c.ports
                .iter()
                .filter(move |p| p.name.as_deref() == Some(port_name) && p.protocol == "TCP")
                .map(move |p| (c, p))
        });

    let (c, p) = match (candidates.next(), candidates.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(KubectlCurlError::NoMatchingPort {
                pod: pod.name.clone(),
                port: port_name.to_string(),
            })
        }
        (Some(_), Some(_)) => {
            return Err(KubectlCurlError::AmbiguousPort {
                pod: pod.name.clone(),
                port: port_name.to_string(),
            })
        }
    };

    let container_port = u16::try_from(p.container_port).map_err(|_| {
        KubectlCurlError::NoMatchingPort {
            pod: pod.name.clone(),
            port: port_name.to_string(),
        }
    })?;

    Ok(ContainerPortMatch {
        container: c.name.clone(),
        container_port,
        protocol: p.protocol.clone(),
    })
}

/// Resolve a port request to the remote port to forward to
///
/// Numeric ports skip the container lookup entirely.
pub fn resolve_remote_port(
    pod: &PodInfo,
    container: Option<&str>,
    request: &PortRequest,
) -> Result<u16> {
    match request {
        PortRequest::Number(port) => Ok(*port),
        PortRequest::Name(name) => {
            select_container_port(pod, container, name).map(|m| m.container_port)
        }
    }
}
