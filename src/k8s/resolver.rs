//! Target resolution
//!
//! Turns the host/path of a parsed address into a [`ResolvedTarget`]. Rules
//! are tried in order and the first match wins:
//!
//! 1. the host is a workload alias (`deploy`, `sts`, `ds`, ...) and the
//!    first path segment is `name[:port]`
//! 2. a `kind/name[:port]` token, which only reaches the resolver when the
//!    address had no host (`http:///deploy/api:8080/x`); `pod/name` is
//!    accepted here too
//! 3. an address with no host at all has its path token folded into rule 2,
//!    or into rule 4 when its first segment carries a port
//! 4. a bare `name[:port]`, disambiguated by [`NameProbe`] in the order of
//!    [`BARE_NAME_PRIORITY`], defaulting to a pod
//!
//! Resolution never talks to the cluster except through the probe, and an
//! unclaimed bare name is always handed on as a pod so the pod lookup gets
//! to report the authoritative not-found.

use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::errors::{KubectlCurlError, Result};
use crate::k8s::kinds::{KindAliasTable, WorkloadKind};
use crate::k8s::parser::ParsedAddress;

/// What the address points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// A pod by name. `bare` is set when the name came without a kind, in
    /// which case a missing pod may still be found as a workload.
    Pod { name: String, bare: bool },
    /// A workload whose pods are looked up through its label selector
    Workload { kind: WorkloadKind, name: String },
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Pod { name, .. } => write!(f, "pod/{}", name),
            TargetRef::Workload { kind, name } => write!(f, "{}/{}", kind, name),
        }
    }
}

/// Output of resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: TargetRef,
    /// Numeric port, symbolic port name, or empty to use the scheme
    pub requested_port: String,
    /// Path appended to the local URL, always starting with `/`
    pub remaining_path: String,
}

impl ResolvedTarget {
    pub fn is_workload(&self) -> bool {
        matches!(self.target, TargetRef::Workload { .. })
    }

    pub fn pod_name(&self) -> Option<&str> {
        match &self.target {
            TargetRef::Pod { name, .. } => Some(name),
            TargetRef::Workload { .. } => None,
        }
    }

    pub fn workload(&self) -> Option<(WorkloadKind, &str)> {
        match &self.target {
            TargetRef::Workload { kind, name } => Some((*kind, name)),
            TargetRef::Pod { .. } => None,
        }
    }
}

/// Kind of object a bare name is probed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Pod,
    Workload(WorkloadKind),
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Pod => f.write_str("pod"),
            ProbeKind::Workload(kind) => kind.fmt(f),
        }
    }
}

/// Order in which a bare name is probed; the first kind that exists wins
pub const BARE_NAME_PRIORITY: [ProbeKind; 4] = [
    ProbeKind::Pod,
    ProbeKind::Workload(WorkloadKind::Deployment),
    ProbeKind::Workload(WorkloadKind::StatefulSet),
    ProbeKind::Workload(WorkloadKind::DaemonSet),
];

/// Existence check used to disambiguate bare names
///
/// Implementations answer `false` on any error; resolution must not fail
/// because a probe could not reach the cluster.
pub trait NameProbe {
    fn exists(&self, kind: ProbeKind, name: &str) -> impl Future<Output = bool> + Send;
}

/// Probe that never claims a name, leaving every bare name a pod
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl NameProbe for NoProbe {
    async fn exists(&self, _kind: ProbeKind, _name: &str) -> bool {
        false
    }
}

/// Resolves parsed addresses against a kind alias table and a probe
pub struct TargetResolver<'a, P> {
    aliases: &'a KindAliasTable,
    probe: &'a P,
}

impl<'a, P: NameProbe> TargetResolver<'a, P> {
    pub fn new(aliases: &'a KindAliasTable, probe: &'a P) -> Self {
        Self { aliases, probe }
    }

    pub async fn resolve(&self, address: &ParsedAddress) -> Result<ResolvedTarget> {
        if address.host.is_empty() {
            let token = address.path.trim_start_matches('/');
            return match token.split_once('/') {
                Some((first, _)) if !first.contains(':') => self.resolve_kind_slash_name(token),
                Some((first, rest)) => self.resolve_bare(first, &format!("/{}", rest)).await,
                None => self.resolve_bare(token, "").await,
            };
        }

        if let Some(resolved) = self.resolve_kind_as_host(&address.host, &address.path)? {
            return Ok(resolved);
        }

        self.resolve_bare(&address.host, &address.path).await
    }

    fn resolve_kind_as_host(&self, host: &str, path: &str) -> Result<Option<ResolvedTarget>> {
        let (segment, rest) = split_first_segment(path.trim_start_matches('/'));
        if segment.is_empty() {
            return Ok(None);
        }

        let Some(kind) = self.aliases.lookup(host) else {
            return Ok(None);
        };
        let (name, port) = split_name_port(segment);
        if name.is_empty() {
            return Err(KubectlCurlError::MalformedAddress(format!(
                "missing name after {}/",
                host
            )));
        }

        let resolved = ResolvedTarget {
            target: TargetRef::Workload {
                kind,
                name: name.to_string(),
            },
            requested_port: port.to_string(),
            remaining_path: path_or_root(rest),
        };
        debug!(
            resource = %resolved.target,
            port = %resolved.requested_port,
            path = %resolved.remaining_path,
            "resolved kind from host"
        );
        Ok(Some(resolved))
    }

    fn resolve_kind_slash_name(&self, token: &str) -> Result<ResolvedTarget> {
        let (kind_token, rest) = token.split_once('/').unwrap_or((token, ""));
        let (segment, tail) = split_first_segment(rest);
        let (name, port) = split_name_port(segment);

        let target = if let Some(kind) = self.aliases.lookup(kind_token) {
            TargetRef::Workload {
                kind,
                name: name.to_string(),
            }
        } else if self.aliases.is_pod_alias(kind_token) {
            TargetRef::Pod {
                name: name.to_string(),
                bare: false,
            }
        } else {
            return Err(KubectlCurlError::UnsupportedWorkloadKind(
                kind_token.to_string(),
            ));
        };
        if name.is_empty() {
            return Err(KubectlCurlError::MalformedAddress(format!(
                "missing name in {}",
                token
            )));
        }

        let resolved = ResolvedTarget {
            target,
            requested_port: port.to_string(),
            remaining_path: path_or_root(tail),
        };
        debug!(
            resource = %resolved.target,
            port = %resolved.requested_port,
            path = %resolved.remaining_path,
            "resolved kind/name"
        );
        Ok(resolved)
    }

    async fn resolve_bare(&self, token: &str, path: &str) -> Result<ResolvedTarget> {
        let (name, port) = split_name_port(token);
        if name.is_empty() {
            return Err(KubectlCurlError::MalformedAddress(format!(
                "missing name in {}",
                token
            )));
        }

        let mut target = TargetRef::Pod {
            name: name.to_string(),
            bare: true,
        };
        for kind in BARE_NAME_PRIORITY {
            if self.probe.exists(kind, name).await {
                debug!(%kind, name, "bare name claimed");
                if let ProbeKind::Workload(kind) = kind {
                    target = TargetRef::Workload {
                        kind,
                        name: name.to_string(),
                    };
                }
                break;
            }
        }

        let remaining_path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        let resolved = ResolvedTarget {
            target,
            requested_port: port.to_string(),
            remaining_path,
        };
        debug!(
            resource = %resolved.target,
            port = %resolved.requested_port,
            path = %resolved.remaining_path,
            "resolved bare name"
        );
        Ok(resolved)
    }
}

/// Split `name[:port]` on the last colon
fn split_name_port(segment: &str) -> (&str, &str) {
    segment.rsplit_once(':').unwrap_or((segment, ""))
}

/// Split `a/b/c` into `a` and `b/c`
fn split_first_segment(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    }
}

fn path_or_root(rest: Option<&str>) -> String {
    match rest {
        Some(rest) => format!("/{}", rest),
        None => "/".to_string(),
    }
}
