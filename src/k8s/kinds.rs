//! Workload kinds and their kubectl-style aliases

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// A workload that manages pods through a label selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    /// Every supported kind, in the order a bare name falls back through them.
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
    ];

    /// Canonical lowercase name, as kubectl prints it
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const WORKLOAD_ALIASES: &[(&str, WorkloadKind)] = &[
    ("deployment", WorkloadKind::Deployment),
    ("deployments", WorkloadKind::Deployment),
    ("deploy", WorkloadKind::Deployment),
    ("statefulset", WorkloadKind::StatefulSet),
    ("statefulsets", WorkloadKind::StatefulSet),
    ("sts", WorkloadKind::StatefulSet),
    ("daemonset", WorkloadKind::DaemonSet),
    ("daemonsets", WorkloadKind::DaemonSet),
    ("ds", WorkloadKind::DaemonSet),
];

const POD_ALIASES: &[&str] = &["pod", "pods", "po"];

/// Lowercase alias -> canonical workload kind
///
/// Built once and only read afterwards.
#[derive(Debug, Clone)]
pub struct KindAliasTable {
    aliases: HashMap<&'static str, WorkloadKind>,
}

impl Default for KindAliasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl KindAliasTable {
    pub fn new() -> Self {
        Self {
            aliases: WORKLOAD_ALIASES.iter().copied().collect(),
        }
    }

    /// Shared instance
    pub fn standard() -> &'static KindAliasTable {
        static TABLE: OnceLock<KindAliasTable> = OnceLock::new();
        TABLE.get_or_init(KindAliasTable::new)
    }

    /// Look up a kind token, ignoring case
    pub fn lookup(&self, token: &str) -> Option<WorkloadKind> {
        self.aliases.get(token.to_ascii_lowercase().as_str()).copied()
    }

    /// Whether the token names pods themselves
    ///
    /// Only meaningful in a `pod/name` token; a host of `pod` is a pod name.
    pub fn is_pod_alias(&self, token: &str) -> bool {
        POD_ALIASES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(token))
    }
}
