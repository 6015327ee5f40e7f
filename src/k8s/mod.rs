//! Kubernetes integration module
//!
//! Resolves a compact address to a pod port and tunnels to it.
//!
//! # Address Format
//! ```text
//! [scheme://]name[:port][/path]
//! [scheme://]kind/name[:port][/path]
//! ```
//!
//! # Examples
//! ```text
//! mypod:8080/health
//! deploy/api/v2/users
//! https://sts/db-0:metrics/stats
//! ```

pub mod cluster;
pub mod kinds;
pub mod lookup;
pub mod parser;
pub mod portforward;
pub mod ports;
pub mod resolver;

pub use cluster::{ClusterApi, ContainerInfo, ContainerPortInfo, KubeCluster, PodInfo};
pub use kinds::{KindAliasTable, WorkloadKind};
pub use lookup::{pods_for_workload, resolve_pod, WorkloadPods};
pub use parser::{parse_address, redact_credentials, ParsedAddress};
pub use portforward::{
    ForwardTarget, KubeTransport, PortRange, Readiness, TunnelSession, TunnelState,
    TunnelTransport,
};
pub use ports::{resolve_remote_port, select_container_port, ContainerPortMatch, PortRequest};
pub use resolver::{
    NameProbe, NoProbe, ProbeKind, ResolvedTarget, TargetRef, TargetResolver, BARE_NAME_PRIORITY,
};
