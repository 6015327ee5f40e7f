//! Pod lookup
//!
//! Finds the concrete pod behind a resolved target. Workloads are followed
//! through their label selector; a bare pod name that does not exist is
//! retried as each workload kind in turn before giving up with the pod's
//! own not-found error.

use tracing::{debug, info};

use crate::errors::{KubectlCurlError, Result};
use crate::k8s::cluster::{ClusterApi, PodInfo};
use crate::k8s::kinds::WorkloadKind;
use crate::k8s::resolver::TargetRef;

/// Pods currently backing a workload, in listing order
#[derive(Debug, Clone)]
pub struct WorkloadPods {
    pub kind: WorkloadKind,
    pub name: String,
    pub pods: Vec<PodInfo>,
}

impl WorkloadPods {
    /// The pod traffic is sent to: the first one the listing returned
    pub fn primary(&self) -> Option<&PodInfo> {
        self.pods.first()
    }

    pub fn into_primary(self) -> Option<PodInfo> {
        self.pods.into_iter().next()
    }
}

/// List the pods selected by a workload
pub async fn pods_for_workload<C: ClusterApi>(
    cluster: &C,
    kind: WorkloadKind,
    name: &str,
) -> Result<WorkloadPods> {
    let selector = cluster.get_workload_selector(kind, name).await?;
    let pods = cluster.list_pods(&selector).await?;
    if pods.is_empty() {
        return Err(KubectlCurlError::NoPodsForWorkload {
            kind,
            name: name.to_string(),
        });
    }

    Ok(WorkloadPods {
        kind,
        name: name.to_string(),
        pods,
    })
}

/// Find the pod a target refers to
///
/// The phase is not checked here; see [`PodInfo::ensure_running`].
pub async fn resolve_pod<C: ClusterApi>(cluster: &C, target: &TargetRef) -> Result<PodInfo> {
    match target {
        TargetRef::Workload { kind, name } => {
            let workload = pods_for_workload(cluster, *kind, name).await?;
            info!(
                "Found {} pods, using pod/{}",
                workload.pods.len(),
                workload.primary().map(|p| p.name.as_str()).unwrap_or_default()
            );
            primary_pod(workload)
        }
        TargetRef::Pod { name, bare } => match cluster.get_pod(name).await {
            Err(err @ KubectlCurlError::PodNotFound { .. }) if *bare => {
                debug!(pod = %name, "pod not found, trying workloads with the same name");
                fallback_to_workloads(cluster, name).await?.ok_or(err)
            }
            result => result,
        },
    }
}

/// Try `name` as each workload kind in order
///
/// Kinds that do not exist or select no pods are skipped. Any other error
/// ends the cascade.
async fn fallback_to_workloads<C: ClusterApi>(cluster: &C, name: &str) -> Result<Option<PodInfo>> {
    for kind in WorkloadKind::ALL {
        match pods_for_workload(cluster, kind, name).await {
            Ok(workload) => {
                info!(
                    "Resolved {}/{} to pod/{}",
                    kind,
                    name,
                    workload.primary().map(|p| p.name.as_str()).unwrap_or_default()
                );
                return primary_pod(workload).map(Some);
            }
            Err(KubectlCurlError::WorkloadNotFound { .. })
            | Err(KubectlCurlError::NoPodsForWorkload { .. }) => {
                debug!(%kind, name, "no match");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

fn primary_pod(workload: WorkloadPods) -> Result<PodInfo> {
    let kind = workload.kind;
    let name = workload.name.clone();
    workload
        .into_primary()
        .ok_or(KubectlCurlError::NoPodsForWorkload { kind, name })
}
