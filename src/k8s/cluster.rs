//! Cluster API boundary
//!
//! [`ClusterApi`] is the narrow read-only surface the lookup needs: get a
//! pod, get a workload's label selector, list pods by selector. Every call
//! is scoped to one namespace and is never retried. [`KubeCluster`] is the
//! kube-rs backed implementation.

use std::future::Future;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::config::Settings;
use crate::errors::{KubectlCurlError, Result};
use crate::k8s::kinds::WorkloadKind;
use crate::k8s::resolver::{NameProbe, ProbeKind};

/// Pod phase in which ports can be forwarded
pub const RUNNING_PHASE: &str = "Running";

/// A pod as seen by the lookup and the port selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub containers: Vec<ContainerInfo>,
}

impl PodInfo {
    pub fn is_running(&self) -> bool {
        self.phase == RUNNING_PHASE
    }

    /// Fail with `PodNotRunning` unless the pod is running
    pub fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(KubectlCurlError::PodNotRunning {
                pod: self.name.clone(),
                phase: self.phase.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub ports: Vec<ContainerPortInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPortInfo {
    pub name: Option<String>,
    pub container_port: i32,
    /// `TCP`, `UDP` or `SCTP`; the API defaults an absent protocol to `TCP`
    pub protocol: String,
}

impl From<&Pod> for PodInfo {
    fn from(pod: &Pod) -> Self {
        let containers = pod
            .spec
            .as_ref()
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|c| ContainerInfo {
                        name: c.name.clone(),
                        ports: c
                            .ports
                            .iter()
                            .flatten()
                            .map(|p| ContainerPortInfo {
                                name: p.name.clone(),
                                container_port: p.container_port,
                                protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
                            })
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        PodInfo {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            phase: pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            containers,
        }
    }
}

/// Read-only cluster calls used by the pod lookup
pub trait ClusterApi {
    /// Namespace every call is scoped to
    fn namespace(&self) -> &str;

    /// Get a pod by name; `PodNotFound` when it does not exist
    fn get_pod(&self, name: &str) -> impl Future<Output = Result<PodInfo>> + Send;

    /// Get a workload's pod selector in `kubectl` syntax
    ///
    /// `WorkloadNotFound` when the workload does not exist. A workload with
    /// an empty selector selects nothing and yields `NoPodsForWorkload`.
    fn get_workload_selector(
        &self,
        kind: WorkloadKind,
        name: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// List pods matching a label selector, in the order the API returns them
    fn list_pods(&self, selector: &str) -> impl Future<Output = Result<Vec<PodInfo>>> + Send;
}

/// Render a label selector the way `kubectl get -l` accepts it
///
/// Returns `None` for a selector with no requirements.
pub fn format_label_selector(selector: &LabelSelector) -> Option<String> {
    let mut requirements: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    for expr in selector.match_expressions.iter().flatten() {
        let mut values: Vec<&str> = expr.values.iter().flatten().map(String::as_str).collect();
        values.sort_unstable();
        let requirement = match expr.operator.as_str() {
            "In" => format!("{} in ({})", expr.key, values.join(",")),
            "NotIn" => format!("{} notin ({})", expr.key, values.join(",")),
            "Exists" => expr.key.clone(),
            "DoesNotExist" => format!("!{}", expr.key),
            other => {
                debug!(operator = other, key = %expr.key, "skipping unknown selector operator");
                continue;
            }
        };
        requirements.push(requirement);
    }

    if requirements.is_empty() {
        None
    } else {
        Some(requirements.join(","))
    }
}

/// Whether a kube error is the API's 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// kube-rs backed cluster access
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Build a client from kubeconfig, honoring the kubectl-style overrides
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let options = KubeConfigOptions {
            context: settings.kube_context.clone(),
            cluster: settings.kube_cluster.clone(),
            user: settings.kube_user.clone(),
        };

        let config = match settings.kubeconfig {
            Some(ref path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    KubectlCurlError::Config(format!("{}: {}", path.display(), e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await
            }
            None => Config::from_kubeconfig(&options).await,
        }
        .map_err(|e| KubectlCurlError::Config(format!("kubeconfig: {}", e)))?;

        let namespace = settings
            .namespace
            .clone()
            .unwrap_or_else(|| config.default_namespace.clone());
        let client = Client::try_from(config)?;

        debug!(namespace = %namespace, "connected to cluster");
        Ok(Self::new(client, namespace))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn selector_of(&self, kind: WorkloadKind, name: &str) -> kube::Result<LabelSelector> {
        let client = self.client.clone();
        let ns = &self.namespace;
        let selector = match kind {
            WorkloadKind::Deployment => Api::<Deployment>::namespaced(client, ns)
                .get(name)
                .await?
                .spec
                .map(|s| s.selector),
            WorkloadKind::StatefulSet => Api::<StatefulSet>::namespaced(client, ns)
                .get(name)
                .await?
                .spec
                .map(|s| s.selector),
            WorkloadKind::DaemonSet => Api::<DaemonSet>::namespaced(client, ns)
                .get(name)
                .await?
                .spec
                .map(|s| s.selector),
        };
        Ok(selector.unwrap_or_default())
    }
}

impl ClusterApi for KubeCluster {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_pod(&self, name: &str) -> Result<PodInfo> {
        debug!("kubectl get -n {} pod/{}", self.namespace, name);
        match self.pods().get(name).await {
            Ok(pod) => Ok(PodInfo::from(&pod)),
            Err(e) if is_not_found(&e) => Err(KubectlCurlError::PodNotFound {
                pod: name.to_string(),
                namespace: self.namespace.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_workload_selector(&self, kind: WorkloadKind, name: &str) -> Result<String> {
        debug!("kubectl get -n {} {}/{}", self.namespace, kind, name);
        let selector = match self.selector_of(kind, name).await {
            Ok(selector) => selector,
            Err(e) if is_not_found(&e) => {
                return Err(KubectlCurlError::WorkloadNotFound {
                    kind,
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        format_label_selector(&selector).ok_or_else(|| KubectlCurlError::NoPodsForWorkload {
            kind,
            name: name.to_string(),
        })
    }

    async fn list_pods(&self, selector: &str) -> Result<Vec<PodInfo>> {
        debug!("kubectl get -n {} pods -l {}", self.namespace, selector);
        let list = self
            .pods()
            .list(&ListParams::default().labels(selector))
            .await?;
        Ok(list.items.iter().map(PodInfo::from).collect())
    }
}

impl NameProbe for KubeCluster {
    async fn exists(&self, kind: ProbeKind, name: &str) -> bool {
        let found = match kind {
            ProbeKind::Pod => self.pods().get_opt(name).await.map(|p| p.is_some()),
            ProbeKind::Workload(kind) => match self.selector_of(kind, name).await {
                Ok(_) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(e),
            },
        };

        match found {
            Ok(found) => found,
            Err(e) => {
                debug!(%kind, name, error = %e, "probe failed, treating as absent");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format_match_labels_sorted() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("tier", "web"), ("app", "api")])),
            match_expressions: None,
        };
        assert_eq!(
            format_label_selector(&selector).as_deref(),
            Some("app=api,tier=web")
        );
    }

    #[test]
    fn test_format_match_expressions() {
        let requirement = |key: &str, operator: &str, values: Option<&[&str]>| {
            LabelSelectorRequirement {
                key: key.to_string(),
                operator: operator.to_string(),
                values: values.map(|v| v.iter().map(|s| s.to_string()).collect()),
            }
        };
        let selector = LabelSelector {
            match_labels: Some(labels(&[("app", "api")])),
            match_expressions: Some(vec![
                requirement("env", "In", Some(&["prod", "canary"])),
                requirement("zone", "NotIn", Some(&["b"])),
                requirement("managed", "Exists", None),
                requirement("legacy", "DoesNotExist", None),
            ]),
        };
        assert_eq!(
            format_label_selector(&selector).as_deref(),
            Some("app=api,env in (canary,prod),zone notin (b),managed,!legacy")
        );
    }

    #[test]
    fn test_empty_selector() {
        assert_eq!(format_label_selector(&LabelSelector::default()), None);
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::new()),
            match_expressions: Some(vec![]),
        };
        assert_eq!(format_label_selector(&selector), None);
    }

    #[test]
    fn test_pod_info_from_pod() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("prod".to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    ports: Some(vec![
                        ContainerPort {
                            name: Some("http".to_string()),
                            container_port: 8080,
                            ..Default::default()
                        },
                        ContainerPort {
                            name: Some("dns".to_string()),
                            container_port: 53,
                            protocol: Some("UDP".to_string()),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
        };

        let info = PodInfo::from(&pod);
        assert_eq!(info.name, "web-0");
        assert_eq!(info.namespace, "prod");
        assert!(info.is_running());
        assert_eq!(info.containers.len(), 1);
        assert_eq!(info.containers[0].ports[0].protocol, "TCP");
        assert_eq!(info.containers[0].ports[1].protocol, "UDP");
    }

    #[test]
    fn test_ensure_running() {
        let pod = PodInfo {
            name: "p".to_string(),
            namespace: "default".to_string(),
            phase: "Pending".to_string(),
            containers: vec![],
        };
        let err = pod.ensure_running().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to forward port because pod p is not running. Current status=Pending"
        );
    }
}
