//! Settings for one invocation

use std::path::PathBuf;

use crate::cli::{Invocation, LogFormat};
use crate::config::Config;
use crate::errors::{KubectlCurlError, Result};
use crate::k8s::PortRange;

/// Program run when neither the config file nor `PATH` lookup says otherwise
pub const DEFAULT_CURL_PROGRAM: &str = "curl";

/// Immutable settings, built once from the command line and the config file
#[derive(Debug, Clone)]
pub struct Settings {
    /// The address as given on the command line
    pub address: String,
    /// Restricts port selection to this container
    pub container: Option<String>,
    pub namespace: Option<String>,
    pub kube_context: Option<String>,
    pub kube_cluster: Option<String>,
    pub kube_user: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub curl_program: PathBuf,
    pub curl_args: Vec<String>,
    pub verbose: bool,
    pub local_ports: PortRange,
    pub probe_names: bool,
    pub debug: bool,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_invocation(invocation: Invocation, config: &Config) -> Result<Self> {
        let Invocation {
            args,
            curl_args,
            verbose,
        } = invocation;

        let mut targets = args.targets.into_iter();
        let (address, container) = match (targets.next(), targets.next(), targets.next()) {
            (None, _, _) => {
                return Err(KubectlCurlError::Argument(
                    "not enough arguments passed in the command line invocation of kubectl curl"
                        .to_string(),
                ))
            }
            (Some(address), container, None) => (address, container),
            (Some(_), _, Some(_)) => {
                return Err(KubectlCurlError::Argument(
                    "too many arguments passed in the command line invocation of kubectl curl"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            address,
            container,
            namespace: args.namespace,
            kube_context: args.context,
            kube_cluster: args.cluster,
            kube_user: args.user,
            kubeconfig: args.kubeconfig,
            curl_program: config
                .curl_program
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CURL_PROGRAM)),
            curl_args,
            verbose,
            local_ports: config.local_port_range.unwrap_or_default(),
            probe_names: config.probe_names && !args.no_probe,
            debug: args.debug,
            log_format: args.log_format.unwrap_or_default(),
        })
    }
}
