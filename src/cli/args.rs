//! CLI argument definitions using clap
//!
//! This module defines the kubectl-style arguments of kubectl-curl. The curl
//! pass-through options are added to the command at runtime, see
//! [`crate::cli::passthrough`].

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Run curl against kubernetes pods
#[derive(Parser, Debug, Clone)]
#[command(name = "kubectl curl", bin_name = "kubectl curl", version, about, long_about = None)]
#[command(override_usage = "kubectl curl [options] URL [container]")]
pub struct Args {
    // =========================================================================
    // POSITIONAL ARGUMENTS
    // =========================================================================

    /// Pod or workload to send the request to, and optionally the container
    /// whose port should be used: `name[:port][/path]`,
    /// `kind/name[:port][/path]` or a full URL with either as its host
    #[arg(value_name = "URL [CONTAINER]")]
    pub targets: Vec<String>,

    // =========================================================================
    // KUBECTL OPTIONS
    // =========================================================================

    /// If present, the namespace scope for this CLI request
    #[arg(short = 'n', long = "namespace", value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// The name of the kubeconfig context to use
    #[arg(long = "context", value_name = "CONTEXT")]
    pub context: Option<String>,

    /// The name of the kubeconfig cluster to use
    #[arg(long = "cluster", value_name = "CLUSTER")]
    pub cluster: Option<String>,

    /// The name of the kubeconfig user to use
    #[arg(id = "kube_user", long = "user", value_name = "USER")]
    pub user: Option<String>,

    /// Path to the kubeconfig file to use for CLI requests
    #[arg(long = "kubeconfig", value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    // =========================================================================
    // PLUGIN OPTIONS
    // =========================================================================

    /// Enable debug mode to print more details about the kubectl command execution
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Format of the diagnostics written to stderr
    #[arg(long = "log-format", value_name = "FORMAT", value_enum, env = "KUBECTL_CURL_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Don't look names up in the cluster while resolving; a bare name is a pod
    #[arg(long = "no-probe", action = ArgAction::SetTrue)]
    pub no_probe: bool,
}

/// Log format for diagnostics
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON Lines format for parsing
    Json,
}
