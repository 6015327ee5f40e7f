//! kubectl-curl library interface
//!
//! A `kubectl` plugin that runs curl against a pod, deployment, statefulset
//! or daemonset through an ephemeral port-forward.
//!
//! # Module Organization
//!
//! - [`k8s`] - Address resolution, pod lookup and the tunnel session
//! - [`curl`] - Pass-through option table and the curl child process
//! - [`cli`] - Command-line surface
//! - [`config`] - Config file and per-invocation settings
//! - [`core`] - Main execution logic
//! - [`signals`] - Interrupt handling (was_interrupted, set_interrupted)
//! - [`errors`] - Error types (KubectlCurlError, Result)
//! - [`status`] - Exit status codes (ExitStatus)

pub mod cli;
pub mod config;
pub mod core;
pub mod curl;
pub mod errors;
pub mod k8s;
pub mod logging;
pub mod signals;
pub mod status;
