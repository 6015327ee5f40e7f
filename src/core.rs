//! Main execution logic
//!
//! [`run`] is the boundary: it loads the config file, parses the command line
//! and builds [`Settings`] once. Everything after that takes the settings and
//! the cancellation token explicitly.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli;
use crate::config::{Config, Settings};
use crate::curl::{CurlInvocation, CurlOutcome};
use crate::errors::{KubectlCurlError, Result};
use crate::k8s::{
    parse_address, redact_credentials, resolve_pod, resolve_remote_port, ClusterApi,
    ForwardTarget, KindAliasTable, KubeCluster, KubeTransport, NameProbe, NoProbe,
    ParsedAddress, PodInfo, PortRequest, Readiness, ResolvedTarget, TargetResolver,
    TunnelSession, TunnelTransport,
};
use crate::logging;
use crate::status::ExitStatus;

/// Run one invocation with the full argv (program name first)
pub fn run(args: Vec<String>, cancel: CancellationToken) -> ExitStatus {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}", e);
            Config::default()
        }
    };

    let merged_args = merge_default_options(args, &config);

    let invocation = match cli::try_parse_from(&merged_args) {
        Ok(invocation) => invocation,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    let settings = match Settings::from_invocation(invocation, &config) {
        Ok(settings) => settings,
        Err(e) => return handle_error(e, false),
    };

    logging::init(settings.debug, settings.verbose, settings.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return handle_error(e.into(), settings.debug),
    };

    let debug = settings.debug;
    match runtime.block_on(program(settings, cancel)) {
        Ok(status) => status,
        Err(e) => handle_error(e, debug),
    }
}

/// Connect to the cluster and run the invocation
pub async fn program(settings: Settings, cancel: CancellationToken) -> Result<ExitStatus> {
    let address = parse_address(&settings.address)?;

    let cluster = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(ExitStatus::Interrupted),
        cluster = KubeCluster::connect(&settings) => cluster?,
    };
    let transport = Arc::new(KubeTransport::new(cluster.client().clone()));

    if settings.probe_names {
        execute(&settings, &cluster, &cluster, transport, &address, &cancel).await
    } else {
        execute(&settings, &cluster, &NoProbe, transport, &address, &cancel).await
    }
}

/// A ready tunnel and the URL that reaches the target through it
pub struct OpenTunnel {
    pub session: TunnelSession,
    pub url: String,
    pub pod: PodInfo,
    pub remote_port: u16,
}

/// Resolve the address, open a tunnel to it and run curl through it
///
/// The tunnel is closed before returning, whatever curl did.
pub async fn execute<C, P, T>(
    settings: &Settings,
    cluster: &C,
    probe: &P,
    transport: Arc<T>,
    address: &ParsedAddress,
    cancel: &CancellationToken,
) -> Result<ExitStatus>
where
    C: ClusterApi,
    P: NameProbe,
    T: TunnelTransport,
{
    let Some(mut tunnel) = open_tunnel(settings, cluster, probe, transport, address, cancel).await?
    else {
        return Ok(ExitStatus::Interrupted);
    };

    let curl = CurlInvocation::new(
        settings.curl_program.clone(),
        settings.curl_args.clone(),
        tunnel.url.clone(),
    );
    let outcome = curl.run(cancel).await;
    tunnel.session.close().await;

    match outcome? {
        CurlOutcome::Completed => Ok(ExitStatus::Success),
        CurlOutcome::Interrupted => Ok(ExitStatus::Interrupted),
    }
}

/// Resolve the address and bring a tunnel to `Ready`
///
/// `None` when `cancel` fired first; no port is left bound in that case.
pub async fn open_tunnel<C, P, T>(
    settings: &Settings,
    cluster: &C,
    probe: &P,
    transport: Arc<T>,
    address: &ParsedAddress,
    cancel: &CancellationToken,
) -> Result<Option<OpenTunnel>>
where
    C: ClusterApi,
    P: NameProbe,
    T: TunnelTransport,
{
    let (resolved, pod, remote_port) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        located = locate(settings, cluster, probe, address) => located?,
    };

    let mut session = TunnelSession::allocate(settings.local_ports, cancel);
    debug!(
        "forwarding local port {} to port {} of pod/{}",
        session.local_port(),
        remote_port,
        pod.name
    );

    let namespace = if pod.namespace.is_empty() {
        cluster.namespace().to_string()
    } else {
        pod.namespace.clone()
    };
    session.start(
        transport,
        ForwardTarget {
            namespace,
            pod: pod.name.clone(),
            port: remote_port,
        },
    )?;

    match session.wait_ready(cancel).await {
        Ok(Readiness::Ready) => {}
        Ok(Readiness::Cancelled) => {
            session.close().await;
            return Ok(None);
        }
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    }

    let url = address.rewrite_url(session.local_port(), &resolved.remaining_path);
    debug!("curl target {}", redact_credentials(&url));

    Ok(Some(OpenTunnel {
        session,
        url,
        pod,
        remote_port,
    }))
}

/// Address to running pod and remote port
async fn locate<C, P>(
    settings: &Settings,
    cluster: &C,
    probe: &P,
    address: &ParsedAddress,
) -> Result<(ResolvedTarget, PodInfo, u16)>
where
    C: ClusterApi,
    P: NameProbe,
{
    let resolver = TargetResolver::new(KindAliasTable::standard(), probe);
    let resolved = resolver.resolve(address).await?;
    info!("Resolved {} on port {:?}", resolved.target, resolved.requested_port);

    let pod = resolve_pod(cluster, &resolved.target).await?;
    pod.ensure_running()?;

    let request = PortRequest::from_requested(&resolved.requested_port, &address.scheme)?;
    let remote_port = resolve_remote_port(&pod, settings.container.as_deref(), &request)?;

    Ok((resolved, pod, remote_port))
}

/// Insert the config file's default flags right after the program name
fn merge_default_options(args: Vec<String>, config: &Config) -> Vec<String> {
    if config.default_options.is_empty() {
        return args;
    }

    let (flags, positional): (Vec<_>, Vec<_>) = config
        .default_options
        .iter()
        .partition(|opt| opt.starts_with('-'));

    if !positional.is_empty() {
        eprintln!(
            "\x1b[33mWarning: Positional arguments in default options are ignored: {:?}\x1b[0m",
            positional
        );
        eprintln!("Only flags (starting with -) can be used in default options.");
    }

    if flags.is_empty() {
        return args;
    }

    let mut merged = Vec::with_capacity(args.len() + flags.len());

    if let Some(program) = args.first() {
        merged.push(program.clone());
    }

    merged.extend(flags.into_iter().cloned());
    merged.extend(args.into_iter().skip(1));

    merged
}

/// Report an error and pick the exit status
///
/// curl's own failures are not reported again; its exit code is passed on.
fn handle_error(error: KubectlCurlError, debug: bool) -> ExitStatus {
    if let KubectlCurlError::ExternalClient { code } = error {
        return ExitStatus::from_code(Some(code));
    }

    if debug {
        eprintln!("* ERROR: {:?}", error);
    } else {
        eprintln!("* ERROR: {}", error);
    }

    if error.is_usage() {
        eprintln!("\nUsage:\n  {}", cli::USAGE);
    }

    ExitStatus::Error
}
