use kubectl_curl::status::ExitStatus;
use kubectl_curl::{core, signals};
use tokio_util::sync::CancellationToken;

/// Entry point - catches Ctrl+C and calls core::run()
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    let cancel = CancellationToken::new();

    // Cancels the tunnel and curl instead of exiting, so cleanup still runs
    if let Err(e) = signals::install_interrupt_handler(cancel.clone()) {
        eprintln!("Warning: Failed to install Ctrl+C handler: {}", e);
    }

    let args: Vec<String> = std::env::args().collect();
    let status = core::run(args, cancel);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }

    status
}
