//! Interrupt/signal handling for graceful shutdown
//!
//! Ctrl+C cancels a single process-wide [`CancellationToken`]. The token is
//! created in `main` and handed down explicitly; the tunnel and the curl
//! invocation both race against it. The interrupted flag is only read by
//! `main` to pick the exit status.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::status::ExitStatus;

/// Global flag for Ctrl+C interrupt handling
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Check if the application was interrupted (Ctrl+C pressed)
#[inline]
pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Set the interrupted flag (called from signal handler)
#[inline]
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Install the Ctrl+C handler
///
/// The first interrupt cancels `cancel` so the tunnel is torn down and curl is
/// stopped; destructors still run. A second interrupt exits immediately.
pub fn install_interrupt_handler(cancel: CancellationToken) -> Result<(), ctrlc::Error> {
    static SECOND_CTRL_C: AtomicBool = AtomicBool::new(false);

    ctrlc::set_handler(move || {
        set_interrupted();
        cancel.cancel();

        if SECOND_CTRL_C.swap(true, Ordering::SeqCst) {
            std::process::exit(i32::from(ExitStatus::Interrupted.code()));
        }
    })
}
