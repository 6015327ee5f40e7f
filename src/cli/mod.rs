//! CLI argument parsing and processing

pub mod args;
pub mod passthrough;

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches};

// Re-exports
pub use args::{Args, LogFormat};
pub use passthrough::PassThrough;

/// Usage line shown after argument errors
pub const USAGE: &str = "kubectl curl [options] URL [container]";

/// Everything given on the command line
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Args,
    /// curl argv in command-line order, without the URL
    pub curl_args: Vec<String>,
    /// A pass-through `-v/--verbose` was given
    pub verbose: bool,
}

/// The full clap command: kubectl flags plus every curl option
pub fn command() -> clap::Command {
    passthrough::augment(Args::command())
}

/// Parse `argv` (program name first)
pub fn try_parse_from<I, T>(argv: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command();
    let matches = cmd.try_get_matches_from_mut(argv)?;
    let args = Args::from_arg_matches(&matches)?;
    let PassThrough { args: curl_args, verbose } = passthrough::collect(&matches)
        .map_err(|e| cmd.error(ErrorKind::InvalidValue, e.to_string()))?;

    Ok(Invocation {
        args,
        curl_args,
        verbose,
    })
}
