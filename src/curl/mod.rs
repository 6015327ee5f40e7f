//! The curl side: pass-through options and the child process

pub mod command;
pub mod options;

pub use command::{CurlInvocation, CurlOutcome, SILENT_FLAG};
pub use options::{find_option, CurlOption, OptionKind, OptionValue, CURL_OPTIONS};
