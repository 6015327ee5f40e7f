//! Running curl against the tunnel

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{KubectlCurlError, Result};
use crate::k8s::redact_credentials;

/// Always appended: the progress meter is noise when curl is run through us
pub const SILENT_FLAG: &str = "--silent";

/// How a curl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurlOutcome {
    Completed,
    Interrupted,
}

/// One curl invocation
#[derive(Debug, Clone)]
pub struct CurlInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub url: String,
}

impl CurlInvocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, url: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            url: url.into(),
        }
    }

    /// Full argv after the program name
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.extend(self.args.iter().cloned());
        argv.push(self.url.clone());
        argv.push(SILENT_FLAG.to_string());
        argv
    }

    /// Shell-safe command line for logs, with URL credentials redacted
    pub fn pretty(&self) -> String {
        let mut parts = vec![shell_escape(&self.program.to_string_lossy())];
        parts.extend(self.args.iter().map(|a| shell_escape(a)));
        parts.push(shell_escape(&redact_credentials(&self.url)));
        parts.push(SILENT_FLAG.to_string());
        parts.join(" ")
    }

    /// Run curl with our stdio until it exits or `cancel` fires
    ///
    /// A non-zero exit is `ExternalClient` carrying curl's own code.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<CurlOutcome> {
        debug!("{}", self.pretty());

        let mut child = Command::new(&self.program)
            .args(self.argv())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                KubectlCurlError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", self.program.display(), e),
                ))
            })?;

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("interrupted, stopping curl");
                let _ = child.kill().await;
                return Ok(CurlOutcome::Interrupted);
            }
            status = child.wait() => status?,
        };

        match status.code() {
            Some(0) => Ok(CurlOutcome::Completed),
            Some(code) => Err(KubectlCurlError::ExternalClient { code }),
            None => Err(KubectlCurlError::Io(std::io::Error::other(format!(
                "{} terminated by signal",
                self.program.display()
            )))),
        }
    }
}

/// Shell-escape a string for safe inclusion in a command
fn shell_escape(s: &str) -> String {
    let needs_escaping = s.chars().any(|c| {
        matches!(c, ' ' | '\'' | '"' | '\\' | '$' | '`' | '!' | '*' | '?' |
                    '[' | ']' | '{' | '}' | '(' | ')' | '<' | '>' | '|' |
                    '&' | ';' | '#' | '\n' | '\t')
    });

    if !needs_escaping && !s.is_empty() {
        return s.to_string();
    }

    format!("'{}'", s.replace('\'', "'\"'\"'"))
}
