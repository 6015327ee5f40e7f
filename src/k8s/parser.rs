//! Address parsing
//!
//! Splits the address given on the command line into its scheme, host and
//! path. Anything without a `://` is read as `http://<address>`, so
//! `mypod:8080/health` and `deploy/api` both work.
//!
//! The host is kept verbatim (including any `:port` suffix) because the port
//! may be a symbolic container port name, which a strict URL parser rejects.

use crate::errors::{KubectlCurlError, Result};

/// Scheme assumed when the address has none
pub const DEFAULT_SCHEME: &str = "http";

/// Parsed address components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Lowercased scheme (`http` unless given)
    pub scheme: String,
    /// `user[:password]` before an `@` in the authority
    pub userinfo: Option<String>,
    /// Host component, e.g. `mypod:8080` or `deployment`
    pub host: String,
    /// Path component, empty or starting with `/`
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    /// Fragment without the leading `#`
    pub fragment: Option<String>,
}

impl ParsedAddress {
    /// Build the address curl is pointed at once the tunnel is ready
    ///
    /// The scheme, credentials, query and fragment are carried over
    /// untouched; only the host is replaced with `localhost:<local_port>`.
    pub fn rewrite_url(&self, local_port: u16, path: &str) -> String {
        let mut url = format!("{}://", self.scheme);
        if let Some(ref userinfo) = self.userinfo {
            url.push_str(userinfo);
            url.push('@');
        }
        url.push_str("localhost:");
        url.push_str(&local_port.to_string());
        url.push_str(path);
        if let Some(ref query) = self.query {
            url.push('?');
            url.push_str(query);
        }
        if let Some(ref fragment) = self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

/// Parse a command-line address into components
///
/// # Examples
/// ```
/// use kubectl_curl::k8s::parse_address;
///
/// let addr = parse_address("deploy/api:8080/health?full=1").unwrap();
/// assert_eq!(addr.scheme, "http");
/// assert_eq!(addr.host, "deploy");
/// assert_eq!(addr.path, "/api:8080/health");
/// assert_eq!(addr.query.as_deref(), Some("full=1"));
/// ```
pub fn parse_address(address: &str) -> Result<ParsedAddress> {
    let address = address.trim();
    if address.is_empty() {
        return Err(KubectlCurlError::MalformedAddress(
            "empty address".to_string(),
        ));
    }

    if let Some(c) = address.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(KubectlCurlError::MalformedAddress(format!(
            "invalid character {:?} in {}",
            c, address
        )));
    }

    let (scheme, rest) = match address.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => (DEFAULT_SCHEME, address),
    };
    validate_scheme(scheme, address)?;

    let (rest, fragment) = split_suffix(rest, '#');
    let (rest, query) = split_suffix(rest, '?');

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let (userinfo, host) = match authority.rsplit_once('@') {
        Some((userinfo, host)) => (Some(userinfo.to_string()), host),
        None => (None, authority),
    };

    if host.is_empty() && path.trim_start_matches('/').is_empty() {
        return Err(KubectlCurlError::MalformedAddress(format!(
            "missing host in {}",
            address
        )));
    }

    Ok(ParsedAddress {
        scheme: scheme.to_ascii_lowercase(),
        userinfo,
        host: host.to_string(),
        path: path.to_string(),
        query,
        fragment,
    })
}

fn validate_scheme(scheme: &str, address: &str) -> Result<()> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(KubectlCurlError::MalformedAddress(format!(
            "invalid scheme {:?} in {}",
            scheme, address
        )))
    }
}

fn split_suffix(s: &str, separator: char) -> (&str, Option<String>) {
    match s.split_once(separator) {
        Some((head, tail)) => (head, Some(tail.to_string())),
        None => (s, None),
    }
}

/// Redact credentials from a URL for log output
pub fn redact_credentials(raw: &str) -> String {
    if let Ok(mut url) = url::Url::parse(raw) {
        if !url.username().is_empty() || url.password().is_some() {
            let _ = url.set_username("[REDACTED]");
            let _ = url.set_password(None);
            return url.to_string();
        }
    }
    raw.to_string()
}
