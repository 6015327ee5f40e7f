//! curl options accepted on the kubectl-curl command line
//!
//! Every option carries an [`OptionKind`] that decides how its value is
//! validated and how it is rendered back into curl's argv.

use std::time::Duration;

use crate::errors::{KubectlCurlError, Result};

/// How an option's value is parsed and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Switch; `--name` alone when on
    Bool,
    /// Free-form text passed through verbatim
    Text,
    /// Base-10 integer
    Number,
    /// Non-negative seconds, fractions allowed
    Duration,
    /// Comma-separated list
    List,
}

impl OptionKind {
    /// Placeholder shown in `--help`
    pub fn value_name(&self) -> &'static str {
        match self {
            OptionKind::Bool => "BOOL",
            OptionKind::Text => "VALUE",
            OptionKind::Number => "NUM",
            OptionKind::Duration => "SECONDS",
            OptionKind::List => "LIST",
        }
    }
}

/// One curl option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlOption {
    /// curl's long name, without the leading `--`
    pub name: &'static str,
    /// curl's short name
    pub short: Option<char>,
    pub kind: OptionKind,
    pub help: &'static str,
}

/// curl options whose long name is taken by kubectl
const RENAMED: &[(&str, &str)] = &[("user", "userinfo")];

/// Short names kubectl already uses (`-n/--namespace`, `-s/--server`)
const RESERVED_SHORTS: &[char] = &['n', 's'];

impl CurlOption {
    /// Long name on the kubectl-curl command line
    pub fn flag(&self) -> &'static str {
        RENAMED
            .iter()
            .find(|(curl, _)| *curl == self.name)
            .map(|(_, flag)| *flag)
            .unwrap_or(self.name)
    }

    /// Short name on the kubectl-curl command line
    pub fn flag_short(&self) -> Option<char> {
        self.short.filter(|c| !RESERVED_SHORTS.contains(c))
    }

    pub fn is_bool(&self) -> bool {
        self.kind == OptionKind::Bool
    }
}

const fn opt(
    name: &'static str,
    short: Option<char>,
    kind: OptionKind,
    help: &'static str,
) -> CurlOption {
    CurlOption {
        name,
        short,
        kind,
        help,
    }
}

/// Supported curl options, sorted by name
#[rustfmt::skip]
pub const CURL_OPTIONS: &[CurlOption] = &[
    opt("abstract-unix-socket", None, OptionKind::Text, "Connect via abstract Unix domain socket"),
    opt("anyauth", None, OptionKind::Bool, "Pick any authentication method"),
    opt("basic", None, OptionKind::Bool, "Use HTTP Basic Authentication"),
    opt("cacert", None, OptionKind::Text, "CA certificate to verify peer against"),
    opt("capath", None, OptionKind::Text, "CA directory to verify peer against"),
    opt("cert", Some('E'), OptionKind::Text, "Client certificate file and password"),
    opt("cert-status", None, OptionKind::Bool, "Verify the status of the server certificate"),
    opt("cert-type", None, OptionKind::Text, "Certificate type (DER/PEM/ENG)"),
    opt("ciphers", None, OptionKind::Text, "SSL ciphers to use"),
    opt("compressed", None, OptionKind::Bool, "Request compressed response"),
    opt("connect-timeout", None, OptionKind::Duration, "Maximum time allowed for connection"),
    opt("connect-to", None, OptionKind::Text, "Connect to host"),
    opt("cookie", Some('b'), OptionKind::Text, "Send cookies from string/file"),
    opt("cookie-jar", Some('c'), OptionKind::Text, "Write cookies to file after operation"),
    opt("create-dirs", None, OptionKind::Bool, "Create necessary local directory hierarchy"),
    opt("crlfile", None, OptionKind::Text, "Get a CRL list in PEM format from the given file"),
    opt("data", Some('d'), OptionKind::Text, "HTTP POST data"),
    opt("data-ascii", None, OptionKind::Text, "HTTP POST ASCII data"),
    opt("data-binary", None, OptionKind::Text, "HTTP POST binary data"),
    opt("data-raw", None, OptionKind::Text, "HTTP POST data, '@' allowed"),
    opt("data-urlencode", None, OptionKind::Text, "HTTP POST data url encoded"),
    opt("digest", None, OptionKind::Bool, "Use HTTP Digest Authentication"),
    opt("disallow-username-in-url", None, OptionKind::Bool, "Disallow username in url"),
    opt("dns-servers", None, OptionKind::List, "DNS server addrs to use"),
    opt("doh-url", None, OptionKind::Text, "Resolve host names over DOH"),
    opt("dump-header", Some('D'), OptionKind::Text, "Write the received headers to a file"),
    opt("expect100-timeout", None, OptionKind::Duration, "How long to wait for 100-continue"),
    opt("fail", Some('f'), OptionKind::Bool, "Fail silently (no output at all) on HTTP errors"),
    opt("fail-early", None, OptionKind::Bool, "Fail on first transfer error, do not continue"),
    opt("form", Some('F'), OptionKind::Text, "Specify multipart MIME data"),
    opt("form-string", None, OptionKind::Text, "Specify multipart MIME data"),
    opt("get", Some('G'), OptionKind::Bool, "Put the post data in the URL and use GET"),
    opt("globoff", Some('g'), OptionKind::Bool, "Disable URL sequences and ranges using {} and []"),
    opt("happy-eyeballs-timeout-ms", None, OptionKind::Number, "How long to wait in milliseconds for IPv6 before trying IPv4"),
    opt("haproxy-protocol", None, OptionKind::Bool, "Send HAProxy PROXY protocol v1 header"),
    opt("head", Some('I'), OptionKind::Bool, "Show document info only"),
    opt("header", Some('H'), OptionKind::Text, "Pass custom header(s) to server"),
    opt("http0.9", None, OptionKind::Bool, "Allow HTTP 0.9 responses"),
    opt("http1.1", None, OptionKind::Bool, "Use HTTP 1.1"),
    opt("http2", None, OptionKind::Bool, "Use HTTP 2"),
    opt("http2-prior-knowledge", None, OptionKind::Bool, "Use HTTP 2 without HTTP/1.1 Upgrade"),
    opt("ignore-content-length", None, OptionKind::Bool, "Ignore the size of the remote resource"),
    opt("include", Some('i'), OptionKind::Bool, "Include protocol response headers in the output"),
    opt("insecure", Some('k'), OptionKind::Bool, "Allow insecure server connections when using SSL"),
    opt("interface", None, OptionKind::Text, "Use network INTERFACE (or address)"),
    opt("junk-session-cookies", Some('j'), OptionKind::Bool, "Ignore session cookies read from file"),
    opt("keepalive-time", None, OptionKind::Duration, "Interval time for keepalive probes"),
    opt("key", None, OptionKind::Text, "Private key file name"),
    opt("key-type", None, OptionKind::Text, "Private key file type (DER/PEM/ENG)"),
    opt("limit-rate", None, OptionKind::Text, "Limit transfer speed to RATE"),
    opt("local-port", None, OptionKind::Text, "Force use of RANGE for local port numbers"),
    opt("location", Some('L'), OptionKind::Bool, "Follow redirects"),
    opt("max-filesize", None, OptionKind::Text, "Maximum file size to download"),
    opt("max-redirs", None, OptionKind::Number, "Maximum number of redirects allowed"),
    opt("max-time", Some('m'), OptionKind::Duration, "Maximum time allowed for the transfer"),
    opt("negotiate", None, OptionKind::Bool, "Use HTTP Negotiate (SPNEGO) authentication"),
    opt("netrc", Some('n'), OptionKind::Bool, "Must read .netrc for user name and password"),
    opt("netrc-file", None, OptionKind::Text, "Specify FILE for netrc"),
    opt("netrc-optional", None, OptionKind::Bool, "Use either .netrc or URL"),
    opt("no-buffer", Some('N'), OptionKind::Bool, "Disable buffering of the output stream"),
    opt("no-keepalive", None, OptionKind::Bool, "Disable TCP keepalive on the connection"),
    opt("noproxy", None, OptionKind::List, "List of hosts which do not use proxy"),
    opt("ntlm", None, OptionKind::Bool, "Use HTTP NTLM authentication"),
    opt("oauth2-bearer", None, OptionKind::Text, "OAuth 2 Bearer Token"),
    opt("output", Some('o'), OptionKind::Text, "Write to file instead of stdout"),
    opt("pass", None, OptionKind::Text, "Pass phrase for the private key"),
    opt("path-as-is", None, OptionKind::Bool, "Do not squash .. sequences in URL path"),
    opt("pinnedpubkey", None, OptionKind::Text, "FILE/HASHES Public key to verify peer against"),
    opt("post301", None, OptionKind::Bool, "Do not switch to GET after following a 301"),
    opt("post302", None, OptionKind::Bool, "Do not switch to GET after following a 302"),
    opt("post303", None, OptionKind::Bool, "Do not switch to GET after following a 303"),
    opt("proto", None, OptionKind::List, "Enable/disable PROTOCOLS"),
    opt("proto-default", None, OptionKind::Text, "Use PROTOCOL for any URL missing a scheme"),
    opt("proto-redir", None, OptionKind::List, "Enable/disable PROTOCOLS on redirect"),
    opt("proxy", Some('x'), OptionKind::Text, "[protocol://]host[:port] Use this proxy"),
    opt("proxy-header", None, OptionKind::Text, "Pass custom header(s) to proxy"),
    opt("proxy-insecure", None, OptionKind::Bool, "Do HTTPS proxy connections without verifying the proxy"),
    opt("proxy-user", Some('U'), OptionKind::Text, "Proxy user and password"),
    opt("range", Some('r'), OptionKind::Text, "Retrieve only the bytes within RANGE"),
    opt("raw", None, OptionKind::Bool, "Do HTTP \"raw\"; no transfer decoding"),
    opt("referer", Some('e'), OptionKind::Text, "Referrer URL"),
    opt("remote-header-name", Some('J'), OptionKind::Bool, "Use the header-provided filename"),
    opt("remote-name", Some('O'), OptionKind::Bool, "Write output to a file named as the remote file"),
    opt("remote-time", Some('R'), OptionKind::Bool, "Set the remote file's time on the local output"),
    opt("request", Some('X'), OptionKind::Text, "Specify request command to use"),
    opt("resolve", None, OptionKind::Text, "Resolve the host+port to this address"),
    opt("retry", None, OptionKind::Number, "Retry request if transient problems occur"),
    opt("retry-connrefused", None, OptionKind::Bool, "Retry on connection refused (use with --retry)"),
    opt("retry-delay", None, OptionKind::Duration, "Wait time between retries"),
    opt("retry-max-time", None, OptionKind::Duration, "Retry only within this period"),
    opt("show-error", Some('S'), OptionKind::Bool, "Show error even when -s is used"),
    opt("silent", Some('s'), OptionKind::Bool, "Silent mode"),
    opt("speed-limit", Some('Y'), OptionKind::Number, "Stop transfers slower than this"),
    opt("speed-time", Some('y'), OptionKind::Duration, "Trigger 'speed-limit' abort after this time"),
    opt("ssl-no-revoke", None, OptionKind::Bool, "Disable cert revocation checks (Schannel)"),
    opt("tcp-fastopen", None, OptionKind::Bool, "Use TCP Fast Open"),
    opt("tcp-nodelay", None, OptionKind::Bool, "Use the TCP_NODELAY option"),
    opt("tls-max", None, OptionKind::Text, "Set maximum allowed TLS version"),
    opt("tls13-ciphers", None, OptionKind::Text, "TLS 1.3 cipher suites to use"),
    opt("tlsv1", None, OptionKind::Bool, "Use TLSv1.0 or greater"),
    opt("tlsv1.0", None, OptionKind::Bool, "Use TLSv1.0 or greater"),
    opt("tlsv1.1", None, OptionKind::Bool, "Use TLSv1.1 or greater"),
    opt("tlsv1.2", None, OptionKind::Bool, "Use TLSv1.2 or greater"),
    opt("tlsv1.3", None, OptionKind::Bool, "Use TLSv1.3 or greater"),
    opt("tr-encoding", None, OptionKind::Bool, "Request compressed transfer encoding"),
    opt("trace", None, OptionKind::Text, "Write a debug trace to FILE"),
    opt("trace-ascii", None, OptionKind::Text, "Like --trace, but without hex output"),
    opt("trace-time", None, OptionKind::Bool, "Add time stamps to trace/verbose output"),
    opt("unix-socket", None, OptionKind::Text, "Connect through this Unix domain socket"),
    opt("upload-file", Some('T'), OptionKind::Text, "Transfer local FILE to destination"),
    opt("user", Some('u'), OptionKind::Text, "Server user and password"),
    opt("user-agent", Some('A'), OptionKind::Text, "Send User-Agent <name> to server"),
    opt("verbose", Some('v'), OptionKind::Bool, "Make the operation more talkative"),
    opt("write-out", Some('w'), OptionKind::Text, "Use output FORMAT after completion"),
];

/// Find an option by curl's long name
pub fn find_option(name: &str) -> Option<&'static CurlOption> {
    CURL_OPTIONS
        .binary_search_by(|o| o.name.cmp(name))
        .ok()
        .map(|i| &CURL_OPTIONS[i])
}

/// A validated option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
    Number(i64),
    Duration(Duration),
    List(Vec<String>),
}

impl OptionValue {
    /// Parse `raw` as a value of the option's kind
    pub fn parse(option: &CurlOption, raw: &str) -> Result<Self> {
        let invalid = |expected: &str| {
            KubectlCurlError::Argument(format!(
                "invalid value {:?} for --{}: expected {}",
                raw,
                option.flag(),
                expected
            ))
        };

        match option.kind {
            OptionKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(OptionValue::Bool(true)),
                "false" | "0" | "no" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid("true or false")),
            },
            OptionKind::Text => Ok(OptionValue::Text(raw.to_string())),
            OptionKind::Number => raw
                .trim()
                .parse::<i64>()
                .map(OptionValue::Number)
                .map_err(|_| invalid("an integer")),
            OptionKind::Duration => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map(OptionValue::Duration)
                .ok_or_else(|| invalid("a non-negative number of seconds")),
            OptionKind::List => Ok(OptionValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }

    /// Value as curl expects it; `None` for switches
    pub fn format(&self) -> Option<String> {
        match self {
            OptionValue::Bool(_) => None,
            OptionValue::Text(s) => Some(s.clone()),
            OptionValue::Number(n) => Some(n.to_string()),
            OptionValue::Duration(d) => Some(d.as_secs_f64().to_string()),
            OptionValue::List(items) => Some(items.join(",")),
        }
    }

    /// Append this value to curl's argv under curl's own option name
    pub fn render(&self, option: &CurlOption, argv: &mut Vec<String>) {
        match self {
            OptionValue::Bool(false) => {}
            OptionValue::Bool(true) => argv.push(format!("--{}", option.name)),
            other => {
                argv.push(format!("--{}", option.name));
                if let Some(value) = other.format() {
                    argv.push(value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str) -> &'static CurlOption {
        find_option(name).unwrap()
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in CURL_OPTIONS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_no_duplicate_cli_shorts() {
        let mut shorts: Vec<char> = CURL_OPTIONS.iter().filter_map(|o| o.flag_short()).collect();
        let total = shorts.len();
        shorts.sort_unstable();
        shorts.dedup();
        assert_eq!(shorts.len(), total);
        assert!(!shorts.contains(&'h'));
        assert!(!shorts.contains(&'V'));
    }

    #[test]
    fn test_renames() {
        assert_eq!(option("user").flag(), "userinfo");
        assert!(CURL_OPTIONS.iter().all(|o| o.flag() != "user"));
        assert_eq!(option("netrc").flag_short(), None);
        assert_eq!(option("silent").flag_short(), None);
        assert_eq!(option("header").flag_short(), Some('H'));
    }

    #[test]
    fn test_parse_bool() {
        let o = option("insecure");
        for raw in ["true", "1", "yes", "TRUE"] {
            assert_eq!(OptionValue::parse(o, raw).unwrap(), OptionValue::Bool(true));
        }
        for raw in ["false", "0", "no"] {
            assert_eq!(OptionValue::parse(o, raw).unwrap(), OptionValue::Bool(false));
        }
        let err = OptionValue::parse(o, "maybe").unwrap_err();
        assert!(err.to_string().contains("--insecure"));
    }

    #[test]
    fn test_parse_number_and_duration() {
        assert_eq!(
            OptionValue::parse(option("max-redirs"), "5").unwrap(),
            OptionValue::Number(5)
        );
        assert!(OptionValue::parse(option("max-redirs"), "five").is_err());
        assert_eq!(
            OptionValue::parse(option("max-time"), "2.5").unwrap(),
            OptionValue::Duration(Duration::from_millis(2500))
        );
        assert!(OptionValue::parse(option("max-time"), "-1").is_err());
        assert!(OptionValue::parse(option("max-time"), "NaN").is_err());
    }

    #[test]
    fn test_render() {
        let mut argv = Vec::new();
        OptionValue::Bool(true).render(option("location"), &mut argv);
        OptionValue::Bool(false).render(option("insecure"), &mut argv);
        OptionValue::Text("Accept: */*".into()).render(option("header"), &mut argv);
        OptionValue::Text("admin:secret".into()).render(option("user"), &mut argv);
        OptionValue::Duration(Duration::from_secs(3)).render(option("max-time"), &mut argv);
        OptionValue::List(vec!["a".into(), "b".into()]).render(option("noproxy"), &mut argv);
        assert_eq!(
            argv,
            vec![
                "--location",
                "--header",
                "Accept: */*",
                "--user",
                "admin:secret",
                "--max-time",
                "3",
                "--noproxy",
                "a,b"
            ]
        );
    }

    #[test]
    fn test_list_parse_trims() {
        assert_eq!(
            OptionValue::parse(option("noproxy"), " a, b ,,c").unwrap(),
            OptionValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }
}
