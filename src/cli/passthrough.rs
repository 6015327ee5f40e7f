//! curl pass-through options
//!
//! Each entry of the curl option table becomes a clap argument. Values are
//! validated by [`OptionValue::parse`] and rendered back in command-line
//! order under curl's own option names.

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::curl::{CurlOption, OptionValue, CURL_OPTIONS};
use crate::errors::{KubectlCurlError, Result};

/// Options handled elsewhere and never forwarded as given
const NOT_FORWARDED: &[&str] = &["silent"];

/// curl arguments collected from the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassThrough {
    /// argv for curl, without the URL
    pub args: Vec<String>,
    /// `-v/--verbose` was given
    pub verbose: bool,
}

fn curl_arg(option: &'static CurlOption) -> Arg {
    let mut arg = Arg::new(option.name)
        .long(option.flag())
        .help(option.help)
        .action(ArgAction::Append);

    if let Some(short) = option.flag_short() {
        arg = arg.short(short);
    }

    if option.is_bool() {
        arg.num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_name(option.kind.value_name())
    } else {
        arg.num_args(1)
            .allow_hyphen_values(true)
            .value_name(option.kind.value_name())
    }
}

/// Add every curl option to `cmd`
pub fn augment(cmd: Command) -> Command {
    cmd.next_help_heading("Curl Options")
        .args(CURL_OPTIONS.iter().map(curl_arg))
}

/// Collect the curl options in the order they were given
pub fn collect(matches: &ArgMatches) -> Result<PassThrough> {
    let mut given: Vec<(usize, &'static CurlOption, OptionValue)> = Vec::new();

    for option in CURL_OPTIONS {
        let (indices, values) = match (
            matches.indices_of(option.name),
            matches.get_raw(option.name),
        ) {
            (Some(indices), Some(values)) => (indices, values),
            _ => continue,
        };

        for (index, raw) in indices.zip(values) {
            let raw = raw.to_str().ok_or_else(|| {
                KubectlCurlError::Argument(format!(
                    "value for --{} is not valid UTF-8",
                    option.flag()
                ))
            })?;
            given.push((index, option, OptionValue::parse(option, raw)?));
        }
    }

    given.sort_by_key(|(index, _, _)| *index);

    let mut passthrough = PassThrough::default();
    for (_, option, value) in given {
        if option.name == "verbose" && value == OptionValue::Bool(true) {
            passthrough.verbose = true;
        }
        if NOT_FORWARDED.contains(&option.name) {
            continue;
        }
        value.render(option, &mut passthrough.args);
    }

    Ok(passthrough)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<PassThrough> {
        let matches = augment(Command::new("test"))
            .try_get_matches_from(argv)
            .map_err(|e| KubectlCurlError::Argument(e.to_string()))?;
        collect(&matches)
    }

    #[test]
    fn test_order_is_preserved() {
        let pt = parse(&["test", "-H", "A: 1", "--location", "--header", "B: 2", "-X", "POST"]).unwrap();
        assert_eq!(
            pt.args,
            vec!["--header", "A: 1", "--location", "--header", "B: 2", "--request", "POST"]
        );
        assert!(!pt.verbose);
    }

    #[test]
    fn test_userinfo_renders_as_user() {
        let pt = parse(&["test", "--userinfo", "admin:pw"]).unwrap();
        assert_eq!(pt.args, vec!["--user", "admin:pw"]);
    }

    #[test]
    fn test_silent_is_dropped() {
        let pt = parse(&["test", "--silent", "-k"]).unwrap();
        assert_eq!(pt.args, vec!["--insecure"]);
    }

    #[test]
    fn test_bool_values() {
        let pt = parse(&["test", "--insecure=false", "--compressed=true", "-v"]).unwrap();
        assert_eq!(pt.args, vec!["--compressed", "--verbose"]);
        assert!(pt.verbose);

        let err = parse(&["test", "--insecure=sometimes"]).unwrap_err();
        assert!(matches!(err, KubectlCurlError::Argument(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["test", "--max-time", "soon"]).is_err());
        assert!(parse(&["test", "--max-redirs", "1.5"]).is_err());
        assert_eq!(
            parse(&["test", "-m", "1.5"]).unwrap().args,
            vec!["--max-time", "1.5"]
        );
    }

    #[test]
    fn test_reserved_shorts_are_not_registered() {
        assert!(parse(&["test", "-s"]).is_err());
        assert!(parse(&["test", "-n"]).is_err());
    }

    #[test]
    fn test_hyphen_values() {
        let pt = parse(&["test", "-d", "-", "-o", "-"]).unwrap();
        assert_eq!(pt.args, vec!["--data", "-", "--output", "-"]);
    }
}
