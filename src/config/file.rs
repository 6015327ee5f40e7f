//! Config file handling

use std::path::{Path, PathBuf};

use crate::errors::KubectlCurlError;
use crate::k8s::PortRange;

/// Overrides the directory holding `config.toml`
pub const CONFIG_DIR_ENV: &str = "KUBECTL_CURL_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// kubectl-curl configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    /// Flags inserted ahead of the command line
    pub default_options: Vec<String>,
    /// curl program to run instead of `curl` from `PATH`
    pub curl_program: Option<PathBuf>,
    pub local_port_range: Option<PortRange>,
    /// Look bare names up in the cluster while resolving
    pub probe_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::empty(Self::default_config_dir())
    }
}

impl Config {
    fn empty(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            default_options: Vec::new(),
            curl_program: None,
            local_port_range: None,
            probe_names: true,
        }
    }

    /// Load configuration from the config file (TOML format)
    pub fn load() -> Result<Self, KubectlCurlError> {
        Self::load_from(Self::default_config_dir())
    }

    /// Load `config.toml` from `config_dir`; a missing file yields defaults
    pub fn load_from(config_dir: impl Into<PathBuf>) -> Result<Self, KubectlCurlError> {
        let config_dir = config_dir.into();
        let config_file = config_dir.join(CONFIG_FILE);

        if !config_file.exists() {
            return Ok(Self::empty(config_dir));
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| KubectlCurlError::Config(format!("Failed to read config: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&content)
            .map_err(|e| KubectlCurlError::Config(format!("Invalid config TOML: {}", e)))?;

        let defaults = toml_value.get("defaults");

        let default_options = defaults
            .and_then(|d| d.get("options"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let curl_program = defaults
            .and_then(|d| d.get("curl"))
            .and_then(|v| v.as_str())
            .map(|p| Self::resolve_path(&config_dir, p));

        let local_port_range = match defaults.and_then(|d| d.get("local_port_range")) {
            Some(value) => Some(Self::parse_port_range(value)?),
            None => None,
        };

        let probe_names = defaults
            .and_then(|d| d.get("probe_names"))
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        Ok(Self {
            config_dir,
            default_options,
            curl_program,
            local_port_range,
            probe_names,
        })
    }

    /// `[start, end]` with both ends valid port numbers
    fn parse_port_range(value: &toml::Value) -> Result<PortRange, KubectlCurlError> {
        let invalid = || {
            KubectlCurlError::Config(format!(
                "local_port_range must be a [start, end] pair of ports, got {}",
                value
            ))
        };

        let bounds = value.as_array().ok_or_else(invalid)?;
        let [start, end] = bounds.as_slice() else {
            return Err(invalid());
        };
        let port = |v: &toml::Value| {
            v.as_integer()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(invalid)
        };

        PortRange::new(port(start)?, port(end)?)
    }

    /// Relative program paths containing a separator are taken from the config dir
    fn resolve_path(config_dir: &Path, program: &str) -> PathBuf {
        let path = PathBuf::from(program);
        if path.is_absolute() || path.components().count() == 1 {
            path
        } else {
            config_dir.join(path)
        }
    }

    /// Get the default config directory
    fn default_config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("kubectl-curl"))
            .unwrap_or_else(|| PathBuf::from(".kubectl-curl"))
    }
}
