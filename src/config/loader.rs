//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `backend.base_url`.
pub const ENV_BASE_URL: &str = "GRAFANA_BASE_URL";
/// Overrides `listener.bind_address`.
pub const ENV_BIND: &str = "PROXY_BIND";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file was found; defaults plus environment overrides.
    Defaults,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    load_file(path, env_lookup)
}

/// Load configuration from `path` when it exists, otherwise start from defaults.
/// Environment overrides apply in both cases, so `GRAFANA_BASE_URL` alone is enough.
///
/// Nothing is logged here since this runs before the subscriber is installed;
/// callers report the returned [`ConfigSource`].
pub fn load_or_default(path: Option<&Path>) -> Result<(ProxyConfig, ConfigSource), ConfigError> {
    load_or_default_with(path, env_lookup)
}

fn load_or_default_with<F>(
    path: Option<&Path>,
    lookup: F,
) -> Result<(ProxyConfig, ConfigSource), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(p) = path.filter(|p| p.exists()) {
        let config = load_file(p, lookup)?;
        return Ok((config, ConfigSource::File(p.to_path_buf())));
    }

    let mut config = ProxyConfig::default();
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, ConfigSource::Defaults))
}

fn load_file<F>(path: &Path, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config = parse_config(&content)?;
    apply_overrides(&mut config, lookup);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse TOML without validation.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Apply environment overrides. `lookup` is injected so tests need not touch the process env.
pub fn apply_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
        config.backend.base_url = base;
    }
    if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.trim().is_empty()) {
        config.listener.bind_address = bind;
    }
}
