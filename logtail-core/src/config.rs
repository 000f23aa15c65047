use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::host::{DEFAULT_HOST, Host};

/// Health polling configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HealthConfig {
    /// Time between probe cycles
    #[serde(default = "default_health_interval")]
    pub interval_ms: u64,
    /// Upper bound for a single `/alive` probe
    #[serde(default = "default_health_timeout")]
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_health_interval(),
            timeout_ms: default_health_timeout(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_health_interval() -> u64 {
    5000
}
fn default_health_timeout() -> u64 {
    2000
}

/// Stream session configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Upper bound for the pre-flight `/alive` check
    #[serde(default = "default_preflight_timeout")]
    pub preflight_timeout_ms: u64,
    /// Cap the log buffer at this many lines (oldest dropped first).
    /// Unbounded when absent.
    #[serde(default)]
    pub max_lines: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            preflight_timeout_ms: default_preflight_timeout(),
            max_lines: None,
        }
    }
}

impl StreamConfig {
    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_millis(self.preflight_timeout_ms)
    }
}

fn default_preflight_timeout() -> u64 {
    5000
}

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogtailConfig {
    /// Config file version
    #[serde(default = "default_version")]
    pub version: String,

    /// Host used when no host list and no override is given
    #[serde(default = "default_host")]
    pub default_host: String,

    /// Candidate backend hosts, in display order
    #[serde(default)]
    pub hosts: Vec<Host>,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    /// Log level used when neither RUST_LOG nor --debug is set
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_version() -> String {
    "1".into()
}
fn default_host() -> String {
    DEFAULT_HOST.into()
}

impl Default for LogtailConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_host: default_host(),
            hosts: Vec::new(),
            health: HealthConfig::default(),
            stream: StreamConfig::default(),
            log_level: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    DuplicateHost { name: String },
    MissingUrl { host: String },
    InvalidInterval { field: &'static str },
    NotFound { searched: Vec<PathBuf> },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML parse error: {}", e),
            Self::DuplicateHost { name } => write!(f, "host '{}' is defined more than once", name),
            Self::MissingUrl { host } => write!(f, "host '{}' has no url", host),
            Self::InvalidInterval { field } => write!(f, "{} must be greater than zero", field),
            Self::NotFound { searched } => {
                write!(f, "no config file found, searched: {:?}", searched)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl LogtailConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: LogtailConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config.normalized())
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let names = ["logtail.yaml", "logtail.yml", ".logtail.yaml", ".logtail.yml"];
        let mut searched = Vec::new();

        // Check environment variable first
        if let Ok(env_path) = std::env::var("LOGTAIL_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        // Search current directory and parents
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &names {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for host in &self.hosts {
            if !names.insert(host.name.as_str()) {
                return Err(ConfigError::DuplicateHost {
                    name: host.name.clone(),
                });
            }
            if host.url.trim().is_empty() {
                return Err(ConfigError::MissingUrl {
                    host: host.name.clone(),
                });
            }
        }

        if self.health.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "health.interval_ms",
            });
        }
        if self.health.timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "health.timeout_ms",
            });
        }
        if self.stream.preflight_timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "stream.preflight_timeout_ms",
            });
        }
        if self.stream.max_lines == Some(0) {
            return Err(ConfigError::InvalidInterval {
                field: "stream.max_lines",
            });
        }

        Ok(())
    }

    /// Coerce bare hostnames into scheme-qualified URLs
    fn normalized(mut self) -> Self {
        self.hosts = self
            .hosts
            .into_iter()
            .map(|h| Host::new(h.name, &h.url))
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
version: "1"
default_host: localhost:6000
hosts:
  - name: Localhost
    url: http://localhost:5005
  - name: Production Server
    url: prod.server.example.com:5005
health:
  interval_ms: 3000
stream:
  max_lines: 5000
log_level: debug
"#;
        let config = LogtailConfig::from_str(yaml).unwrap();
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.hosts[1].url, "http://prod.server.example.com:5005");
        assert_eq!(config.health.interval(), Duration::from_millis(3000));
        assert_eq!(config.health.timeout(), Duration::from_millis(2000));
        assert_eq!(config.stream.max_lines, Some(5000));
        assert_eq!(config.stream.preflight_timeout(), Duration::from_millis(5000));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LogtailConfig::from_str("{}").unwrap();
        assert!(config.hosts.is_empty());
        assert_eq!(config.default_host, DEFAULT_HOST);
        assert_eq!(config.health.interval_ms, 5000);
        assert!(config.stream.max_lines.is_none());
    }

    #[test]
    fn test_duplicate_host_rejected() {
        let yaml = r#"
hosts:
  - name: a
    url: http://a
  - name: a
    url: http://b
"#;
        let result = LogtailConfig::from_str(yaml);
        assert!(matches!(result, Err(ConfigError::DuplicateHost { .. })));
    }

    #[test]
    fn test_missing_url_rejected() {
        let yaml = r#"
hosts:
  - name: a
    url: "  "
"#;
        let result = LogtailConfig::from_str(yaml);
        assert!(matches!(result, Err(ConfigError::MissingUrl { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let yaml = r#"
health:
  interval_ms: 0
"#;
        let result = LogtailConfig::from_str(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval { field: "health.interval_ms" })
        ));
    }

    #[test]
    fn test_zero_preflight_timeout_rejected() {
        let yaml = r#"
stream:
  preflight_timeout_ms: 0
"#;
        let result = LogtailConfig::from_str(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval { field: "stream.preflight_timeout_ms" })
        ));
    }

    #[test]
    fn test_zero_max_lines_rejected() {
        let yaml = r#"
stream:
  max_lines: 0
"#;
        let result = LogtailConfig::from_str(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval { field: "stream.max_lines" })
        ));
        assert!(LogtailConfig::from_str("stream:\n  max_lines: 1\n").is_ok());
    }
}
