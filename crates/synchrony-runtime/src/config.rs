//! Node configuration
//!
//! Loaded from JSON, optionally overridden from the environment:
//! - `SYNCHRONY_BOUND_SECS` - synchrony bound Δ in seconds
//! - `SYNCHRONY_START_POLICY` - `rearm`, `ignore` or `reject`
//! - `SYNCHRONY_LOG_FORMAT` - `pretty` or `json`

use serde::{Deserialize, Serialize};

use synchrony_core::{SynchronyBound, SynchronyError, SynchronyResult};
use synchrony_time::{ClockConfig, StartPolicy};

pub const ENV_BOUND_SECS: &str = "SYNCHRONY_BOUND_SECS";
pub const ENV_START_POLICY: &str = "SYNCHRONY_START_POLICY";
pub const ENV_LOG_FORMAT: &str = "SYNCHRONY_LOG_FORMAT";

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = SynchronyError;

    fn from_str(s: &str) -> SynchronyResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(SynchronyError::InvalidConfig(format!(
                "unknown log format '{}' (expected pretty or json)",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub default_directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            format: LogFormat::Pretty,
            default_directive: "info".into(),
        }
    }
}

/// Node configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Synchrony bound Δ in seconds; the round length is always 3Δ
    pub synchrony_bound_secs: f64,
    #[serde(with = "start_policy_serde")]
    pub start_policy: StartPolicy,
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            synchrony_bound_secs: SynchronyBound::DEFAULT.as_secs_f64(),
            start_policy: StartPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_json_str(json: &str) -> SynchronyResult<Self> {
        let config: NodeConfig = serde_json::from_str(json)
            .map_err(|e| SynchronyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> SynchronyResult<Self> {
        self.apply_vars(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs; unrelated names are ignored
    pub fn apply_vars<I>(mut self, vars: I) -> SynchronyResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            match name.as_str() {
                ENV_BOUND_SECS => {
                    self.synchrony_bound_secs = value.trim().parse().map_err(|_| {
                        SynchronyError::InvalidConfig(format!(
                            "{} must be a number of seconds, got '{}'",
                            ENV_BOUND_SECS, value
                        ))
                    })?;
                }
                ENV_START_POLICY => self.start_policy = value.parse()?,
                ENV_LOG_FORMAT => self.logging.format = value.parse()?,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SynchronyResult<()> {
        self.synchrony_bound().map(|_| ())
    }

    pub fn synchrony_bound(&self) -> SynchronyResult<SynchronyBound> {
        SynchronyBound::from_secs_f64(self.synchrony_bound_secs)
    }

    pub fn clock_config(&self) -> SynchronyResult<ClockConfig> {
        Ok(ClockConfig::new(self.synchrony_bound()?).with_start_policy(self.start_policy))
    }
}

mod start_policy_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use synchrony_time::StartPolicy;

    pub fn serialize<S: Serializer>(policy: &StartPolicy, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(policy.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StartPolicy, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
