//! Configuration loading and management
//!
//! Nothing is persisted. Every knob comes from the environment and falls
//! back to the defaults the daemon ships with.

use std::time::Duration;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Window during which repeated trigger activations collapse into one switch
    pub debounce: Duration,

    /// Interval between hook installation attempts while permission is missing
    pub poll_interval: Duration,

    /// Interval between trust re-checks once the hook is installed
    pub trust_check_interval: Duration,

    /// Upper bound on one run loop slice, which bounds shutdown latency
    pub loop_slice: Duration,

    /// Open the System Settings privacy panes on the first denial
    pub open_settings: bool,
}

/// Errors produced while reading configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

const DEBOUNCE_VAR: &str = "CAPSLANG_DEBOUNCE_MS";
const POLL_INTERVAL_VAR: &str = "CAPSLANG_POLL_INTERVAL_MS";
const TRUST_CHECK_VAR: &str = "CAPSLANG_TRUST_CHECK_INTERVAL_MS";
const LOOP_SLICE_VAR: &str = "CAPSLANG_LOOP_SLICE_MS";
const OPEN_SETTINGS_VAR: &str = "CAPSLANG_OPEN_SETTINGS";

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_secs(2),
            trust_check_interval: Duration::from_secs(1),
            loop_slice: Duration::from_millis(250),
            open_settings: true,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            debounce: millis(&lookup, DEBOUNCE_VAR, defaults.debounce)?,
            poll_interval: millis(&lookup, POLL_INTERVAL_VAR, defaults.poll_interval)?,
            trust_check_interval: millis(&lookup, TRUST_CHECK_VAR, defaults.trust_check_interval)?,
            loop_slice: millis(&lookup, LOOP_SLICE_VAR, defaults.loop_slice)?,
            open_settings: flag(&lookup, OPEN_SETTINGS_VAR, defaults.open_settings)?,
        })
    }
}

fn millis<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue { var, value: raw }),
    }
}

fn flag<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.trust_check_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CAPSLANG_DEBOUNCE_MS", "150"),
            ("CAPSLANG_POLL_INTERVAL_MS", " 500 "),
            ("CAPSLANG_OPEN_SETTINGS", "off"),
        ]))
        .unwrap();

        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(!config.open_settings);
        assert_eq!(config.loop_slice, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let err = Config::from_lookup(lookup_from(&[("CAPSLANG_TRUST_CHECK_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "CAPSLANG_TRUST_CHECK_INTERVAL_MS",
                value: "0".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Config::from_lookup(lookup_from(&[("CAPSLANG_LOOP_SLICE_MS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("CAPSLANG_OPEN_SETTINGS", "maybe")])).is_err());
    }
}
