//! Engine configuration.
//!
//! # Responsibility
//! - Hold the tunables the engine reads at construction time.
//! - Validate them before any service is built.
//!
//! # Invariants
//! - Every field has a default, so a partial JSON document is valid input.

use crate::logging::{default_log_level, parse_level};
use crate::mutation::StalePolicy;
use crate::ordering::time_key::TimeComparator;
use crate::reward::{SuccessiveDivision, DEFAULT_DIVISORS};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Largest UTC offset chrono accepts, in minutes (exclusive).
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stale_policy: StalePolicy,
    /// Passed on every optimistic note call.
    pub suppress_refresh: bool,
    /// Wall-clock offset for timestamp keys; system local when unset.
    pub utc_offset_minutes: Option<i32>,
    pub daily_rate: f64,
    pub reward_divisors: Vec<f64>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_policy: StalePolicy::default(),
            suppress_refresh: true,
            utc_offset_minutes: None,
            daily_rate: 0.0,
            reward_divisors: DEFAULT_DIVISORS.to_vec(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    OffsetOutOfRange(i32),
    NonPositiveDivisor(f64),
    NegativeDailyRate(f64),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OffsetOutOfRange(minutes) => {
                write!(f, "utc_offset_minutes out of range: {minutes}")
            }
            Self::NonPositiveDivisor(value) => {
                write!(f, "reward divisor must be positive, got {value}")
            }
            Self::NegativeDailyRate(value) => {
                write!(f, "daily_rate must not be negative, got {value}")
            }
            Self::InvalidLogLevel(level) => write!(f, "invalid log_level `{level}`"),
        }
    }
}

impl Error for ConfigError {}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(minutes) = self.utc_offset_minutes {
            if minutes.unsigned_abs() >= MAX_OFFSET_MINUTES.unsigned_abs() {
                return Err(ConfigError::OffsetOutOfRange(minutes));
            }
        }
        if let Some(bad) = self
            .reward_divisors
            .iter()
            .copied()
            .find(|divisor| divisor.is_nan() || *divisor <= 0.0)
        {
            return Err(ConfigError::NonPositiveDivisor(bad));
        }
        if self.daily_rate.is_nan() || self.daily_rate < 0.0 {
            return Err(ConfigError::NegativeDailyRate(self.daily_rate));
        }
        parse_level(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        Ok(())
    }

    /// Comparator for the configured offset.
    pub fn comparator(&self) -> TimeComparator {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .map_or_else(TimeComparator::local, TimeComparator::with_offset)
    }

    pub fn reward_policy(&self) -> SuccessiveDivision {
        SuccessiveDivision::new(self.reward_divisors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::mutation::StalePolicy;
    use crate::reward::RewardPolicy;

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"stale_policy":"arrival_order","daily_rate":480}"#).unwrap();
        assert_eq!(config.stale_policy, StalePolicy::ArrivalOrder);
        assert!(config.suppress_refresh);
        assert_eq!(config.reward_divisors, vec![8.0, 60.0]);
        assert!(config.validate().is_ok());
        assert!((config.reward_policy().reward(60, 1.0, config.daily_rate) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = EngineConfig {
            utc_offset_minutes: Some(24 * 60),
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::OffsetOutOfRange(1440)));
        config.utc_offset_minutes = Some(i32::MIN);
        assert_eq!(config.validate(), Err(ConfigError::OffsetOutOfRange(i32::MIN)));

        config.utc_offset_minutes = Some(-300);
        config.reward_divisors = vec![8.0, 0.0];
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveDivisor(0.0)));

        config.reward_divisors = vec![8.0];
        config.daily_rate = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::NegativeDailyRate(-1.0)));

        config.daily_rate = 1.0;
        config.log_level = "chatty".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("chatty".to_string()))
        );
    }

    #[test]
    fn offset_drives_comparator() {
        let config = EngineConfig {
            utc_offset_minutes: Some(120),
            ..EngineConfig::default()
        };
        assert_eq!(config.comparator().offset().local_minus_utc(), 7200);
    }
}
