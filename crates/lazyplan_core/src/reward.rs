//! Reward amounts for scheduled catalog instances.
//!
//! # Responsibility
//! - Turn estimated effort, a multiplier and a daily rate into a reward.
//! - Keep the scaling constants outside the engine as configuration.
//!
//! # Invariants
//! - Policies are pure: same inputs, same output.

use crate::model::catalog::CatalogEntry;

pub const DEFAULT_DIVISORS: [f64; 2] = [8.0, 60.0];

/// Converts effort into a reward amount.
pub trait RewardPolicy {
    fn reward(&self, estimated_minutes: u32, multiplier: f64, daily_rate: f64) -> f64;
}

impl<F> RewardPolicy for F
where
    F: Fn(u32, f64, f64) -> f64,
{
    fn reward(&self, estimated_minutes: u32, multiplier: f64, daily_rate: f64) -> f64 {
        self(estimated_minutes, multiplier, daily_rate)
    }
}

/// Divides the daily rate by each divisor in turn to get a per-minute rate,
/// then scales by minutes and multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessiveDivision {
    divisors: Vec<f64>,
}

impl SuccessiveDivision {
    pub fn new(divisors: Vec<f64>) -> Self {
        Self { divisors }
    }

    pub fn divisors(&self) -> &[f64] {
        &self.divisors
    }
}

impl Default for SuccessiveDivision {
    fn default() -> Self {
        Self::new(DEFAULT_DIVISORS.to_vec())
    }
}

impl RewardPolicy for SuccessiveDivision {
    fn reward(&self, estimated_minutes: u32, multiplier: f64, daily_rate: f64) -> f64 {
        let per_minute = self
            .divisors
            .iter()
            .fold(daily_rate, |rate, divisor| rate / divisor);
        per_minute * f64::from(estimated_minutes) * multiplier
    }
}

/// Reward for one instance of `entry`, or `None` when it has no estimate.
pub fn reward_for(policy: &dyn RewardPolicy, entry: &CatalogEntry, daily_rate: f64) -> Option<f64> {
    entry
        .estimated_minutes
        .map(|minutes| policy.reward(minutes, entry.multiplier, daily_rate))
}
