//! Scaling rules and autoscaling policies.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capacity::CapacityVector;
use crate::stats::{StatValue, StatisticId};

/// A statistic with low and high thresholds.
///
/// A value below `low` asks for less capacity, a value above `high` asks for
/// more; anything in between leaves capacity alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRule {
    pub statistic: StatisticId,
    pub low: StatValue,
    pub high: StatValue,
}

impl ScalingRule {
    pub fn new(statistic: StatisticId, low: impl Into<StatValue>, high: impl Into<StatValue>) -> Self {
        Self {
            statistic,
            low: low.into(),
            high: high.into(),
        }
    }
}

/// The first invariant a policy violates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy has no scaling rules")]
    NoRules,
    #[error("scaling rule for {0} appears more than once")]
    DuplicateRule(String),
    #[error("increase step must be non-zero")]
    ZeroIncreaseStep,
    #[error("decrease step must be non-zero")]
    ZeroDecreaseStep,
    #[error("maximum capacity must be non-zero")]
    ZeroMaxCapacity,
    #[error("minimum capacity must be non-zero")]
    ZeroMinCapacity,
    #[error("minimum capacity exceeds maximum capacity in dimension {0:?}")]
    MinAboveMax(String),
    #[error("scaling rule for {0} has its low threshold above its high threshold")]
    InvertedThresholds(String),
}

/// Everything the decision engine needs to evaluate one zone set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScalingPolicy {
    /// Capacity currently allocated.
    pub current: CapacityVector,
    /// Rules evaluated in order.
    pub rules: Vec<ScalingRule>,
    pub increase_step: CapacityVector,
    pub decrease_step: CapacityVector,
    pub max_capacity: CapacityVector,
    pub min_capacity: CapacityVector,
}

impl AutoScalingPolicy {
    /// Check the policy, reporting the first violated invariant.
    ///
    /// A policy that fails validation must not be enforced at all.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.rules.is_empty() {
            return Err(PolicyError::NoRules);
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if self.rules[..i].iter().any(|r| r == rule) {
                return Err(PolicyError::DuplicateRule(rule.statistic.to_string()));
            }
        }
        if self.increase_step.equals_zero() {
            return Err(PolicyError::ZeroIncreaseStep);
        }
        if self.decrease_step.equals_zero() {
            return Err(PolicyError::ZeroDecreaseStep);
        }
        if self.max_capacity.equals_zero() {
            return Err(PolicyError::ZeroMaxCapacity);
        }
        if self.min_capacity.equals_zero() {
            return Err(PolicyError::ZeroMinCapacity);
        }
        if let Some(dim) = self.min_capacity.first_exceeding(&self.max_capacity) {
            return Err(PolicyError::MinAboveMax(dim.to_string()));
        }
        // Thresholds that cannot be ordered are reported when evaluated.
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.low.compare(&r.high) == Ok(Ordering::Greater))
        {
            return Err(PolicyError::InvertedThresholds(rule.statistic.to_string()));
        }
        Ok(())
    }

    /// Same policy with a different current capacity.
    pub fn with_current(&self, current: CapacityVector) -> Self {
        Self {
            current,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Aggregation;
    use std::time::Duration;

    fn mem(v: u64) -> CapacityVector {
        CapacityVector::single("memory", v)
    }

    fn rule(metric: &str) -> ScalingRule {
        ScalingRule::new(
            StatisticId::new(metric, Aggregation::Avg, Duration::from_secs(60)),
            20,
            80,
        )
    }

    fn valid_policy() -> AutoScalingPolicy {
        AutoScalingPolicy {
            current: mem(1000),
            rules: vec![rule("heap_used_pct")],
            increase_step: mem(500),
            decrease_step: mem(250),
            max_capacity: mem(2000),
            min_capacity: mem(500),
        }
    }

    #[test]
    fn valid_policy_passes() {
        assert_eq!(valid_policy().validate(), Ok(()));
    }

    #[test]
    fn reports_first_violation() {
        let mut policy = valid_policy();
        policy.rules.clear();
        policy.increase_step = CapacityVector::zero();
        assert_eq!(policy.validate(), Err(PolicyError::NoRules));

        policy.rules.push(rule("heap_used_pct"));
        assert_eq!(policy.validate(), Err(PolicyError::ZeroIncreaseStep));
    }

    #[test]
    fn zero_vectors_are_rejected() {
        let mut policy = valid_policy();
        policy.decrease_step = CapacityVector::zero();
        assert_eq!(policy.validate(), Err(PolicyError::ZeroDecreaseStep));

        let mut policy = valid_policy();
        policy.max_capacity = CapacityVector::zero();
        assert_eq!(policy.validate(), Err(PolicyError::ZeroMaxCapacity));

        let mut policy = valid_policy();
        policy.min_capacity = CapacityVector::zero();
        assert_eq!(policy.validate(), Err(PolicyError::ZeroMinCapacity));
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let mut policy = valid_policy();
        policy.rules.push(rule("heap_used_pct"));
        assert!(matches!(policy.validate(), Err(PolicyError::DuplicateRule(_))));
    }

    #[test]
    fn min_above_max_is_rejected() {
        let mut policy = valid_policy();
        policy.min_capacity = mem(3000);
        assert_eq!(policy.validate(), Err(PolicyError::MinAboveMax("memory".to_string())));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut policy = valid_policy();
        policy.rules.push(ScalingRule::new(
            StatisticId::new("gc_pause_ms", Aggregation::Max, Duration::from_secs(60)),
            200,
            10,
        ));
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::InvertedThresholds(s)) if s.contains("gc_pause_ms")
        ));
    }

    #[test]
    fn equal_or_uncomparable_thresholds_pass() {
        let mut policy = valid_policy();
        policy.rules = vec![ScalingRule::new(
            StatisticId::new("queue_depth", Aggregation::Avg, Duration::from_secs(60)),
            50,
            50,
        )];
        assert_eq!(policy.validate(), Ok(()));

        policy.rules[0].high = StatValue::from("busy");
        assert_eq!(policy.validate(), Ok(()));
    }

    #[test]
    fn with_current_keeps_everything_else() {
        let policy = valid_policy().with_current(mem(1500));
        assert_eq!(policy.current, mem(1500));
        assert_eq!(policy.max_capacity, mem(2000));
    }
}
