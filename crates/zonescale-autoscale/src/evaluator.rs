//! Rule evaluation: classify each scaling rule against the current
//! statistics.
//!
//! A statistic is only trusted when every known instance inside the rule's
//! scope contributed to it. Otherwise the aggregate may be missing part of
//! the workload and the rule reports a retryable "not yet available".

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use zonescale_core::{Membership, ScalingRule, StatValue, StatisticsSnapshot};

use crate::error::{EnforceError, EnforceResult};

/// A rule whose threshold was crossed, with the observed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleBreach {
    pub rule: ScalingRule,
    pub value: StatValue,
}

impl fmt::Display for RuleBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.rule.statistic, self.value)
    }
}

/// Rules below their low threshold and rules above their high threshold,
/// each in rule order. Rules within their thresholds appear in neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub below_low: Vec<RuleBreach>,
    pub above_high: Vec<RuleBreach>,
}

impl Evaluation {
    pub fn is_conflict(&self) -> bool {
        !self.below_low.is_empty() && !self.above_high.is_empty()
    }
}

/// Evaluate `rules` in order. Stops at the first rule that cannot be
/// evaluated.
pub fn evaluate_rules(
    rules: &[ScalingRule],
    statistics: &StatisticsSnapshot,
    membership: &Membership,
) -> EnforceResult<Evaluation> {
    let mut evaluation = Evaluation::default();

    for rule in rules {
        let value = trusted_value(rule, statistics, membership)?;

        if compare(rule, value, &rule.low)? == Ordering::Less {
            evaluation.below_low.push(RuleBreach {
                rule: rule.clone(),
                value: value.clone(),
            });
        } else if compare(rule, value, &rule.high)? == Ordering::Greater {
            evaluation.above_high.push(RuleBreach {
                rule: rule.clone(),
                value: value.clone(),
            });
        }
    }

    debug!(
        rules = rules.len(),
        below_low = evaluation.below_low.len(),
        above_high = evaluation.above_high.len(),
        "evaluated scaling rules"
    );
    Ok(evaluation)
}

/// Look up the statistic for `rule` and check its per-instance breakdown.
fn trusted_value<'a>(
    rule: &ScalingRule,
    statistics: &'a StatisticsSnapshot,
    membership: &Membership,
) -> EnforceResult<&'a StatValue> {
    let unavailable = |reason: String| EnforceError::NotYetAvailable {
        statistic: rule.statistic.to_string(),
        reason,
    };

    let sample = statistics
        .get(&rule.statistic)
        .ok_or_else(|| unavailable("no sample reported".to_string()))?;

    let required = membership.instances_in_scope(&rule.statistic);
    if required.is_empty() {
        return Err(unavailable("no known instances in scope".to_string()));
    }

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|id| !sample.contributors.contains(*id))
        .collect();
    if !missing.is_empty() {
        return Err(unavailable(format!(
            "no breakdown from instances {}",
            missing.join(", ")
        )));
    }

    Ok(&sample.value)
}

fn compare(rule: &ScalingRule, value: &StatValue, threshold: &StatValue) -> EnforceResult<Ordering> {
    value.compare(threshold).map_err(|source| EnforceError::Format {
        statistic: rule.statistic.to_string(),
        value: value.clone(),
        threshold: threshold.clone(),
        source,
    })
}
