//! Decision engine: one per workload.
//!
//! Combines rule evaluation, the cooldown gate, and zone bounds into a
//! capacity decision. The engine never provisions anything; it returns the
//! target and the caller acts on it.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use zonescale_core::{
    AutoScalingPolicy, CapacityByZoneSet, CapacityVector, CooldownWindows, Membership,
    StatisticsSnapshot, ZoneSet,
};

use crate::bounds::ZoneBoundCalculator;
use crate::cooldown::{CooldownGate, CooldownStatus};
use crate::error::{EnforceError, EnforceResult, ErrorKind};
use crate::evaluator::evaluate_rules;

/// Which threshold triggered an applied change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    Up,
    Down,
}

/// Why capacity stayed the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// No rule crossed a threshold.
    WithinThresholds,
    /// A low threshold was crossed but capacity is already at the minimum.
    AtMinimum,
}

/// A successful capacity decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Unchanged {
        capacity: CapacityVector,
        reason: UnchangedReason,
    },
    Applied {
        from: CapacityVector,
        to: CapacityVector,
        direction: ScaleDirection,
    },
}

impl Decision {
    /// Capacity the zone set should hold after this decision.
    pub fn target(&self) -> &CapacityVector {
        match self {
            Decision::Unchanged { capacity, .. } => capacity,
            Decision::Applied { to, .. } => to,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Decision::Applied { .. })
    }
}

/// Inputs for one zone-aware enforcement cycle of a workload.
#[derive(Debug, Clone)]
pub struct ZoneCycle {
    /// Policy per zone set; each policy's `current` is that zone set's
    /// current capacity and its bounds are the per-zone bounds.
    pub policies: BTreeMap<ZoneSet, AutoScalingPolicy>,
    pub total_max: CapacityVector,
    pub total_min: CapacityVector,
    /// Capacity the provisioner last enforced per zone set.
    pub last_enforced: CapacityByZoneSet,
}

/// The live enforcement endpoint for one workload.
#[derive(Debug)]
pub struct DecisionEngine {
    workload: String,
    cooldown: CooldownGate,
    /// Capacity decided by zone sets earlier in the current cycle.
    new_planned: CapacityByZoneSet,
    /// Most recent applied target per zone set.
    latest: CapacityByZoneSet,
}

impl DecisionEngine {
    pub fn new(workload: impl Into<String>, cooldown: CooldownWindows) -> Self {
        Self {
            workload: workload.into(),
            cooldown: CooldownGate::new(cooldown),
            new_planned: CapacityByZoneSet::new(),
            latest: CapacityByZoneSet::new(),
        }
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// Capacity planned per zone set during the most recent cycle.
    pub fn new_planned(&self) -> &CapacityByZoneSet {
        &self.new_planned
    }

    /// Most recent applied target for `zone_set`.
    pub fn latest_target(&self, zone_set: &ZoneSet) -> Option<CapacityVector> {
        self.latest
            .contains(zone_set)
            .then(|| self.latest.get(zone_set))
    }

    /// Enforce a single, unpartitioned policy at `now_ms` (epoch ms).
    ///
    /// Uses the policy's own maximum and minimum as the bounds.
    pub fn enforce(
        &mut self,
        policy: &AutoScalingPolicy,
        statistics: &StatisticsSnapshot,
        membership: &Membership,
        now_ms: u64,
    ) -> EnforceResult<Decision> {
        let status = self.cooldown.validate(&membership.instance_ids(), now_ms);
        if let Err(e) = policy.validate() {
            warn!(workload = %self.workload, error = %e, "invalid scaling policy");
            return Err(e.into());
        }
        if let CooldownStatus::Active { remaining } = status {
            debug!(workload = %self.workload, ?remaining, "scaling suppressed by cooldown");
            return Err(EnforceError::Cooldown { remaining });
        }

        let zone_set = ZoneSet::default_set();
        let decision = decide(
            &self.workload,
            &zone_set,
            policy,
            &policy.max_capacity,
            &policy.min_capacity,
            statistics,
            membership,
        )?;
        if let Decision::Applied { to, .. } = &decision {
            self.latest.set(zone_set, to.clone());
        }
        Ok(decision)
    }

    /// Enforce every zone set of the workload for one scheduling tick.
    ///
    /// Zone sets are decided in canonical order; each one's bounds account
    /// for what earlier zone sets planned this cycle.
    pub fn enforce_cycle(
        &mut self,
        cycle: &ZoneCycle,
        statistics: &StatisticsSnapshot,
        membership: &Membership,
        now_ms: u64,
    ) -> BTreeMap<ZoneSet, EnforceResult<Decision>> {
        let status = self.cooldown.validate(&membership.instance_ids(), now_ms);
        self.new_planned.clear();

        let zone_sets: Vec<ZoneSet> = cycle.policies.keys().cloned().collect();
        let mut results = BTreeMap::new();

        for (zone_set, policy) in &cycle.policies {
            let result = self.enforce_zone(cycle, &zone_sets, zone_set, policy, status, statistics, membership);

            let planned = match &result {
                Ok(decision) => decision.target().clone(),
                Err(_) => policy.current.clone(),
            };
            if let Ok(Decision::Applied { to, .. }) = &result {
                self.latest.set(zone_set.clone(), to.clone());
            }
            self.new_planned.set(zone_set.clone(), planned);
            results.insert(zone_set.clone(), result);
        }

        results
    }

    #[allow(clippy::too_many_arguments)]
    fn enforce_zone(
        &self,
        cycle: &ZoneCycle,
        zone_sets: &[ZoneSet],
        zone_set: &ZoneSet,
        policy: &AutoScalingPolicy,
        status: CooldownStatus,
        statistics: &StatisticsSnapshot,
        membership: &Membership,
    ) -> EnforceResult<Decision> {
        if let Err(e) = policy.validate() {
            warn!(workload = %self.workload, %zone_set, error = %e, "invalid scaling policy");
            return Err(e.into());
        }
        if let CooldownStatus::Active { remaining } = status {
            debug!(workload = %self.workload, %zone_set, ?remaining, "scaling suppressed by cooldown");
            return Err(EnforceError::Cooldown { remaining });
        }

        let calc = ZoneBoundCalculator::new(zone_sets, &cycle.last_enforced, &self.new_planned);
        let maximum = calc.maximum_for(zone_set, &cycle.total_max, &policy.max_capacity);
        let minimum = calc.minimum_for(zone_set, &cycle.total_min, &policy.min_capacity);

        if let Some(dimension) = minimum.first_exceeding(&maximum) {
            warn!(
                workload = %self.workload,
                %zone_set,
                %minimum,
                %maximum,
                dimension,
                "zone bounds are unsatisfiable"
            );
            return Err(EnforceError::ConfigurationConflict {
                zone_set: zone_set.clone(),
                dimension: dimension.to_string(),
                minimum,
                maximum,
            });
        }

        decide(&self.workload, zone_set, policy, &maximum, &minimum, statistics, membership)
    }
}

/// Evaluate the rules and apply the matching step, clamped to
/// `[minimum, maximum]`.
fn decide(
    workload: &str,
    zone_set: &ZoneSet,
    policy: &AutoScalingPolicy,
    maximum: &CapacityVector,
    minimum: &CapacityVector,
    statistics: &StatisticsSnapshot,
    membership: &Membership,
) -> EnforceResult<Decision> {
    let evaluation = evaluate_rules(&policy.rules, statistics, membership).inspect_err(|e| {
        if e.kind() == ErrorKind::Format {
            warn!(%workload, %zone_set, error = %e, "statistic cannot be compared with its threshold");
        }
    })?;
    let current = &policy.current;

    if evaluation.is_conflict() {
        warn!(
            %workload,
            %zone_set,
            below_low = evaluation.below_low.len(),
            above_high = evaluation.above_high.len(),
            "conflicting scaling rules, leaving capacity unchanged"
        );
        return Err(EnforceError::RuleConflict {
            below_low: evaluation.below_low,
            above_high: evaluation.above_high,
        });
    }

    if !evaluation.above_high.is_empty() {
        let clamped = current.add(&policy.increase_step).min(maximum);
        if &clamped == current {
            warn!(%workload, %zone_set, %current, %maximum, "capacity already at maximum");
            return Err(EnforceError::Saturated {
                current: current.clone(),
                maximum: maximum.clone(),
            });
        }
        info!(%workload, %zone_set, from = %current, to = %clamped, "scaling up");
        return Ok(Decision::Applied {
            from: current.clone(),
            to: clamped,
            direction: ScaleDirection::Up,
        });
    }

    if !evaluation.below_low.is_empty() {
        let clamped = current.subtract_floor_zero(&policy.decrease_step).max(minimum);
        if &clamped == current {
            debug!(%workload, %zone_set, %current, %minimum, "capacity already at minimum");
            return Ok(Decision::Unchanged {
                capacity: current.clone(),
                reason: UnchangedReason::AtMinimum,
            });
        }
        info!(%workload, %zone_set, from = %current, to = %clamped, "scaling down");
        return Ok(Decision::Applied {
            from: current.clone(),
            to: clamped,
            direction: ScaleDirection::Down,
        });
    }

    debug!(%workload, %zone_set, %current, "all rules within thresholds");
    Ok(Decision::Unchanged {
        capacity: current.clone(),
        reason: UnchangedReason::WithinThresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zonescale_core::{Aggregation, ScalingRule, StatisticId};

    fn mem(v: u64) -> CapacityVector {
        CapacityVector::single("memory", v)
    }

    fn zs(s: &str) -> ZoneSet {
        s.parse().unwrap()
    }

    fn heap() -> StatisticId {
        StatisticId::new("heap_used_pct", Aggregation::Avg, Duration::from_secs(300))
    }

    fn no_cooldown() -> CooldownWindows {
        CooldownWindows {
            add: Duration::ZERO,
            remove: Duration::ZERO,
        }
    }

    fn policy(current: u64) -> AutoScalingPolicy {
        AutoScalingPolicy {
            current: mem(current),
            rules: vec![ScalingRule::new(heap(), 20, 80)],
            increase_step: mem(500),
            decrease_step: mem(500),
            max_capacity: mem(2000),
            min_capacity: mem(500),
        }
    }

    fn members() -> Membership {
        Membership::new().with_instance("vm-1", "a").with_instance("vm-2", "b")
    }

    fn stats(value: i64) -> StatisticsSnapshot {
        StatisticsSnapshot::new().with_sample(heap(), value, ["vm-1", "vm-2"])
    }

    #[test]
    fn within_thresholds_is_unchanged() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let decision = engine.enforce(&policy(1000), &stats(50), &members(), 0).unwrap();
        assert_eq!(
            decision,
            Decision::Unchanged {
                capacity: mem(1000),
                reason: UnchangedReason::WithinThresholds
            }
        );
        assert_eq!(engine.latest_target(&ZoneSet::default_set()), None);
    }

    #[test]
    fn high_breach_scales_up() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let decision = engine.enforce(&policy(1000), &stats(90), &members(), 0).unwrap();
        assert_eq!(
            decision,
            Decision::Applied {
                from: mem(1000),
                to: mem(1500),
                direction: ScaleDirection::Up
            }
        );
        assert_eq!(engine.latest_target(&ZoneSet::default_set()), Some(mem(1500)));
    }

    #[test]
    fn low_breach_scales_down() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let decision = engine.enforce(&policy(1500), &stats(5), &members(), 0).unwrap();
        assert_eq!(decision.target(), &mem(1000));
    }

    #[test]
    fn invalid_policy_is_rejected_before_evaluation() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let mut bad = policy(1000);
        bad.rules.clear();
        let err = engine.enforce(&bad, &stats(90), &members(), 0).unwrap_err();
        assert_eq!(err, EnforceError::InvalidPolicy(zonescale_core::PolicyError::NoRules));
    }

    #[test]
    fn cooldown_suppresses_decisions() {
        let mut engine = DecisionEngine::new(
            "default/api",
            CooldownWindows {
                add: Duration::from_secs(60),
                remove: Duration::from_secs(60),
            },
        );
        engine.enforce(&policy(1000), &stats(50), &members(), 0).unwrap();

        let grown = members().with_instance("vm-3", "a");
        let stats = StatisticsSnapshot::new().with_sample(heap(), 90, ["vm-1", "vm-2", "vm-3"]);
        let err = engine.enforce(&policy(1000), &stats, &grown, 1_000).unwrap_err();
        assert_eq!(err, EnforceError::Cooldown { remaining: Duration::from_secs(60) });

        let decision = engine.enforce(&policy(1000), &stats, &grown, 61_001).unwrap();
        assert!(decision.is_applied());
    }

    fn cycle(currents: &[(&str, u64)], total_max: u64, total_min: u64) -> ZoneCycle {
        ZoneCycle {
            policies: currents.iter().map(|(z, c)| (zs(z), policy(*c))).collect(),
            total_max: mem(total_max),
            total_min: mem(total_min),
            last_enforced: currents.iter().map(|(z, c)| (zs(z), mem(*c))).collect(),
        }
    }

    #[test]
    fn cycle_keeps_total_under_ceiling() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let cycle = cycle(&[("a", 1000), ("b", 1000)], 2600, 1000);

        let results = engine.enforce_cycle(&cycle, &stats(90), &members(), 0);

        // a: max = min(2000, 2600 - 1000) = 1600 → 1500.
        assert_eq!(results[&zs("a")].as_ref().unwrap().target(), &mem(1500));
        // b: max = min(2000, 2600 - min(2000, max(1000, 1500))) = 1100.
        assert_eq!(results[&zs("b")].as_ref().unwrap().target(), &mem(1100));
        assert_eq!(engine.new_planned().total(), mem(2600));
    }

    #[test]
    fn cycle_reports_saturation_per_zone() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let cycle = cycle(&[("a", 1000), ("b", 1000)], 2000, 1000);

        let results = engine.enforce_cycle(&cycle, &stats(90), &members(), 0);
        for zone in ["a", "b"] {
            assert!(matches!(results[&zs(zone)], Err(EnforceError::Saturated { .. })));
        }
    }

    #[test]
    fn cycle_detects_unsatisfiable_bounds() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        // b holds 1800 of a 2000 ceiling, but the workload floor is 2500.
        let cycle = cycle(&[("a", 600), ("b", 1800)], 2000, 2500);

        let results = engine.enforce_cycle(&cycle, &stats(50), &members(), 0);
        let err = results[&zs("a")].as_ref().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn cycle_reports_uncomparable_statistic_for_every_zone() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let cycle = cycle(&[("a", 1000), ("b", 1000)], 4000, 1000);
        let busy = StatisticsSnapshot::new().with_sample(heap(), "busy", ["vm-1", "vm-2"]);

        let results = engine.enforce_cycle(&cycle, &busy, &members(), 0);
        for zone in ["a", "b"] {
            let err = results[&zs(zone)].as_ref().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Format);
            assert!(!err.is_retryable());
            assert_eq!(engine.new_planned().get(&zs(zone)), mem(1000));
            assert_eq!(engine.latest_target(&zs(zone)), None);
        }
    }

    #[test]
    fn cycle_rejects_invalid_policy_per_zone() {
        let mut engine = DecisionEngine::new("default/api", no_cooldown());
        let mut cycle = cycle(&[("a", 1000), ("b", 1000)], 4000, 1000);
        if let Some(policy) = cycle.policies.get_mut(&zs("b")) {
            policy.increase_step = CapacityVector::zero();
        }

        let results = engine.enforce_cycle(&cycle, &stats(50), &members(), 0);
        assert!(results[&zs("a")].is_ok());
        assert_eq!(
            results[&zs("b")],
            Err(EnforceError::InvalidPolicy(zonescale_core::PolicyError::ZeroIncreaseStep))
        );
    }

    #[test]
    fn cycle_reports_cooldown_for_every_zone() {
        let mut engine = DecisionEngine::new(
            "default/api",
            CooldownWindows {
                add: Duration::from_secs(30),
                remove: Duration::from_secs(30),
            },
        );
        let cycle = cycle(&[("a", 1000), ("b", 1000)], 4000, 1000);
        engine.enforce_cycle(&cycle, &stats(50), &members(), 0);

        let shrunk = Membership::new().with_instance("vm-1", "a");
        let results = engine.enforce_cycle(&cycle, &stats(90), &shrunk, 1_000);
        assert!(results.values().all(|r| matches!(r, Err(EnforceError::Cooldown { .. }))));
        // Failed zone sets plan their current capacity.
        assert_eq!(engine.new_planned().get(&zs("a")), mem(1000));
    }
}
