//! Scale scheduler: drives one enforcement cycle per workload per tick.
//!
//! Pulls statistics and membership from the external collaborators, runs
//! each workload's decision engine, and hands applied targets to the
//! provisioning callback. A target becomes the zone set's last enforced
//! capacity only after provisioning succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use zonescale_core::{
    CapacityByZoneSet, CapacityVector, Membership, StatisticsSnapshot, WorkloadSpec, ZoneSet,
};

use crate::engine::{Decision, ZoneCycle};
use crate::error::EnforceResult;
use crate::registry::{EnforcementRegistry, RegistryError};

/// Source of already-aggregated statistics.
pub trait MetricsProvider: Send + Sync {
    fn statistics(&self, workload: &str) -> anyhow::Result<StatisticsSnapshot>;
}

/// Source of the current instances of a workload and their zones.
pub trait MembershipDirectory: Send + Sync {
    fn membership(&self, workload: &str) -> anyhow::Result<Membership>;
}

/// Callback type for provisioning a new target.
///
/// Called with (workload_id, zone_set, target_capacity).
pub type ProvisionCallback =
    Box<dyn Fn(&str, &ZoneSet, &CapacityVector) -> BoxFuture + Send + Sync>;

type BoxFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
>;

/// The outcome for one zone set of one workload in a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub workload: String,
    pub zone_set: ZoneSet,
    pub result: EnforceResult<Decision>,
}

/// Runs the scaling loop over every registered workload.
pub struct ScaleScheduler {
    registry: EnforcementRegistry,
    workloads: BTreeMap<String, WorkloadSpec>,
    /// Capacity confirmed by the provisioner per workload.
    last_enforced: HashMap<String, CapacityByZoneSet>,
    metrics: Arc<dyn MetricsProvider>,
    membership: Arc<dyn MembershipDirectory>,
    provision_fn: Option<ProvisionCallback>,
}

impl ScaleScheduler {
    pub fn new(metrics: Arc<dyn MetricsProvider>, membership: Arc<dyn MembershipDirectory>) -> Self {
        Self {
            registry: EnforcementRegistry::new(),
            workloads: BTreeMap::new(),
            last_enforced: HashMap::new(),
            metrics,
            membership,
            provision_fn: None,
        }
    }

    /// Set the callback used to provision new targets.
    pub fn with_provision_fn(mut self, f: ProvisionCallback) -> Self {
        self.provision_fn = Some(f);
        self
    }

    /// Start managing a workload. Every zone set starts at the policy's
    /// initial capacity.
    pub fn add_workload(&mut self, spec: WorkloadSpec) -> Result<(), RegistryError> {
        self.registry.create(&spec.id, spec.cooldown)?;
        let initial = spec
            .zone_sets
            .iter()
            .map(|zs| (zs.clone(), spec.policy.current.clone()))
            .collect();
        self.last_enforced.insert(spec.id.clone(), initial);
        self.workloads.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Stop managing a workload and drop its endpoint.
    pub fn remove_workload(&mut self, workload: &str) -> Result<WorkloadSpec, RegistryError> {
        self.registry.destroy(workload)?;
        self.last_enforced.remove(workload);
        self.workloads
            .remove(workload)
            .ok_or_else(|| RegistryError::NotFound(workload.to_string()))
    }

    /// Override the enforced capacity of a zone set, e.g. after the
    /// provisioner reports a partial scale-out.
    pub fn set_last_enforced(&mut self, workload: &str, zone_set: ZoneSet, capacity: CapacityVector) {
        self.last_enforced
            .entry(workload.to_string())
            .or_default()
            .set(zone_set, capacity);
    }

    pub fn last_enforced(&self, workload: &str) -> Option<&CapacityByZoneSet> {
        self.last_enforced.get(workload)
    }

    pub fn registry(&self) -> &EnforcementRegistry {
        &self.registry
    }

    /// Run one enforcement cycle for every workload at `now_ms`.
    ///
    /// A workload whose statistics or membership cannot be fetched is
    /// skipped for this tick.
    pub async fn tick(&mut self, now_ms: u64) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();

        for (id, spec) in &self.workloads {
            let statistics = match self.metrics.statistics(id) {
                Ok(s) => s,
                Err(e) => {
                    warn!(workload = %id, error = %e, "failed to fetch statistics");
                    continue;
                }
            };
            let membership = match self.membership.membership(id) {
                Ok(m) => m,
                Err(e) => {
                    warn!(workload = %id, error = %e, "failed to fetch membership");
                    continue;
                }
            };
            let Some(engine) = self.registry.get_mut(id) else {
                warn!(workload = %id, "no enforcement endpoint");
                continue;
            };

            let last = self.last_enforced.entry(id.clone()).or_default();
            let cycle = ZoneCycle {
                policies: spec
                    .zone_sets
                    .iter()
                    .map(|zs| (zs.clone(), spec.policy.with_current(last.get(zs))))
                    .collect(),
                total_max: spec.total_max.clone(),
                total_min: spec.total_min.clone(),
                last_enforced: last.clone(),
            };

            let results = engine.enforce_cycle(&cycle, &statistics, &membership, now_ms);

            for (zone_set, result) in results {
                match &result {
                    Ok(Decision::Applied { to, .. }) => {
                        if let Some(ref provision_fn) = self.provision_fn {
                            match provision_fn(id.as_str(), &zone_set, to).await {
                                Ok(()) => last.set(zone_set.clone(), to.clone()),
                                Err(e) => warn!(
                                    workload = %id,
                                    %zone_set,
                                    target = %to,
                                    error = %e,
                                    "provisioning failed"
                                ),
                            }
                        }
                    }
                    Ok(Decision::Unchanged { .. }) => {}
                    Err(e) => debug!(
                        workload = %id,
                        %zone_set,
                        kind = ?e.kind(),
                        error = %e,
                        "enforcement did not apply a change"
                    ),
                }
                outcomes.push(TickOutcome {
                    workload: id.clone(),
                    zone_set,
                    result,
                });
            }
        }

        outcomes
    }

    /// Run the scheduler loop until `shutdown` fires.
    pub async fn run(
        &mut self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(
            interval_secs = interval.as_secs(),
            workloads = self.workloads.len(),
            "scale scheduler started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let outcomes = self.tick(epoch_millis()).await;
                    let applied = outcomes
                        .iter()
                        .filter(|o| matches!(o.result, Ok(Decision::Applied { .. })))
                        .count();
                    debug!(zone_sets = outcomes.len(), applied, "scheduler tick complete");
                }
                _ = shutdown.changed() => {
                    info!("scale scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
