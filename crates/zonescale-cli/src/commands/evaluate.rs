use std::path::Path;

use anyhow::Context;
use tracing::debug;

use zonescale_autoscale::{DecisionEngine, ZoneCycle, epoch_millis};
use zonescale_core::{CapacityByZoneSet, ScaleConfig, WorkloadSpec};

use super::report::ZoneReport;
use super::snapshot::{self, WorkloadSnapshot};

pub fn evaluate(config: &Path, workload: &str, snapshot_path: &Path, format: &str) -> anyhow::Result<()> {
    if !matches!(format, "text" | "json") {
        anyhow::bail!("unknown format {format:?} (expected text or json)");
    }

    let specs = ScaleConfig::load(config)?;
    let spec = specs
        .into_iter()
        .find(|s| s.id == workload)
        .with_context(|| format!("workload {workload} is not defined in {}", config.display()))?;

    let mut snapshots = snapshot::load(snapshot_path)?;
    let snapshot = snapshots
        .remove(workload)
        .with_context(|| format!("snapshot has no entry for workload {workload}"))?;

    let reports = run_cycle(&spec, &snapshot, epoch_millis());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{workload}");
        for report in &reports {
            println!("  {}", report.to_text());
        }
    }

    Ok(())
}

/// One enforcement cycle with a fresh engine, so cooldown never applies.
fn run_cycle(spec: &WorkloadSpec, snapshot: &WorkloadSnapshot, now_ms: u64) -> Vec<ZoneReport> {
    let last_enforced: CapacityByZoneSet = spec
        .zone_sets
        .iter()
        .map(|zs| {
            let capacity = if snapshot.last_enforced.contains(zs) {
                snapshot.last_enforced.get(zs)
            } else {
                spec.policy.current.clone()
            };
            (zs.clone(), capacity)
        })
        .collect();

    let cycle = ZoneCycle {
        policies: spec
            .zone_sets
            .iter()
            .map(|zs| (zs.clone(), spec.policy.with_current(last_enforced.get(zs))))
            .collect(),
        total_max: spec.total_max.clone(),
        total_min: spec.total_min.clone(),
        last_enforced,
    };
    debug!(workload = %spec.id, zone_sets = cycle.policies.len(), "evaluating snapshot");

    let mut engine = DecisionEngine::new(&spec.id, spec.cooldown);
    engine
        .enforce_cycle(&cycle, &snapshot.statistics, &snapshot.membership, now_ms)
        .iter()
        .map(|(zone_set, result)| ZoneReport::new(zone_set.clone(), result))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonescale_autoscale::{Decision, ErrorKind};
    use zonescale_core::CapacityVector;

    const SNAPSHOT: &str = r#"{
        "default/web": {
            "statistics": [
                {
                    "statistic": { "metric": "heap_used_pct", "aggregation": "avg", "window": "5m" },
                    "value": 91,
                    "contributors": ["vm-1", "vm-2"]
                }
            ],
            "membership": { "vm-1": "zone-a", "vm-2": "zone-b" },
            "last_enforced": { "zone-b": { "memory": 2048 } }
        }
    }"#;

    fn fixture() -> (WorkloadSpec, WorkloadSnapshot) {
        let spec = ScaleConfig::scaffold("default/web").resolve().unwrap().remove(0);
        let mut file: snapshot::SnapshotFile = serde_json::from_str(SNAPSHOT).unwrap();
        (spec, file.remove("default/web").unwrap())
    }

    #[test]
    fn scales_up_and_reports_saturation() {
        let (spec, snapshot) = fixture();
        let reports = run_cycle(&spec, &snapshot, 0);
        assert_eq!(reports.len(), 2);

        // zone-a: max = min(2048, 4096 - 2048) = 2048, 1024 + 512 → 1536.
        let a = &reports[0];
        assert_eq!(a.zone_set.to_string(), "zone-a");
        assert_eq!(
            a.decision.as_ref().map(Decision::target),
            Some(&CapacityVector::single("memory", 1536))
        );

        // zone-b already holds the per-zone maximum.
        let b = &reports[1];
        assert_eq!(b.error.as_ref().map(|e| e.kind), Some(ErrorKind::Saturation));
    }

    #[test]
    fn missing_contributor_is_reported_as_retryable() {
        let (spec, mut snapshot) = fixture();
        snapshot.membership.insert("vm-3", "zone-a");

        for report in run_cycle(&spec, &snapshot, 0) {
            let error = report.error.unwrap();
            assert_eq!(error.kind, ErrorKind::Retryable);
            assert!(error.retryable);
        }
    }
}
