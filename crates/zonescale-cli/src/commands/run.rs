use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use zonescale_autoscale::{Decision, ProvisionCallback, ScaleScheduler, epoch_millis};
use zonescale_core::{CapacityVector, ScaleConfig, ZoneSet};

use super::report::ZoneReport;
use super::snapshot::{self, FileSource};

/// Provisioner for dry runs: every target is logged and accepted.
fn log_only_provisioner() -> ProvisionCallback {
    Box::new(|workload: &str, zone_set: &ZoneSet, target: &CapacityVector| {
        info!(%workload, %zone_set, %target, "provisioning target (log-only)");
        Box::pin(async { Ok(()) })
    })
}

pub async fn run(config: &Path, snapshot_path: &Path, interval: Duration, ticks: Option<u64>) -> anyhow::Result<()> {
    let specs = ScaleConfig::load(config)?;
    let seeds = snapshot::load(snapshot_path)?;

    let source = Arc::new(FileSource::new(snapshot_path));
    let mut scheduler =
        ScaleScheduler::new(source.clone(), source).with_provision_fn(log_only_provisioner());

    for spec in specs {
        let id = spec.id.clone();
        let zone_sets = spec.zone_sets.clone();
        scheduler.add_workload(spec)?;

        match seeds.get(&id) {
            Some(seed) => {
                for zone_set in zone_sets.into_iter().filter(|zs| seed.last_enforced.contains(zs)) {
                    let capacity = seed.last_enforced.get(&zone_set);
                    scheduler.set_last_enforced(&id, zone_set, capacity);
                }
            }
            None => warn!(workload = %id, "snapshot has no entry, workload will be skipped every tick"),
        }
    }

    info!(
        workloads = scheduler.registry().len(),
        interval = %humantime::format_duration(interval),
        "starting scale loop"
    );

    match ticks {
        Some(count) => {
            for n in 0..count {
                if n > 0 {
                    tokio::time::sleep(interval).await;
                }
                let outcomes = scheduler.tick(epoch_millis()).await;
                for outcome in &outcomes {
                    let report = ZoneReport::new(outcome.zone_set.clone(), &outcome.result);
                    println!("[tick {}] {} {}", n + 1, outcome.workload, report.to_text());
                }
                let applied = outcomes
                    .iter()
                    .filter(|o| matches!(o.result, Ok(Decision::Applied { .. })))
                    .count();
                info!(tick = n + 1, zone_sets = outcomes.len(), applied, "tick complete");
            }
        }
        None => {
            let (tx, rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl-C");
                    let _ = tx.send(true);
                }
            });
            scheduler.run(interval, rx).await;
        }
    }

    Ok(())
}
