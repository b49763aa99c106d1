//! File-backed statistics and membership.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use zonescale_autoscale::{MembershipDirectory, MetricsProvider};
use zonescale_core::{CapacityByZoneSet, Membership, StatisticsSnapshot};

/// Everything the snapshot file records for one workload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkloadSnapshot {
    #[serde(default)]
    pub statistics: StatisticsSnapshot,
    #[serde(default)]
    pub membership: Membership,
    #[serde(default)]
    pub last_enforced: CapacityByZoneSet,
}

pub type SnapshotFile = HashMap<String, WorkloadSnapshot>;

pub fn load(path: &Path) -> anyhow::Result<SnapshotFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

/// Serves statistics and membership from a snapshot file, re-reading it on
/// every call so an external process can keep it fresh.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn workload(&self, workload: &str) -> anyhow::Result<WorkloadSnapshot> {
        let mut file = load(&self.path)?;
        file.remove(workload)
            .with_context(|| format!("snapshot has no entry for workload {workload}"))
    }
}

impl MetricsProvider for FileSource {
    fn statistics(&self, workload: &str) -> anyhow::Result<StatisticsSnapshot> {
        Ok(self.workload(workload)?.statistics)
    }
}

impl MembershipDirectory for FileSource {
    fn membership(&self, workload: &str) -> anyhow::Result<Membership> {
        Ok(self.workload(workload)?.membership)
    }
}
