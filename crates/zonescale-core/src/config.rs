//! zonescale.toml configuration parser.
//!
//! The file mirrors the engine's inputs with every field optional so a
//! missing value can be reported by name. [`ScaleConfig::resolve`] turns the
//! raw file into validated [`WorkloadSpec`]s.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capacity::CapacityVector;
use crate::duration;
use crate::policy::{AutoScalingPolicy, PolicyError, ScalingRule};
use crate::stats::{Aggregation, StatValue, StatisticId};
use crate::zone::{ZoneSet, ZoneSetError};

/// Default cooldown after an instance is added.
pub const DEFAULT_ADD_COOLDOWN: Duration = Duration::from_secs(120);
/// Default cooldown after an instance is removed.
pub const DEFAULT_REMOVE_COOLDOWN: Duration = Duration::from_secs(300);

/// Errors raised while loading or resolving a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("workload id may not be empty")]
    EmptyWorkloadId,

    #[error("duplicate workload id: {0}")]
    DuplicateWorkload(String),

    #[error("workload {workload}: missing field `{field}`")]
    MissingField {
        workload: String,
        field: &'static str,
    },

    #[error("workload {workload}: invalid duration {value:?} for `{field}`: {reason}")]
    InvalidDuration {
        workload: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("workload {workload}: invalid zone set {value:?}: {source}")]
    ZoneSet {
        workload: String,
        value: String,
        source: ZoneSetError,
    },

    #[error("workload {workload}: invalid policy: {source}")]
    Policy {
        workload: String,
        source: PolicyError,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaleConfig {
    #[serde(default, rename = "workload")]
    pub workloads: Vec<WorkloadConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub id: String,
    pub zone_sets: Option<Vec<String>>,
    pub total_max: Option<CapacityVector>,
    pub total_min: Option<CapacityVector>,
    pub cooldown: Option<CooldownConfig>,
    pub policy: Option<PolicyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub add: Option<String>,
    pub remove: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub initial: Option<CapacityVector>,
    pub increase_step: Option<CapacityVector>,
    pub decrease_step: Option<CapacityVector>,
    pub max_capacity: Option<CapacityVector>,
    pub min_capacity: Option<CapacityVector>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub metric: Option<String>,
    pub aggregation: Option<Aggregation>,
    pub window: Option<String>,
    pub zone: Option<String>,
    pub instance: Option<String>,
    pub low: Option<StatValue>,
    pub high: Option<StatValue>,
}

/// Cooldown windows for a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindows {
    pub add: Duration,
    pub remove: Duration,
}

impl Default for CooldownWindows {
    fn default() -> Self {
        Self {
            add: DEFAULT_ADD_COOLDOWN,
            remove: DEFAULT_REMOVE_COOLDOWN,
        }
    }
}

/// A fully resolved and validated workload.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    pub id: String,
    /// Canonical, de-duplicated zone sets in sorted order.
    pub zone_sets: Vec<ZoneSet>,
    pub total_max: CapacityVector,
    pub total_min: CapacityVector,
    pub cooldown: CooldownWindows,
    /// Per-zone-set policy; `current` holds the configured initial capacity.
    pub policy: AutoScalingPolicy,
}

impl ScaleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a file and resolve every workload in one step.
    pub fn load(path: &Path) -> Result<Vec<WorkloadSpec>, ConfigError> {
        Self::from_file(path)?.resolve()
    }

    /// Resolve and validate every workload.
    pub fn resolve(&self) -> Result<Vec<WorkloadSpec>, ConfigError> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.workloads.len());
        for workload in &self.workloads {
            let spec = workload.resolve()?;
            if !seen.insert(spec.id.clone()) {
                return Err(ConfigError::DuplicateWorkload(spec.id));
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    /// Scaffold a single-workload config with one memory-based rule.
    pub fn scaffold(id: &str) -> Self {
        let mem = |v: u64| Some(CapacityVector::single("memory", v));
        ScaleConfig {
            workloads: vec![WorkloadConfig {
                id: id.to_string(),
                zone_sets: Some(vec!["zone-a".to_string(), "zone-b".to_string()]),
                total_max: mem(4096),
                total_min: mem(1024),
                cooldown: Some(CooldownConfig {
                    add: Some("2m".to_string()),
                    remove: Some("5m".to_string()),
                }),
                policy: Some(PolicyConfig {
                    initial: mem(1024),
                    increase_step: mem(512),
                    decrease_step: mem(256),
                    max_capacity: mem(2048),
                    min_capacity: mem(512),
                    rules: vec![RuleConfig {
                        metric: Some("heap_used_pct".to_string()),
                        aggregation: Some(Aggregation::Avg),
                        window: Some("5m".to_string()),
                        zone: None,
                        instance: None,
                        low: Some(StatValue::Integer(20)),
                        high: Some(StatValue::Integer(80)),
                    }],
                }),
            }],
        }
    }
}

impl WorkloadConfig {
    pub fn resolve(&self) -> Result<WorkloadSpec, ConfigError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ConfigError::EmptyWorkloadId);
        }
        let missing = |field: &'static str| ConfigError::MissingField {
            workload: id.to_string(),
            field,
        };

        let zone_sets: Vec<ZoneSet> = match &self.zone_sets {
            None => vec![ZoneSet::default_set()],
            Some(raw) => {
                let mut set = BTreeSet::new();
                for value in raw {
                    let zs = value.parse::<ZoneSet>().map_err(|source| ConfigError::ZoneSet {
                        workload: id.to_string(),
                        value: value.clone(),
                        source,
                    })?;
                    set.insert(zs);
                }
                if set.is_empty() {
                    return Err(missing("zone_sets"));
                }
                set.into_iter().collect()
            }
        };

        let policy_cfg = self.policy.as_ref().ok_or_else(|| missing("policy"))?;
        let mut rules = Vec::with_capacity(policy_cfg.rules.len());
        for rule in &policy_cfg.rules {
            rules.push(rule.resolve(id)?);
        }

        let policy = AutoScalingPolicy {
            current: policy_cfg.initial.clone().ok_or_else(|| missing("policy.initial"))?,
            rules,
            increase_step: policy_cfg
                .increase_step
                .clone()
                .ok_or_else(|| missing("policy.increase_step"))?,
            decrease_step: policy_cfg
                .decrease_step
                .clone()
                .ok_or_else(|| missing("policy.decrease_step"))?,
            max_capacity: policy_cfg
                .max_capacity
                .clone()
                .ok_or_else(|| missing("policy.max_capacity"))?,
            min_capacity: policy_cfg
                .min_capacity
                .clone()
                .ok_or_else(|| missing("policy.min_capacity"))?,
        };
        policy.validate().map_err(|source| ConfigError::Policy {
            workload: id.to_string(),
            source,
        })?;

        let n = zone_sets.len();
        let total_max = self
            .total_max
            .clone()
            .unwrap_or_else(|| std::iter::repeat_n(&policy.max_capacity, n).sum());
        let total_min = self
            .total_min
            .clone()
            .unwrap_or_else(|| std::iter::repeat_n(&policy.min_capacity, n).sum());

        let mut cooldown = CooldownWindows::default();
        if let Some(cfg) = &self.cooldown {
            if let Some(add) = &cfg.add {
                cooldown.add = parse_duration(id, "cooldown.add", add)?;
            }
            if let Some(remove) = &cfg.remove {
                cooldown.remove = parse_duration(id, "cooldown.remove", remove)?;
            }
        }

        Ok(WorkloadSpec {
            id: id.to_string(),
            zone_sets,
            total_max,
            total_min,
            cooldown,
            policy,
        })
    }
}

impl RuleConfig {
    fn resolve(&self, workload: &str) -> Result<ScalingRule, ConfigError> {
        let missing = |field: &'static str| ConfigError::MissingField {
            workload: workload.to_string(),
            field,
        };

        let window = match &self.window {
            Some(w) => parse_duration(workload, "rule.window", w)?,
            None => return Err(missing("rule.window")),
        };
        let mut statistic = StatisticId::new(
            self.metric.clone().ok_or_else(|| missing("rule.metric"))?,
            self.aggregation.ok_or_else(|| missing("rule.aggregation"))?,
            window,
        );
        if let Some(zone) = &self.zone {
            statistic.zone = Some(zone.parse().map_err(|source| ConfigError::ZoneSet {
                workload: workload.to_string(),
                value: zone.clone(),
                source,
            })?);
        }
        statistic.instance = self.instance.clone();

        Ok(ScalingRule {
            statistic,
            low: self.low.clone().ok_or_else(|| missing("rule.low"))?,
            high: self.high.clone().ok_or_else(|| missing("rule.high"))?,
        })
    }
}

fn parse_duration(workload: &str, field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    duration::parse(value).map_err(|e| ConfigError::InvalidDuration {
        workload: workload.to_string(),
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[workload]]
id = "default/api"
zone_sets = ["us-east-1b", "us-east-1a"]
total_max = { memory = 4096 }

[workload.cooldown]
add = "30s"

[workload.policy]
initial = { memory = 1000 }
increase_step = { memory = 500 }
decrease_step = { memory = 250 }
max_capacity = { memory = 2048 }
min_capacity = { memory = 512 }

[[workload.policy.rule]]
metric = "heap_used_pct"
aggregation = "avg"
window = "5m"
zone = "us-east-1a"
low = 20
high = 80.5
"#;

    #[test]
    fn test_parse_and_resolve() {
        let specs = ScaleConfig::from_toml_str(SAMPLE).unwrap().resolve().unwrap();
        assert_eq!(specs.len(), 1);

        let spec = &specs[0];
        assert_eq!(spec.id, "default/api");
        assert_eq!(
            spec.zone_sets.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["us-east-1a", "us-east-1b"]
        );
        assert_eq!(spec.total_max, CapacityVector::single("memory", 4096));
        // total_min defaults to per-zone minimum times zone-set count.
        assert_eq!(spec.total_min, CapacityVector::single("memory", 1024));
        assert_eq!(spec.cooldown.add, Duration::from_secs(30));
        assert_eq!(spec.cooldown.remove, DEFAULT_REMOVE_COOLDOWN);

        let rule = &spec.policy.rules[0];
        assert_eq!(rule.statistic.window, Duration::from_secs(300));
        assert_eq!(rule.statistic.zone, Some("us-east-1a".parse().unwrap()));
        assert_eq!(rule.low, StatValue::Integer(20));
        assert_eq!(rule.high, StatValue::Float(80.5));
    }

    #[test]
    fn test_missing_policy_field_is_named() {
        let toml_str = SAMPLE.replace("increase_step = { memory = 500 }\n", "");
        let err = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "policy.increase_step", .. }
        ));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let toml_str = SAMPLE.replace("decrease_step = { memory = 250 }", "decrease_step = { memory = 0 }");
        let err = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy { source: PolicyError::ZeroDecreaseStep, .. }
        ));
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let toml_str = SAMPLE.replace("low = 20", "low = 90");
        let err = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy { source: PolicyError::InvertedThresholds(_), .. }
        ));
    }

    #[test]
    fn test_bad_duration_is_an_error() {
        let toml_str = SAMPLE.replace("add = \"30s\"", "add = \"soon\"");
        let err = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { field: "cooldown.add", .. }));
    }

    #[test]
    fn test_duplicate_workloads_rejected() {
        let toml_str = format!("{SAMPLE}\n{}", &SAMPLE[SAMPLE.find("[[workload]]").unwrap()..]);
        let err = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateWorkload(id) if id == "default/api"));
    }

    #[test]
    fn test_default_zone_set() {
        let toml_str = SAMPLE.replace("zone_sets = [\"us-east-1b\", \"us-east-1a\"]\n", "");
        let specs = ScaleConfig::from_toml_str(&toml_str).unwrap().resolve().unwrap();
        assert_eq!(specs[0].zone_sets, vec![ZoneSet::default_set()]);
    }

    #[test]
    fn test_scaffold_resolves() {
        let config = ScaleConfig::scaffold("default/web");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("default/web"));

        let reparsed = ScaleConfig::from_toml_str(&toml_str).unwrap();
        let specs = reparsed.resolve().unwrap();
        assert_eq!(specs[0].zone_sets.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let specs = ScaleConfig::load(file.path()).unwrap();
        assert_eq!(specs[0].policy.current, CapacityVector::single("memory", 1000));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ScaleConfig::from_file(Path::new("/nonexistent/zonescale.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/zonescale.toml"));
    }
}
