//! Statistic identifiers, observed values, and workload membership.
//!
//! Statistics arrive already aggregated from the metrics pipeline. Each
//! sample records which instances contributed to it so the evaluator can
//! decide whether the aggregate covers the instances a rule cares about.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::zone::ZoneSet;

/// Unique identifier for a compute instance of a workload.
pub type InstanceId = String;

/// How raw samples were folded into a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Sum,
    Count,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
        };
        f.write_str(s)
    }
}

/// Identifies one aggregated statistic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatisticId {
    pub metric: String,
    pub aggregation: Aggregation,
    /// Aggregation window.
    #[serde(with = "crate::duration::serde_str")]
    pub window: Duration,
    /// Restrict to a single instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
    /// Restrict to instances placed in these zones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneSet>,
}

impl StatisticId {
    /// A workload-wide statistic.
    pub fn new(metric: impl Into<String>, aggregation: Aggregation, window: Duration) -> Self {
        Self {
            metric: metric.into(),
            aggregation,
            window,
            instance: None,
            zone: None,
        }
    }

    pub fn with_zone(mut self, zone: ZoneSet) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn with_instance(mut self, instance: impl Into<InstanceId>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl fmt::Display for StatisticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})[{}]",
            self.aggregation,
            self.metric,
            crate::duration::format(self.window)
        )?;
        if let Some(zone) = &self.zone {
            write!(f, " zone={zone}")?;
        }
        if let Some(instance) = &self.instance {
            write!(f, " instance={instance}")?;
        }
        Ok(())
    }
}

/// A statistic value or a rule threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A value and a threshold that cannot be ordered against each other.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompareError {
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),
    #[error("values {0} and {1} have no ordering")]
    Unordered(f64, f64),
}

impl StatValue {
    /// Numeric view of the value, parsing text if needed.
    pub fn as_f64(&self) -> Result<f64, CompareError> {
        match self {
            StatValue::Integer(i) => Ok(*i as f64),
            StatValue::Float(x) => Ok(*x),
            StatValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CompareError::NotNumeric(s.clone())),
        }
    }

    /// Order `self` against `other`.
    ///
    /// Values of the same kind compare natively (text compares
    /// lexicographically); mixed kinds are both coerced to `f64`.
    pub fn compare(&self, other: &StatValue) -> Result<Ordering, CompareError> {
        match (self, other) {
            (StatValue::Integer(a), StatValue::Integer(b)) => Ok(a.cmp(b)),
            (StatValue::Text(a), StatValue::Text(b)) => Ok(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b).ok_or(CompareError::Unordered(a, b))
            }
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Integer(i) => write!(f, "{i}"),
            StatValue::Float(x) => write!(f, "{x}"),
            StatValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// One aggregated statistic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticSample {
    pub statistic: StatisticId,
    pub value: StatValue,
    /// Instances whose raw samples went into the aggregate.
    #[serde(default)]
    pub contributors: BTreeSet<InstanceId>,
}

/// The statistics available to one evaluation, keyed by statistic id.
///
/// Serialized as a list of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<StatisticSample>", into = "Vec<StatisticSample>")]
pub struct StatisticsSnapshot {
    samples: HashMap<StatisticId, StatisticSample>,
}

impl StatisticsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sample.
    pub fn insert(&mut self, sample: StatisticSample) {
        self.samples.insert(sample.statistic.clone(), sample);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_sample<I, S>(mut self, statistic: StatisticId, value: impl Into<StatValue>, contributors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InstanceId>,
    {
        self.insert(StatisticSample {
            statistic,
            value: value.into(),
            contributors: contributors.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn get(&self, statistic: &StatisticId) -> Option<&StatisticSample> {
        self.samples.get(statistic)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<StatisticSample>> for StatisticsSnapshot {
    fn from(samples: Vec<StatisticSample>) -> Self {
        let mut snapshot = Self::new();
        for sample in samples {
            snapshot.insert(sample);
        }
        snapshot
    }
}

impl From<StatisticsSnapshot> for Vec<StatisticSample> {
    fn from(snapshot: StatisticsSnapshot) -> Self {
        let mut samples: Vec<StatisticSample> = snapshot.samples.into_values().collect();
        samples.sort_by_key(|s| s.statistic.to_string());
        samples
    }
}

/// Current instances of a workload and the zone each one runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Membership {
    instances: BTreeMap<InstanceId, String>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: impl Into<InstanceId>, zone: impl Into<String>) {
        self.instances.insert(instance.into(), zone.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_instance(mut self, instance: impl Into<InstanceId>, zone: impl Into<String>) -> Self {
        self.insert(instance, zone);
        self
    }

    pub fn zone_of(&self, instance: &str) -> Option<&str> {
        self.instances.get(instance).map(String::as_str)
    }

    pub fn instance_ids(&self) -> BTreeSet<InstanceId> {
        self.instances.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Known instances that fall inside the scope of `statistic`.
    pub fn instances_in_scope(&self, statistic: &StatisticId) -> BTreeSet<&str> {
        self.instances
            .iter()
            .filter(|(id, zone)| {
                statistic.instance.as_deref().is_none_or(|want| want == id.as_str())
                    && statistic.zone.as_ref().is_none_or(|zs| zs.contains(zone))
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
