//! zonescale-core: value types and configuration for ZoneScale.
//!
//! - **`capacity`**: `CapacityVector`, the multi-dimensional resource amount
//! - **`zone`**: canonical `ZoneSet` ids and `CapacityByZoneSet`
//! - **`stats`**: statistic ids, values, snapshots, and membership
//! - **`policy`**: `ScalingRule` and validated `AutoScalingPolicy`
//! - **`config`**: `zonescale.toml` parsing

pub mod capacity;
pub mod config;
pub mod duration;
pub mod policy;
pub mod stats;
pub mod zone;

pub use capacity::CapacityVector;
pub use config::{ConfigError, CooldownWindows, ScaleConfig, WorkloadSpec};
pub use policy::{AutoScalingPolicy, PolicyError, ScalingRule};
pub use stats::{
    Aggregation, CompareError, InstanceId, Membership, StatValue, StatisticId, StatisticSample,
    StatisticsSnapshot,
};
pub use zone::{CapacityByZoneSet, ZoneSet, ZoneSetError};
