//! Enforcement error types.
//!
//! Every variant is a signal for the scheduler, not a crash: the workload
//! keeps its current capacity and the next tick evaluates again.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use zonescale_core::{CapacityVector, CompareError, PolicyError, StatValue, ZoneSet};

use crate::evaluator::RuleBreach;

/// Errors returned by a single enforcement.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnforceError {
    #[error("statistic {statistic} not yet available: {reason}")]
    NotYetAvailable { statistic: String, reason: String },

    #[error("cannot compare {statistic} value {value} with threshold {threshold}: {source}")]
    Format {
        statistic: String,
        value: StatValue,
        threshold: StatValue,
        source: CompareError,
    },

    #[error(
        "conflicting rules: below low [{}], above high [{}]",
        describe(.below_low),
        describe(.above_high)
    )]
    RuleConflict {
        below_low: Vec<RuleBreach>,
        above_high: Vec<RuleBreach>,
    },

    #[error("capacity {current} cannot grow past maximum {maximum}")]
    Saturated {
        current: CapacityVector,
        maximum: CapacityVector,
    },

    #[error("membership changed recently, cooldown for another {}", format_remaining(.remaining))]
    Cooldown { remaining: Duration },

    #[error("zone set {zone_set}: minimum {minimum} exceeds maximum {maximum} in {dimension:?}")]
    ConfigurationConflict {
        zone_set: ZoneSet,
        minimum: CapacityVector,
        maximum: CapacityVector,
        dimension: String,
    },

    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),
}

/// Coarse classification of an [`EnforceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Retryable,
    Format,
    RuleConflict,
    Saturation,
    Cooldown,
    Configuration,
    InvalidPolicy,
}

impl EnforceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnforceError::NotYetAvailable { .. } => ErrorKind::Retryable,
            EnforceError::Format { .. } => ErrorKind::Format,
            EnforceError::RuleConflict { .. } => ErrorKind::RuleConflict,
            EnforceError::Saturated { .. } => ErrorKind::Saturation,
            EnforceError::Cooldown { .. } => ErrorKind::Cooldown,
            EnforceError::ConfigurationConflict { .. } => ErrorKind::Configuration,
            EnforceError::InvalidPolicy(_) => ErrorKind::InvalidPolicy,
        }
    }

    /// Whether evaluating again on a later tick can succeed without an
    /// operator changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Retryable | ErrorKind::Cooldown)
    }
}

fn describe(breaches: &[RuleBreach]) -> String {
    breaches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_remaining(remaining: &Duration) -> String {
    zonescale_core::duration::format(*remaining)
}

pub type EnforceResult<T> = Result<T, EnforceError>;
