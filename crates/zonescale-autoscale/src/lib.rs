//! zonescale-autoscale: threshold-driven capacity decisions per zone set.
//!
//! Evaluates scaling rules against aggregated statistics and decides whether
//! a workload's capacity should grow, shrink, or stay the same. Decisions are
//! suppressed while membership is settling (cooldown) and clamped to
//! conservative per-zone bounds so independently decided zone sets never
//! push the workload past its global ceiling or floor.
//!
//! # Decision Algorithm
//!
//! ```text
//! (below_low, above_high) = evaluate(rules, statistics)
//!
//! if both non-empty:       RuleConflict, no change
//! if above_high non-empty:
//!     target = min(current + increase_step, maximum)
//!     target == current  → Saturated
//! if below_low non-empty:
//!     target = max(current - decrease_step, minimum)   // floors at zero first
//!     target == current  → Unchanged (at minimum)
//! otherwise:               Unchanged
//! ```
//!
//! # Components
//!
//! - **`evaluator`**: classify rules as below-low / above-high
//! - **`cooldown`**: hysteresis after instances join or leave
//! - **`bounds`**: per-zone-set maximum/minimum from global bounds
//! - **`engine`**: `DecisionEngine`, the per-workload endpoint
//! - **`registry`**: one live endpoint per workload
//! - **`scheduler`**: tick loop wiring metrics, membership, and provisioning

pub mod bounds;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod registry;
pub mod scheduler;

pub use bounds::ZoneBoundCalculator;
pub use cooldown::{CooldownGate, CooldownStatus};
pub use engine::{Decision, DecisionEngine, ScaleDirection, UnchangedReason, ZoneCycle};
pub use error::{EnforceError, EnforceResult, ErrorKind};
pub use evaluator::{Evaluation, RuleBreach, evaluate_rules};
pub use registry::{EnforcementRegistry, RegistryError};
pub use scheduler::{
    MembershipDirectory, MetricsProvider, ProvisionCallback, ScaleScheduler, TickOutcome,
    epoch_millis,
};
