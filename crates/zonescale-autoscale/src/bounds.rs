//! Zone-partitioned capacity bounds.
//!
//! Each zone set decides its capacity independently, without a shared
//! transaction. To keep the workload total inside `[total_min, total_max]`
//! the bound for one zone set assumes every other zone set may end up at the
//! most (or least) capacity it could still claim:
//!
//! ```text
//! maximum_for(z) = min(per_zone_max, total_max - Σ other ceilings)
//!   ceiling(o)   = min(per_zone_max, max(last_enforced[o], new_planned[o]))
//!
//! minimum_for(z) = max(per_zone_min, total_min - Σ other floors)
//!   floor(o)     = max(last_enforced[o], per_zone_min)            if o has no plan yet
//!                = max(per_zone_min, min(last_enforced[o], new_planned[o]))  otherwise
//! ```
//!
//! Subtraction floors at zero per dimension.

use zonescale_core::{CapacityByZoneSet, CapacityVector, ZoneSet};

/// Computes per-zone-set bounds from the other zone sets' allocations.
#[derive(Debug, Clone, Copy)]
pub struct ZoneBoundCalculator<'a> {
    zone_sets: &'a [ZoneSet],
    last_enforced: &'a CapacityByZoneSet,
    new_planned: &'a CapacityByZoneSet,
}

impl<'a> ZoneBoundCalculator<'a> {
    pub fn new(
        zone_sets: &'a [ZoneSet],
        last_enforced: &'a CapacityByZoneSet,
        new_planned: &'a CapacityByZoneSet,
    ) -> Self {
        Self {
            zone_sets,
            last_enforced,
            new_planned,
        }
    }

    fn others<'b>(&'b self, zone_set: &'b ZoneSet) -> impl Iterator<Item = &'a ZoneSet> + 'b {
        self.zone_sets.iter().filter(move |o| *o != zone_set)
    }

    /// Largest capacity `zone_set` may be assigned.
    pub fn maximum_for(
        &self,
        zone_set: &ZoneSet,
        total_max: &CapacityVector,
        per_zone_max: &CapacityVector,
    ) -> CapacityVector {
        let reserved: CapacityVector = self
            .others(zone_set)
            .map(|other| {
                let claimed = self.last_enforced.get(other).max(&self.new_planned.get(other));
                per_zone_max.min(&claimed)
            })
            .sum();

        per_zone_max.min(&total_max.subtract_floor_zero(&reserved))
    }

    /// Smallest capacity `zone_set` may be assigned.
    pub fn minimum_for(
        &self,
        zone_set: &ZoneSet,
        total_min: &CapacityVector,
        per_zone_min: &CapacityVector,
    ) -> CapacityVector {
        let reserved: CapacityVector = self
            .others(zone_set)
            .map(|other| {
                let last = self.last_enforced.get(other);
                let planned = self.new_planned.get(other);
                if planned.equals_zero() {
                    last.max(per_zone_min)
                } else {
                    per_zone_min.max(&last.min(&planned))
                }
            })
            .sum();

        per_zone_min.max(&total_min.subtract_floor_zero(&reserved))
    }
}
