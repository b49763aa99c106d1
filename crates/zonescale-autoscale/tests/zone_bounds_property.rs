//! Property tests for zone-partitioned bounds.
//!
//! However last-enforced and planned capacity are spread across zone sets,
//! no zone set may exceed the per-zone ceiling, and zone sets that each take
//! up to their computed maximum in turn never sum past the global ceiling.

use proptest::prelude::*;

use zonescale_autoscale::ZoneBoundCalculator;
use zonescale_core::{CapacityByZoneSet, CapacityVector, ZoneSet};

const DIMS: [&str; 2] = ["memory", "cpu"];

fn zone_sets(n: usize) -> Vec<ZoneSet> {
    (0..n)
        .map(|i| format!("zone-{i}").parse().unwrap())
        .collect()
}

fn capacity() -> impl Strategy<Value = CapacityVector> {
    (0u64..5_000, 0u64..64).prop_map(|(m, c)| CapacityVector::from_pairs([(DIMS[0], m), (DIMS[1], c)]))
}

fn scaled(v: &CapacityVector, pct: u64) -> CapacityVector {
    CapacityVector::from_pairs(DIMS.iter().map(|d| (*d, v.get(d) * pct / 100)))
}

proptest! {
    #[test]
    fn maximum_never_exceeds_per_zone_ceiling(
        n in 1usize..6,
        total_max in capacity(),
        per_zone_max in capacity(),
        last in prop::collection::vec(capacity(), 6),
        planned in prop::collection::vec(capacity(), 6),
    ) {
        let zones = zone_sets(n);
        let last: CapacityByZoneSet = zones.iter().cloned().zip(last).collect();
        let planned: CapacityByZoneSet = zones.iter().cloned().zip(planned).collect();
        let calc = ZoneBoundCalculator::new(&zones, &last, &planned);

        for zone in &zones {
            let maximum = calc.maximum_for(zone, &total_max, &per_zone_max);
            prop_assert!(maximum.first_exceeding(&per_zone_max).is_none());
            prop_assert!(maximum.first_exceeding(&total_max).is_none());
        }
    }

    #[test]
    fn sequential_decisions_stay_under_total(
        n in 1usize..6,
        total_max in capacity(),
        per_zone_max in capacity(),
        last in prop::collection::vec(capacity(), 6),
        take_pct in prop::collection::vec(0u64..=100, 6),
    ) {
        let zones = zone_sets(n);
        let last: CapacityByZoneSet = zones.iter().cloned().zip(last).collect();
        let mut planned = CapacityByZoneSet::new();

        for (zone, pct) in zones.iter().zip(&take_pct) {
            let maximum = ZoneBoundCalculator::new(&zones, &last, &planned)
                .maximum_for(zone, &total_max, &per_zone_max);
            planned.set(zone.clone(), scaled(&maximum, *pct));
        }

        prop_assert!(planned.total().first_exceeding(&total_max).is_none());
    }

    #[test]
    fn minimum_never_below_per_zone_floor(
        n in 1usize..6,
        total_min in capacity(),
        per_zone_min in capacity(),
        last in prop::collection::vec(capacity(), 6),
        planned in prop::collection::vec(capacity(), 6),
    ) {
        let zones = zone_sets(n);
        let last: CapacityByZoneSet = zones.iter().cloned().zip(last).collect();
        let planned: CapacityByZoneSet = zones.iter().cloned().zip(planned).collect();
        let calc = ZoneBoundCalculator::new(&zones, &last, &planned);

        for zone in &zones {
            let minimum = calc.minimum_for(zone, &total_min, &per_zone_min);
            prop_assert!(per_zone_min.first_exceeding(&minimum).is_none());
        }
    }
}
