//! Zone-set identifiers and per-zone-set capacity maps.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capacity::CapacityVector;

/// Errors produced while parsing a zone-set identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneSetError {
    #[error("zone set must name at least one zone")]
    Empty,
    #[error("zone name may not be blank in {0:?}")]
    BlankZone(String),
}

/// A canonical set of zone tags a group of instances is constrained to.
///
/// Zones are trimmed, sorted, and de-duplicated, so `"b,a"` and `"a, b, a"`
/// are the same zone set. The textual form joins zones with `,`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneSet(BTreeSet<String>);

impl ZoneSet {
    /// Build a zone set from individual zone names.
    pub fn new<I, S>(zones: I) -> Result<Self, ZoneSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for zone in zones {
            let zone = zone.as_ref().trim();
            if zone.is_empty() {
                return Err(ZoneSetError::BlankZone(zone.to_string()));
            }
            set.insert(zone.to_string());
        }
        if set.is_empty() {
            return Err(ZoneSetError::Empty);
        }
        Ok(Self(set))
    }

    /// The zone set used when a workload does not partition by zone.
    pub fn default_set() -> Self {
        Self(BTreeSet::from(["default".to_string()]))
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.0.contains(zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for ZoneSet {
    type Err = ZoneSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ZoneSetError::Empty);
        }
        let mut set = BTreeSet::new();
        for zone in s.split(',') {
            let zone = zone.trim();
            if zone.is_empty() {
                return Err(ZoneSetError::BlankZone(s.to_string()));
            }
            set.insert(zone.to_string());
        }
        Ok(Self(set))
    }
}

impl TryFrom<String> for ZoneSet {
    type Error = ZoneSetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ZoneSet> for String {
    fn from(z: ZoneSet) -> Self {
        z.to_string()
    }
}

impl fmt::Display for ZoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.zones().collect();
        f.write_str(&joined.join(","))
    }
}

/// Capacity allocated to each zone set.
///
/// Used both for the capacity last enforced by the provisioner and for the
/// capacity other zone sets have planned during the current cycle. Zone sets
/// without an entry hold zero capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityByZoneSet {
    entries: HashMap<ZoneSet, CapacityVector>,
}

impl CapacityByZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity for `zone_set`, or zero when it has no entry.
    pub fn get(&self, zone_set: &ZoneSet) -> CapacityVector {
        self.entries.get(zone_set).cloned().unwrap_or_default()
    }

    /// Record the capacity for `zone_set`, replacing any previous entry.
    pub fn set(&mut self, zone_set: ZoneSet, capacity: CapacityVector) {
        self.entries.insert(zone_set, capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, zone_set: &ZoneSet) -> bool {
        self.entries.contains_key(zone_set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneSet, &CapacityVector)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of capacity across all zone sets.
    pub fn total(&self) -> CapacityVector {
        self.entries.values().sum()
    }
}

impl FromIterator<(ZoneSet, CapacityVector)> for CapacityByZoneSet {
    fn from_iter<I: IntoIterator<Item = (ZoneSet, CapacityVector)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
