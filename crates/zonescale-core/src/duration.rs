//! Human-readable durations ("30s", "5m", "1h 30m") for config and wire types.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Parse a humantime duration string.
pub fn parse(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s.trim())
}

/// Format a duration the way [`parse`] accepts it.
pub fn format(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// `#[serde(with = "zonescale_core::duration::serde_str")]` for `Duration`
/// fields stored as humantime strings.
pub mod serde_str {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}
