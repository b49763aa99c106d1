//! Printable results of an enforcement cycle.

use serde::Serialize;

use zonescale_autoscale::{Decision, EnforceResult, ErrorKind, ScaleDirection, UnchangedReason};
use zonescale_core::ZoneSet;

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// One zone set's outcome, with exactly one of `decision` or `error` set.
#[derive(Debug, Serialize)]
pub struct ZoneReport {
    pub zone_set: ZoneSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl ZoneReport {
    pub fn new(zone_set: ZoneSet, result: &EnforceResult<Decision>) -> Self {
        match result {
            Ok(decision) => Self {
                zone_set,
                decision: Some(decision.clone()),
                error: None,
            },
            Err(e) => Self {
                zone_set,
                decision: None,
                error: Some(ErrorReport {
                    kind: e.kind(),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                }),
            },
        }
    }

    pub fn to_text(&self) -> String {
        if let Some(decision) = &self.decision {
            return match decision {
                Decision::Applied { from, to, direction } => {
                    let (arrow, verb) = match direction {
                        ScaleDirection::Up => ("↑", "scale up"),
                        ScaleDirection::Down => ("↓", "scale down"),
                    };
                    format!("{arrow} {}: {verb} {from} -> {to}", self.zone_set)
                }
                Decision::Unchanged { capacity, reason } => {
                    let why = match reason {
                        UnchangedReason::WithinThresholds => "within thresholds",
                        UnchangedReason::AtMinimum => "already at minimum",
                    };
                    format!("= {}: {capacity} ({why})", self.zone_set)
                }
            };
        }
        match &self.error {
            Some(error) => {
                let marker = if error.retryable { "…" } else { "✗" };
                format!("{marker} {}: {}", self.zone_set, error.message)
            }
            None => format!("? {}: no result", self.zone_set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zonescale_autoscale::EnforceError;
    use zonescale_core::CapacityVector;

    fn mem(v: u64) -> CapacityVector {
        CapacityVector::single("memory", v)
    }

    #[test]
    fn applied_decision_renders_direction() {
        let report = ZoneReport::new(
            "zone-a".parse().unwrap(),
            &Ok(Decision::Applied {
                from: mem(1000),
                to: mem(1500),
                direction: ScaleDirection::Up,
            }),
        );
        let text = report.to_text();
        assert!(text.starts_with("↑ zone-a"));
        assert!(text.contains("-> {memory:1500}"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["decision"]["outcome"], "applied");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn errors_carry_kind_and_retryability() {
        let report = ZoneReport::new(
            "zone-a".parse().unwrap(),
            &Err(EnforceError::Cooldown {
                remaining: Duration::from_secs(30),
            }),
        );
        assert!(report.to_text().starts_with("… zone-a"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"]["kind"], "cooldown");
        assert_eq!(json["error"]["retryable"], true);
    }
}
