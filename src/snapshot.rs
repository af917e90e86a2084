//! Snapshot types for serializing benchmark outcomes.
//!
//! [`RunSnapshot`] flattens a [`ValidationReport`] into a record with the
//! derived metrics precomputed, so consumers do not need this crate to read
//! them back. [`SuiteSnapshot`] groups the runs of one comparison.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! scorte = { version = "0.1", features = ["serde"] }
//! ```

use serde::{Deserialize, Serialize};

use crate::counter::{CorrectnessClass, Quantity, StrategyKind};
use crate::harness::Workload;
use crate::result::{ContentionLevel, Totals};
use crate::validate::{ValidationReport, Violation};

/// A flat, serializable view of one validated run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSnapshot {
    /// Strategy under test.
    pub strategy: StrategyKind,
    /// Class the run was validated against.
    pub class: CorrectnessClass,
    /// Operation mix.
    pub workload: Workload,
    /// Actors and operations per actor.
    pub level: ContentionLevel,
    /// Units per operation.
    pub amount: u32,
    /// Wall-clock duration in nanoseconds.
    pub elapsed_ns: u64,
    /// Outcome counts.
    pub totals: Totals,
    /// Quantity before the run.
    pub initial_quantity: Quantity,
    /// Quantity after the run.
    pub final_quantity: Quantity,
    /// Quantity a serializable execution would have produced.
    pub expected_quantity: Quantity,
    /// Updates lost to races.
    pub lost_updates: u64,
    /// Compare-and-swap retries.
    pub retries: u64,
    /// Recorded operations per second.
    pub throughput: f64,
    /// Broken invariants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl From<&ValidationReport> for RunSnapshot {
    fn from(report: &ValidationReport) -> Self {
        let result = &report.result;
        Self {
            strategy: result.strategy,
            class: report.class,
            workload: result.workload,
            level: result.level,
            amount: result.amount,
            elapsed_ns: u64::try_from(result.elapsed.as_nanos()).unwrap_or(u64::MAX),
            totals: result.totals,
            initial_quantity: result.initial_quantity,
            final_quantity: result.final_quantity,
            expected_quantity: result.expected_final(),
            lost_updates: result.lost_updates(),
            retries: result.retries,
            throughput: result.throughput(),
            violations: report.violations.clone(),
        }
    }
}

/// The runs of one comparison, with an optional label and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteSnapshot {
    /// Scenario label, e.g. a contention preset name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Optional timestamp in milliseconds since Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// One entry per run.
    pub runs: Vec<RunSnapshot>,
}

impl SuiteSnapshot {
    /// Collects snapshots from validated runs.
    pub fn collect<'a>(reports: impl Iterator<Item = &'a ValidationReport>) -> Self {
        Self {
            scenario: None,
            timestamp_ms: None,
            runs: reports.map(RunSnapshot::from).collect(),
        }
    }

    /// Sets the scenario label.
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Sets the timestamp.
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Finds the run of `strategy`.
    pub fn get(&self, strategy: StrategyKind) -> Option<&RunSnapshot> {
        self.runs.iter().find(|run| run.strategy == strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::tests::sample;
    use crate::result::RunResult;

    #[test]
    fn test_run_snapshot_from_report() {
        let report = ValidationReport::new(sample());
        let snapshot = RunSnapshot::from(&report);
        assert_eq!(snapshot.strategy, StrategyKind::Mutex);
        assert_eq!(snapshot.class, CorrectnessClass::Consistent);
        assert_eq!(snapshot.elapsed_ns, 20_000_000);
        assert_eq!(snapshot.expected_quantity, 0);
        assert!(snapshot.violations.is_empty());
    }

    #[test]
    fn test_suite_collect_and_get() {
        let reports = [
            ValidationReport::new(sample()),
            ValidationReport::new(RunResult {
                strategy: StrategyKind::Cas,
                ..sample()
            }),
        ];
        let suite = SuiteSnapshot::collect(reports.iter())
            .with_scenario("low")
            .with_timestamp(1234567890);

        assert_eq!(suite.runs.len(), 2);
        assert_eq!(suite.scenario.as_deref(), Some("low"));
        assert!(suite.get(StrategyKind::Cas).is_some());
        assert!(suite.get(StrategyKind::Monitor).is_none());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_serialize_violations() {
        let report = ValidationReport::new(RunResult {
            strategy: StrategyKind::Unsynchronized,
            final_quantity: -2,
            ..sample()
        });
        let json = serde_json::to_string(&RunSnapshot::from(&report)).unwrap();
        assert!(json.contains(r#""strategy":"unsynchronized""#));
        assert!(json.contains(r#""invariant":"negative-quantity""#));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_consistent_run_omits_violations() {
        let report = ValidationReport::new(sample());
        let json = serde_json::to_string(&RunSnapshot::from(&report)).unwrap();
        assert!(!json.contains("violations"));

        let back: RunSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.totals.decrements, 1000);
    }
}
