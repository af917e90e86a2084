//! JSON observer for serializing benchmark runs.
//!
//! This module provides [`JsonObserver`], which serializes validated runs to
//! JSON through the [`SuiteSnapshot`] format.
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! scorte = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use scorte::observers::json::JsonObserver;
//!
//! let json = JsonObserver::new()
//!     .pretty(true)
//!     .with_scenario("low")
//!     .to_json(reports.iter())?;
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use crate::observers::{ObserverError, Result};
use crate::snapshot::SuiteSnapshot;
use crate::validate::ValidationReport;

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the output.
    pub pretty: bool,
    /// Whether to stamp the output with the current time.
    pub include_timestamp: bool,
    /// Scenario label attached to the output.
    pub scenario: Option<String>,
}

/// An observer that serializes benchmark runs to JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings (compact, no timestamp).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables the timestamp.
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Sets the scenario label.
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.config.scenario = Some(scenario.into());
        self
    }

    /// Builds the snapshot that [`to_json`](Self::to_json) serializes.
    pub fn snapshot<'a>(&self, reports: impl Iterator<Item = &'a ValidationReport>) -> SuiteSnapshot {
        let mut suite = SuiteSnapshot::collect(reports);
        if let Some(ref scenario) = self.config.scenario {
            suite = suite.with_scenario(scenario.clone());
        }
        if self.config.include_timestamp {
            suite = suite.with_timestamp(current_timestamp_ms());
        }
        suite
    }

    /// Serializes the reports to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json<'a>(&self, reports: impl Iterator<Item = &'a ValidationReport>) -> Result<String> {
        let suite = self.snapshot(reports);
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&suite)?
        } else {
            serde_json::to_string(&suite)?
        };
        Ok(json)
    }

    /// Serializes the reports into a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_writer<'a, W: std::io::Write>(
        &self,
        mut writer: W,
        reports: impl Iterator<Item = &'a ValidationReport>,
    ) -> Result<()> {
        let suite = self.snapshot(reports);
        let written = if self.config.pretty {
            serde_json::to_writer_pretty(&mut writer, &suite)
        } else {
            serde_json::to_writer(&mut writer, &suite)
        };
        written.map_err(|err| {
            if err.is_io() {
                ObserverError::Io(err.into())
            } else {
                ObserverError::Json(err)
            }
        })?;
        writer.flush()?;
        Ok(())
    }
}

/// Returns the current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::StrategyKind;
    use crate::result::tests::sample;

    #[test]
    fn test_to_json_compact() {
        let reports = [ValidationReport::new(sample())];
        let json = JsonObserver::new().to_json(reports.iter()).unwrap();
        assert!(json.starts_with(r#"{"runs":[{"strategy":"mutex""#));
        assert!(!json.contains('\n'));
        assert!(!json.contains("timestamp_ms"));
    }

    #[test]
    fn test_to_json_pretty_with_scenario() {
        let reports = [ValidationReport::new(sample())];
        let json = JsonObserver::new()
            .pretty(true)
            .with_scenario("low")
            .to_json(reports.iter())
            .unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains(r#""scenario": "low""#));
    }

    #[test]
    fn test_timestamp() {
        let reports = [ValidationReport::new(sample())];
        let suite = JsonObserver::new()
            .with_timestamp(true)
            .snapshot(reports.iter());
        assert!(suite.timestamp_ms.unwrap() > 0);
    }

    #[test]
    fn test_round_trip_via_writer() {
        let reports = [ValidationReport::new(sample())];
        let mut buffer = Vec::new();
        JsonObserver::new()
            .to_writer(&mut buffer, reports.iter())
            .unwrap();

        let suite: SuiteSnapshot = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(suite.runs.len(), 1);
        assert_eq!(suite.get(StrategyKind::Mutex).unwrap().totals.decrements, 1000);
    }

    struct Closed;

    impl std::io::Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_to_writer_io_failure() {
        let reports = [ValidationReport::new(sample())];
        match JsonObserver::new().to_writer(Closed, reports.iter()) {
            Err(ObserverError::Io(err)) => {
                assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe)
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
