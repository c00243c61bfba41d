//! Persistence reporters
//!
//! A reporter is the only channel through which persistence outcomes are
//! observed. Strategies call it synchronously while they run; nothing is
//! returned to the caller of `persist`.

use crate::domain::Artifact;
use parking_lot::Mutex;
use serde::Serialize;

/// Receives persistence outcomes
pub trait PersistenceReporter: Send + Sync {
    /// The artifact was durably written to `locations`
    fn persisted(&self, artifact: &Artifact, locations: &[String]);

    /// Informational message
    fn info(&self, message: &str);

    /// Something went wrong; the artifact may not have been written
    fn issue(&self, message: &str);
}

/// Snapshot of everything a [`CollectingReporter`] has seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceReport {
    pub infos: Vec<String>,
    pub issues: Vec<String>,
    pub locations: Vec<String>,
}

impl PersistenceReport {
    /// Whether any issue was reported
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Thread-safe reporter that records every call
///
/// Used per interaction so the outcome can be attached to the response,
/// and in tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    report: Mutex<PersistenceReport>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.report.lock().infos.clone()
    }

    pub fn issues(&self) -> Vec<String> {
        self.report.lock().issues.clone()
    }

    pub fn locations(&self) -> Vec<String> {
        self.report.lock().locations.clone()
    }

    /// Copies the current state
    pub fn snapshot(&self) -> PersistenceReport {
        self.report.lock().clone()
    }

    /// Consumes the reporter and returns what it recorded
    pub fn into_report(self) -> PersistenceReport {
        self.report.into_inner()
    }
}

impl PersistenceReporter for CollectingReporter {
    fn persisted(&self, _artifact: &Artifact, locations: &[String]) {
        self.report.lock().locations.extend_from_slice(locations);
    }

    fn info(&self, message: &str) {
        self.report.lock().infos.push(message.to_string());
    }

    fn issue(&self, message: &str) {
        self.report.lock().issues.push(message.to_string());
    }
}

/// Reporter that forwards every call to `tracing`
#[derive(Debug, Clone)]
pub struct TracingReporter {
    source: String,
}

impl TracingReporter {
    /// `source` is attached to every event (e.g. a CLI command or listener name)
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl PersistenceReporter for TracingReporter {
    fn persisted(&self, artifact: &Artifact, locations: &[String]) {
        tracing::info!(
            source = %self.source,
            artifact_id = %artifact.id(),
            namespace = artifact.namespace(),
            locations = ?locations,
            "Artifact persisted"
        );
    }

    fn info(&self, message: &str) {
        tracing::info!(source = %self.source, "{message}");
    }

    fn issue(&self, message: &str) {
        tracing::warn!(source = %self.source, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactId;

    fn artifact() -> Artifact {
        Artifact::new(ArtifactId::new("a-1").unwrap(), "test", "{}", None)
    }

    #[test]
    fn test_collecting_reporter_records_in_order() {
        let reporter = CollectingReporter::new();
        reporter.info("first");
        reporter.issue("broken");
        reporter.persisted(&artifact(), &["/tmp/a".to_string(), "/tmp/b".to_string()]);
        reporter.info("second");

        assert_eq!(reporter.infos(), vec!["first", "second"]);
        assert_eq!(reporter.issues(), vec!["broken"]);
        assert_eq!(reporter.locations(), vec!["/tmp/a", "/tmp/b"]);

        let report = reporter.into_report();
        assert!(report.has_issues());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = PersistenceReport {
            infos: vec!["ok".to_string()],
            ..Default::default()
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["infos"][0], "ok");
        assert!(value["issues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        let reporter = TracingReporter::new("unit-test");
        reporter.info("hello");
        reporter.issue("problem");
        reporter.persisted(&artifact(), &["mem://x".to_string()]);
    }
}
