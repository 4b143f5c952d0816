//! Run logging.
//!
//! Fire-and-forget submission of each run's generated script and outcome
//! summary, for offline inspection. Submission happens after the scene has
//! already mutated, so a failing sink must never fail the run: errors are
//! logged and swallowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::dispatch::RunOutcome;

/// One run, as recorded.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    /// The generated script text that was executed.
    pub script: String,
    pub executed: usize,
    pub failures: usize,
    /// Name of the command the run halted on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_on: Option<String>,
}

impl RunRecord {
    pub fn new(script: impl Into<String>, outcome: &RunOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            script: script.into(),
            executed: outcome.executed,
            failures: outcome.failures.len(),
            halted_on: outcome.halted.as_ref().map(|h| h.name.clone()),
        }
    }
}

/// A sink for run records. Best effort by contract.
pub trait RunLog {
    fn submit(&self, record: &RunRecord);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullRunLog;

impl RunLog for NullRunLog {
    fn submit(&self, _record: &RunRecord) {}
}

/// Appends records as JSON lines to a file.
#[derive(Debug, Clone)]
pub struct FileRunLog {
    path: PathBuf,
}

impl FileRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_submit(&self, record: &RunRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl RunLog for FileRunLog {
    fn submit(&self, record: &RunRecord) {
        if let Err(e) = self.try_submit(record) {
            // The run already happened locally; losing the record is fine.
            log::warn!("run log write to {:?} failed: {e}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::UnknownCommand;

    #[test]
    fn test_record_summarizes_outcome() {
        let outcome = RunOutcome {
            executed: 2,
            failures: vec![],
            halted: Some(UnknownCommand {
                index: 2,
                name: "launchFireworks".to_string(),
            }),
        };
        let record = RunRecord::new("moveForward(1.0);\n", &outcome);
        assert_eq!(record.executed, 2);
        assert_eq!(record.failures, 0);
        assert_eq!(record.halted_on.as_deref(), Some("launchFireworks"));
    }

    #[test]
    fn test_file_log_appends_json_lines() {
        let path = std::env::temp_dir().join(format!(
            "blockstage-runlog-test-{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let log = FileRunLog::new(&path);
        let outcome = RunOutcome::default();
        log.submit(&RunRecord::new("turnLeft();\n", &outcome));
        log.submit(&RunRecord::new("turnRight();\n", &outcome));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("\"script\"")));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_log_swallows_errors() {
        // A directory path cannot be opened for append; submit must not panic.
        let log = FileRunLog::new(std::env::temp_dir());
        log.submit(&RunRecord::new("", &RunOutcome::default()));
    }
}
