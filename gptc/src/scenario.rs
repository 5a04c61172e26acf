//! Scenario bookkeeping: one CSV-style line per scenario start.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario filename is empty")]
    MissingFilename,

    #[error("failed to write scenario results to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Appends `<filename>,<scenario_count>,<violation_count>` records.
#[derive(Debug, Clone)]
pub struct ScenarioLog {
    path: PathBuf,
}

impl ScenarioLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        filename: &str,
        scenario_count: u64,
        violation_count: u64,
    ) -> Result<(), ScenarioError> {
        let io_err = |source| ScenarioError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{},{},{}", filename, scenario_count, violation_count).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = ScenarioLog::new(dir.path().join("scenario_results.txt"));
        log.append("head_on.scn", 0, 0).unwrap();
        log.append("crossing.scn", 1, 12).unwrap();
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "head_on.scn,0,0\ncrossing.scn,1,12\n");
    }

    #[test]
    fn test_unwritable_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ScenarioLog::new(dir.path().join("missing").join("results.txt"));
        assert!(matches!(log.append("x", 0, 0), Err(ScenarioError::Io { .. })));
    }
}
