//! Dead-letter file for batches that failed to persist
//!
//! Entries are written in JSONL format (one ProcessedAgentData per line)
//! to the configured file, so an operator can replay them later.

use crate::domain::types::ProcessedAgentData;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

pub struct DeadLetter {
    file_path: String,
}

impl DeadLetter {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "dead_letter_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write every entry of a failed batch to the dead-letter file.
    /// Returns the number of entries written.
    pub fn write_batch(&self, batch: &[ProcessedAgentData]) -> usize {
        let mut written = 0;
        for entry in batch {
            let json = match serde_json::to_string(entry) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "dead_letter_serialize_failed");
                    continue;
                }
            };

            match self.append_line(&json) {
                Ok(()) => written += 1,
                Err(e) => {
                    error!(file = %self.file_path, error = %e, "dead_letter_write_failed");
                }
            }
        }

        if written > 0 {
            info!(file = %self.file_path, entries = %written, "batch_dead_lettered");
        }
        written
    }

    /// Append a line to the dead-letter file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "dead_letter_written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccelerometerData, AgentData, GpsData, RoadState};
    use std::fs;
    use tempfile::tempdir;

    fn entry(seq: f64) -> ProcessedAgentData {
        ProcessedAgentData::new(
            RoadState::Bad,
            AgentData {
                accelerometer: AccelerometerData { x: seq, y: 0.0, z: 0.0 },
                gps: GpsData { latitude: 50.45, longitude: 30.52 },
                timestamp: "2024-03-15T14:34:20Z".parse().unwrap(),
            },
        )
    }

    #[test]
    fn test_write_batch() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dead_letter.jsonl");
        let dl = DeadLetter::new(file_path.to_str().unwrap());

        let batch = vec![entry(0.0), entry(1.0), entry(2.0)];
        assert_eq!(dl.write_batch(&batch), 3);

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        // Every line is a valid ProcessedAgentData, in drain order
        for (i, line) in lines.iter().enumerate() {
            let parsed: ProcessedAgentData = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.agent_data.accelerometer.x, i as f64);
        }
    }

    #[test]
    fn test_append_across_batches() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dead_letter.jsonl");
        let dl = DeadLetter::new(file_path.to_str().unwrap());

        dl.write_batch(&[entry(0.0)]);
        dl.write_batch(&[entry(1.0)]);

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("spool").join("dead_letter.jsonl");
        let dl = DeadLetter::new(nested.to_str().unwrap());

        assert_eq!(dl.write_batch(&[entry(0.0)]), 1);
        assert!(nested.exists());
    }
}
