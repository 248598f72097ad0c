//! JSONL transmission log writer
//!
//! The active file is rotated once it holds `max_records_per_file` records:
//! `transmissions.jsonl` becomes `transmissions.jsonl.1`, older files shift
//! up by one and anything past `max_files_to_keep` is deleted.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::Result;

use super::types::TransmissionRecord;

/// Size limits for the log files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_records_per_file: usize,
    pub max_files_to_keep: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_records_per_file: 10_000,
            max_files_to_keep: 10,
        }
    }
}

impl From<&TelemetryConfig> for RotationPolicy {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
        }
    }
}

/// Append-only JSON Lines log of transmissions
#[derive(Debug)]
pub struct TransmissionLog {
    path: PathBuf,
    writer: BufWriter<File>,
    policy: RotationPolicy,
    records_in_file: usize,
    records_written: u64,
}

impl TransmissionLog {
    /// Open (or create) the log file with the default rotation policy
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_rotation(path, RotationPolicy::default())
    }

    /// Open (or create) the log file, creating parent directories as needed
    ///
    /// Records already in the file count towards its rotation limit.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or read
    pub fn open_with_rotation<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let records_in_file = count_records(&path)?;
        let file = open_append(&path)?;
        info!(
            "Transmission log: {} ({} existing records)",
            path.display(),
            records_in_file
        );

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            policy,
            records_in_file,
            records_written: 0,
        })
    }

    /// Append one record and flush it to disk, rotating first if the file is full
    ///
    /// # Errors
    ///
    /// Returns error if rotation, serialization or the write fails
    pub fn record(&mut self, record: &TransmissionRecord) -> Result<()> {
        if self.records_in_file >= self.policy.max_records_per_file {
            self.rotate()?;
        }

        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records_in_file += 1;
        self.records_written += 1;
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.writer.flush()?;

        let keep = self.policy.max_files_to_keep;
        remove_if_exists(&rotated_path(&self.path, keep))?;
        for index in (1..keep).rev() {
            let from = rotated_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, rotated_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, rotated_path(&self.path, 1))?;

        self.writer = BufWriter::new(open_append(&self.path)?);
        self.records_in_file = 0;
        debug!("Rotated transmission log {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written through this handle
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Records in the active file
    pub fn records_in_file(&self) -> usize {
        self.records_in_file
    }
}

/// `path` with `.index` appended to its file name
fn rotated_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn count_records(path: &Path) -> Result<usize> {
    match fs::read(path) {
        Ok(contents) => Ok(contents.iter().filter(|&&byte| byte == b'\n').count()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shocker::encoder::encode_frame;
    use crate::shocker::protocol::{Channel, Command, Mode};
    use crate::subghz::session::TransmitOutcome;
    use tempfile::TempDir;

    fn record(strength: u8) -> TransmissionRecord {
        let command = Command::new(Channel::Ch01, Mode::Shock, strength);
        let frame = encode_frame(Channel::Ch01, Mode::Shock, strength);
        TransmissionRecord::from_outcome(
            &command,
            &frame,
            &TransmitOutcome::Completed { polls: 1, actual_frequency_hz: 433_950_000 },
        )
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/transmissions.jsonl");

        let log = TransmissionLog::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
        assert_eq!(log.records_written(), 0);
    }

    #[test]
    fn test_records_are_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transmissions.jsonl");

        let mut log = TransmissionLog::open(&path).unwrap();
        log.record(&record(10)).unwrap();
        log.record(&record(99)).unwrap();
        assert_eq!(log.records_written(), 2);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["strength"], 10);
        assert_eq!(first["frame"], "DD C8 01 0A B0");
        assert_eq!(first["outcome"], "completed");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["frame"], "DD C8 01 63 09");
    }

    fn strengths(path: &Path) -> Vec<u64> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["strength"].as_u64().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_rotation_keeps_newest_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transmissions.jsonl");
        let policy = RotationPolicy {
            max_records_per_file: 2,
            max_files_to_keep: 2,
        };

        let mut log = TransmissionLog::open_with_rotation(&path, policy).unwrap();
        for strength in 1..=7 {
            log.record(&record(strength)).unwrap();
        }

        assert_eq!(log.records_written(), 7);
        assert_eq!(log.records_in_file(), 1);
        assert_eq!(strengths(&path), vec![7]);
        assert_eq!(strengths(&rotated_path(&path, 1)), vec![5, 6]);
        assert_eq!(strengths(&rotated_path(&path, 2)), vec![3, 4]);
        assert!(!rotated_path(&path, 3).exists());
    }

    #[test]
    fn test_reopen_counts_existing_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transmissions.jsonl");
        let policy = RotationPolicy {
            max_records_per_file: 2,
            max_files_to_keep: 5,
        };

        for strength in 1..=3 {
            TransmissionLog::open_with_rotation(&path, policy)
                .unwrap()
                .record(&record(strength))
                .unwrap();
        }

        assert_eq!(strengths(&rotated_path(&path, 1)), vec![1, 2]);
        assert_eq!(strengths(&path), vec![3]);
    }

    #[test]
    fn test_rotated_path() {
        let path = Path::new("logs/transmissions.jsonl");
        assert_eq!(rotated_path(path, 3), PathBuf::from("logs/transmissions.jsonl.3"));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transmissions.jsonl");

        TransmissionLog::open(&path).unwrap().record(&record(1)).unwrap();
        TransmissionLog::open(&path).unwrap().record(&record(2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
