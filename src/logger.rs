use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GameError;
use crate::session::Session;
use crate::tier::Tier;

pub const DEFAULT_RESULTS_FILE: &str = "typing_game_results.csv";

const TELEMETRY_HEADER: [&str; 2] = ["Timestamp", "Sensor Value"];

/// One raw sensor token with the moment it arrived
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Local>,
    pub value: String,
}

impl TelemetryRecord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            value: value.into(),
        }
    }

    fn to_row(&self) -> [String; 2] {
        [
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            self.value.clone(),
        ]
    }
}

/// One line of the cumulative results log
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub started_at: DateTime<Local>,
    pub word: String,
    pub typed: String,
    pub duration: Duration,
    pub tier: Tier,
}

impl ResultRecord {
    pub fn from_session(session: &Session, duration: Duration) -> Self {
        Self {
            started_at: session.started_at(),
            word: session.word().to_string(),
            typed: session.typed(),
            duration,
            tier: Tier::from_secs(duration.as_secs_f64()),
        }
    }

    fn to_row(&self) -> [String; 5] {
        [
            self.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.word.clone(),
            self.typed.clone(),
            format!("{:.2}", self.duration.as_secs_f64()),
            self.tier.to_string(),
        ]
    }
}

/// Writes the results log and the per round sensor logs
#[derive(Debug, Clone)]
pub struct SessionLogger {
    results_path: PathBuf,
    telemetry_dir: PathBuf,
}

impl SessionLogger {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(results_path: P, telemetry_dir: Q) -> Self {
        Self {
            results_path: results_path.as_ref().to_path_buf(),
            telemetry_dir: telemetry_dir.as_ref().to_path_buf(),
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Sensor log name for a round, derived from its start time
    pub fn telemetry_path(&self, started_at: DateTime<Local>) -> PathBuf {
        self.telemetry_dir.join(format!(
            "sensor_log_{}.csv",
            started_at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Append one headerless row to the results log, creating it if needed.
    pub fn append_result(&self, record: &ResultRecord) -> Result<(), GameError> {
        if let Some(parent) = self.results_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.results_path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(record.to_row())?;
        writer.flush()?;
        Ok(())
    }

    /// Write (and overwrite) the sensor log for the round started at `started_at`.
    pub fn write_telemetry(
        &self,
        started_at: DateTime<Local>,
        records: &[TelemetryRecord],
    ) -> Result<PathBuf, GameError> {
        fs::create_dir_all(&self.telemetry_dir)?;
        let path = self.telemetry_path(started_at);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(TELEMETRY_HEADER)?;
        for record in records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Persist both logs for a completed round. Both writes are attempted even
    /// if the first fails; the first error is returned.
    pub fn persist(
        &self,
        result: &ResultRecord,
        telemetry: &[TelemetryRecord],
    ) -> Result<PathBuf, GameError> {
        let appended = self.append_result(result);
        let written = self.write_telemetry(result.started_at, telemetry);
        appended?;
        written
    }
}
