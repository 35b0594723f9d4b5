// src/data.rs
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::game::{AttemptOutcome, GameState};

#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub timestamp: String,
    pub elapsed_ms: f64,
    pub turn_attempt: u32,
    pub outcome: String,
    pub drinks_before: u32,
    pub drinks_after: u32,
    pub intoxication: f32,
    pub blackout_probability: f64,
}

/// Every sip attempt of one session, in order.
pub struct SessionLog {
    session_name: String,
    records: Vec<AttemptRecord>,
}

impl SessionLog {
    pub fn new(session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            session_name,
            records: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(
        &mut self,
        elapsed_ms: f64,
        drinks_before: u32,
        outcome: &AttemptOutcome,
        state: &GameState,
    ) {
        let blackout_probability = match outcome {
            AttemptOutcome::BlackedOut { probability } => *probability,
            _ => 0.0,
        };
        self.records.push(AttemptRecord {
            timestamp: Local::now().to_rfc3339(),
            elapsed_ms,
            turn_attempt: state.turn_attempts,
            outcome: outcome.label().to_string(),
            drinks_before,
            drinks_after: state.drink_count,
            intoxication: state.intoxication,
            blackout_probability,
        });
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `<output_dir>/<session>/attempts.csv`.
    pub fn export_csv(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let csv_path = output_dir
            .as_ref()
            .join(&self.session_name)
            .join("attempts.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("creating {}", csv_path.display()))?;
        self.write_csv(file)?;
        Ok(csv_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DrinkMachine, GameRules, ScriptedRandom};

    fn played_log() -> SessionLog {
        let mut machine = DrinkMachine::new(GameRules::default());
        let mut log = SessionLog::new(Some("test_session".to_string()));

        let outcome = machine.attempt(0.0, &mut ScriptedRandom::new([0.9]), false);
        log.record(0.0, 0, &outcome, machine.state());
        let outcome = machine.attempt(100.0, &mut ScriptedRandom::new([0.9]), false);
        log.record(100.0, 1, &outcome, machine.state());
        log
    }

    #[test]
    fn test_records_outcomes_in_order() {
        let log = played_log();
        assert_eq!(log.records().len(), 2);
        assert_eq!(log.records()[0].outcome, "accepted");
        assert_eq!(log.records()[0].drinks_after, 1);
        assert_eq!(log.records()[1].outcome, "rejected");
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let log = played_log();
        let mut buffer = Vec::new();
        log.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,elapsed_ms,turn_attempt,outcome,drinks_before,drinks_after,intoxication,blackout_probability"
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_export_creates_session_directory() {
        let dir = std::env::temp_dir().join(format!(
            "drink_up_test_{}_{}",
            std::process::id(),
            Local::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = played_log().export_csv(&dir).unwrap();
        assert!(path.ends_with("test_session/attempts.csv"));
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_default_session_name_is_timestamped() {
        let log = SessionLog::new(None);
        assert!(log.session_name().starts_with("session_"));
        assert!(log.is_empty());
    }
}
