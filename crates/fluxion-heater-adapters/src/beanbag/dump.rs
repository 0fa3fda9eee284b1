// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::Context;
use async_trait::async_trait;
use fluxion_heater_core::{HistorySource, ProgramSource};
use fluxion_heater_types::{Circuit, HistorySample, WeeklyProgram};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::payload::{decode_history_rows, decode_weekly_programs};
use crate::error::Result;

/// Reads captured controller responses from a directory.
///
/// Layout:
/// - `weekly_programs.json`: the schedule response (one block per circuit)
/// - `history_<window>.json`: history rows, window 0 being the most recent
#[derive(Debug, Clone)]
pub struct JsonDumpSource {
    dir: PathBuf,
}

impl JsonDumpSource {
    pub const PROGRAM_FILE: &'static str = "weekly_programs.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self, window_index: u32) -> PathBuf {
        self.dir.join(format!("history_{window_index}.json"))
    }

    pub async fn load_programs(&self) -> Result<HashMap<Circuit, WeeklyProgram>> {
        let bytes = tokio::fs::read(self.dir.join(Self::PROGRAM_FILE)).await?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        decode_weekly_programs(&payload)
    }

    /// History of one window; a window that was never captured is empty
    pub async fn load_history(&self, window_index: u32) -> Result<Vec<HistorySample>> {
        let path = self.history_path(window_index);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history dump at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let payload: Value = serde_json::from_slice(&bytes)?;
        decode_history_rows(&payload)
    }
}

#[async_trait]
impl ProgramSource for JsonDumpSource {
    async fn fetch_weekly_programs(
        &self,
        entry_id: &str,
    ) -> anyhow::Result<HashMap<Circuit, WeeklyProgram>> {
        let programs = self.load_programs().await.with_context(|| {
            format!(
                "Failed to load weekly programs for '{entry_id}' from {}",
                self.dir.display()
            )
        })?;
        Ok(programs)
    }
}

#[async_trait]
impl HistorySource for JsonDumpSource {
    async fn fetch_history(
        &self,
        entry_id: &str,
        window_index: u32,
    ) -> anyhow::Result<Vec<HistorySample>> {
        let samples = self.load_history(window_index).await.with_context(|| {
            format!("Failed to load history window {window_index} for '{entry_id}'")
        })?;
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PROGRAMS: &str = r#"[
        {"I": 1, "D": [{"O": 360, "T": 1}, {"O": 480, "T": 0}]},
        {"I": 2, "D": []}
    ]"#;

    const HISTORY: &str = r#"[
        {"epoch_seconds": 1709507100, "boost_energy_kwh": 2.302585, "boost_active_minutes": 60}
    ]"#;

    #[tokio::test]
    async fn test_reads_programs_and_history() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(JsonDumpSource::PROGRAM_FILE), PROGRAMS).unwrap();
        std::fs::write(dir.path().join("history_0.json"), HISTORY).unwrap();
        let source = JsonDumpSource::new(dir.path());

        let programs = source.fetch_weekly_programs("heater").await.unwrap();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[&Circuit::Primary].active_transition_count(), 2);

        let samples = source.fetch_history("heater", 0).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].runtime_minutes, 60);
    }

    #[tokio::test]
    async fn test_missing_window_is_empty() {
        let dir = tempdir().unwrap();
        let source = JsonDumpSource::new(dir.path());

        assert!(source.fetch_history("heater", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_programs_is_an_error() {
        let dir = tempdir().unwrap();
        let source = JsonDumpSource::new(dir.path());

        let err = source.fetch_weekly_programs("heater").await.unwrap_err();
        assert!(err.to_string().contains("weekly programs"));
    }

    #[tokio::test]
    async fn test_corrupt_history_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("history_0.json"), "{not json").unwrap();
        let source = JsonDumpSource::new(dir.path());

        assert!(source.fetch_history("heater", 0).await.is_err());
    }
}
