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

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use chrono_tz::Tz;
use fluxion_heater_core::MAX_REQUESTS_PER_SECOND;
use fluxion_heater_types::{
    AnchorStrategy, DefaultAnchorTimes, FoldPolicy, ImporterSettings,
    config::{DEFAULT_CALIBRATION_TOLERANCE, DEFAULT_FALLBACK_POWER_WATTS},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub entry: EntrySettings,
    #[serde(default)]
    pub importer: ImporterConfig,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub backfill: BackfillSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrySettings {
    /// Identifier of the water heater the totals belong to
    #[serde(default = "default_entry_id")]
    pub id: String,

    /// Directory with captured controller responses
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImporterConfig {
    /// IANA timezone of the installation, e.g. "Europe/Prague"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_anchor_strategy")]
    pub anchor_strategy: String,
    #[serde(default = "default_fallback_power_watts")]
    pub fallback_power_watts: f64,
    #[serde(default = "default_calibration_tolerance")]
    pub calibration_tolerance: f64,
    /// "HH:MM" local time used when the primary circuit had no schedule
    #[serde(default = "default_anchor_time")]
    pub primary_anchor_time: String,
    #[serde(default = "default_anchor_time")]
    pub boost_anchor_time: String,
    #[serde(default = "default_fold_policy")]
    pub fold_policy: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// Local time of the nightly import ("HH:MM")
    #[serde(default = "default_trigger_time")]
    pub trigger_time: String,
    /// Import once right after start, before waiting for the first trigger
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillSettings {
    /// History windows fetched when `backfill` is run without `--windows`
    #[serde(default = "default_backfill_windows")]
    pub windows: u32,
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: f64,
}

fn default_entry_id() -> String {
    "water_heater".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/dumps")
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

fn default_anchor_strategy() -> String {
    AnchorStrategy::default().to_string()
}

fn default_fallback_power_watts() -> f64 {
    DEFAULT_FALLBACK_POWER_WATTS
}

fn default_calibration_tolerance() -> f64 {
    DEFAULT_CALIBRATION_TOLERANCE
}

fn default_anchor_time() -> String {
    "00:00".to_owned()
}

fn default_fold_policy() -> String {
    "earliest".to_owned()
}

fn default_trigger_time() -> String {
    "00:05".to_owned()
}

fn default_run_on_startup() -> bool {
    true
}

fn default_db_path() -> String {
    "./data/heater_statistics.db".to_owned()
}

fn default_backfill_windows() -> u32 {
    7
}

fn default_max_requests_per_second() -> f64 {
    MAX_REQUESTS_PER_SECOND
}

impl Default for EntrySettings {
    fn default() -> Self {
        Self {
            id: default_entry_id(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            anchor_strategy: default_anchor_strategy(),
            fallback_power_watts: default_fallback_power_watts(),
            calibration_tolerance: default_calibration_tolerance(),
            primary_anchor_time: default_anchor_time(),
            boost_anchor_time: default_anchor_time(),
            fold_policy: default_fold_policy(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            trigger_time: default_trigger_time(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            windows: default_backfill_windows(),
            max_requests_per_second: default_max_requests_per_second(),
        }
    }
}

fn parse_local_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("{field} must be a HH:MM time, got '{value}'"))
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("📋 Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        warn!("⚠️ Config file {} not found, using defaults", path.display());
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry.id.trim().is_empty() {
            bail!("entry.id must not be empty");
        }

        self.importer_settings()?;
        self.trigger_time()?;

        let rate = self.backfill.max_requests_per_second;
        if !(rate > 0.0 && rate <= MAX_REQUESTS_PER_SECOND) {
            bail!(
                "backfill.max_requests_per_second must be in (0, {MAX_REQUESTS_PER_SECOND}], got {rate}"
            );
        }
        if self.backfill.windows == 0 {
            bail!("backfill.windows must be at least 1");
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.importer
            .timezone
            .parse::<Tz>()
            .map_err(|e| {
                anyhow::anyhow!(
                    "importer.timezone '{}' is invalid: {e}",
                    self.importer.timezone
                )
            })
    }

    pub fn trigger_time(&self) -> Result<NaiveTime> {
        parse_local_time(&self.schedule.trigger_time, "schedule.trigger_time")
    }

    /// Typed settings for the importer, validated
    pub fn importer_settings(&self) -> Result<ImporterSettings> {
        let importer = &self.importer;

        if !(importer.fallback_power_watts.is_finite() && importer.fallback_power_watts > 0.0) {
            bail!(
                "importer.fallback_power_watts must be positive, got {}",
                importer.fallback_power_watts
            );
        }
        let tolerance = importer.calibration_tolerance;
        if !(tolerance > 0.0 && tolerance < 1.0) {
            bail!("importer.calibration_tolerance must be in (0, 1), got {tolerance}");
        }

        Ok(ImporterSettings {
            timezone: self.timezone()?,
            anchor_strategy: importer
                .anchor_strategy
                .parse::<AnchorStrategy>()
                .context("importer.anchor_strategy")?,
            fallback_power_watts: importer.fallback_power_watts,
            calibration_tolerance: tolerance,
            default_anchor_times: DefaultAnchorTimes {
                primary: parse_local_time(
                    &importer.primary_anchor_time,
                    "importer.primary_anchor_time",
                )?,
                boost: parse_local_time(&importer.boost_anchor_time, "importer.boost_anchor_time")?,
            },
            fold_policy: importer
                .fold_policy
                .parse::<FoldPolicy>()
                .context("importer.fold_policy")?,
        })
    }
}
