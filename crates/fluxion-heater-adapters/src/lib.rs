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

//! Adapters between the import pipeline and concrete data sources and observers.

pub mod beanbag;
pub mod error;
pub mod notifier;

pub use beanbag::{
    JsonDumpSource, PROGRAM_SLOTS, SLOTS_PER_DAY, decode_history_rows, decode_weekly_program,
    decode_weekly_programs,
};
pub use error::{PayloadError, Result};
pub use notifier::{ChannelNotifier, StatisticsUpdate};
