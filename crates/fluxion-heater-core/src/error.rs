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

//! Error types for the import pipeline

use fluxion_heater_types::Circuit;
use thiserror::Error;

/// Errors that abort a whole import run
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to fetch inputs: {0}")]
    FetchFailed(#[source] anyhow::Error),

    #[error("no weekly program available for entry '{entry_id}'")]
    NoWeeklyProgram { entry_id: String },

    #[error("statistics store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("invalid importer settings: {0}")]
    Config(String),
}

/// Errors that only skip the affected sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("no weekly program for {circuit} circuit")]
    MissingProgram { circuit: Circuit },

    #[error("invalid {circuit} sample: {reason}")]
    InvalidSample { circuit: Circuit, reason: String },
}

pub type Result<T> = std::result::Result<T, ImportError>;
