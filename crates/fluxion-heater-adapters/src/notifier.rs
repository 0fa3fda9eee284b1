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

use crossbeam_channel::{Receiver, Sender, TrySendError};
use fluxion_heater_core::StatisticsNotifier;
use fluxion_heater_types::{StatisticRecord, StatisticsState};
use tracing::{debug, error, warn};

/// Payload delivered to observers after every completed import
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsUpdate {
    pub state: StatisticsState,
    pub records: Vec<StatisticRecord>,
}

/// Forwards import results over a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<StatisticsUpdate>,
}

impl ChannelNotifier {
    /// Bounded notifier; updates are dropped with a warning while the receiver lags
    pub fn bounded(capacity: usize) -> (Self, Receiver<StatisticsUpdate>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    pub fn unbounded() -> (Self, Receiver<StatisticsUpdate>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl StatisticsNotifier for ChannelNotifier {
    fn notify(&self, state: &StatisticsState, records: &[StatisticRecord]) {
        let update = StatisticsUpdate {
            state: state.clone(),
            records: records.to_vec(),
        };

        match self.tx.try_send(update) {
            Ok(()) => debug!("Published statistics update for '{}'", state.entry_id),
            Err(TrySendError::Full(_)) => {
                warn!("⚠️ Statistics channel full, dropping update for '{}'", state.entry_id);
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("❌ Failed to send statistics update: receiver dropped");
            }
        }
    }
}
