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

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Upper bound for on-demand history requests
pub const MAX_REQUESTS_PER_SECOND: f64 = 2.0;

/// Spaces out outgoing requests so they never exceed a fixed rate
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Rates outside `(0, 2]` are clamped to 2 requests per second
    pub fn new(requests_per_second: f64) -> Self {
        let rate = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            requests_per_second.min(MAX_REQUESTS_PER_SECOND)
        } else {
            MAX_REQUESTS_PER_SECOND
        };

        Self {
            min_interval: Duration::from_secs_f64(1.0 / rate),
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.min_interval;
            let now = Instant::now();
            if now < next {
                trace!("Pacing request for {:?}", next - now);
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(MAX_REQUESTS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(RequestPacer::new(10.0).min_interval(), Duration::from_millis(500));
        assert_eq!(RequestPacer::new(0.0).min_interval(), Duration::from_millis(500));
        assert_eq!(RequestPacer::new(f64::NAN).min_interval(), Duration::from_millis(500));
        assert_eq!(RequestPacer::new(1.0).min_interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let pacer = RequestPacer::default();
        let started = Instant::now();

        for _ in 0..5 {
            pacer.acquire().await;
        }

        // First request is immediate, the other four wait 500 ms each
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_pacer_does_not_wait() {
        let pacer = RequestPacer::new(1.0);
        pacer.acquire().await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let before = Instant::now();
        pacer.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
