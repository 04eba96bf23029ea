//! Randomized pauses between page interactions.

use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Pause length band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayBand {
    /// In-page probing (opening a filter menu).
    Short,
    /// Per-card and pagination steps.
    Medium,
    /// Between searches.
    Long,
}

impl DelayBand {
    pub fn range_ms(self) -> RangeInclusive<u64> {
        match self {
            DelayBand::Short => 500..=1_500,
            DelayBand::Medium => 1_500..=4_000,
            DelayBand::Long => 4_000..=8_000,
        }
    }

    pub fn sample(self) -> Duration {
        let ms = rand::rng().random_range(self.range_ms());
        Duration::from_millis(ms)
    }
}

/// Sleeps between interactions unless disabled.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    enabled: bool,
}

impl Pacer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A pacer that never sleeps.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Random pause drawn from `band`.
    pub async fn pause(&self, band: DelayBand) {
        if self.enabled {
            tokio::time::sleep(band.sample()).await;
        }
    }

    /// Fixed pause to let the page finish rendering.
    pub async fn settle(&self, millis: u64) {
        if self.enabled {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
