//! Daily translation statistics

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::models::Statistics;

/// Tracks how many translations were applied today
#[derive(Debug, Clone, Default)]
pub struct StatisticsTracker {
    stats: Arc<RwLock<Statistics>>,
}

impl StatisticsTracker {
    /// Create a tracker seeded from persisted statistics
    pub fn new(stats: Statistics) -> Self {
        let mut stats = stats;
        stats.reset_if_needed(today());
        Self {
            stats: Arc::new(RwLock::new(stats)),
        }
    }

    /// Count one applied translation
    pub async fn record_translation(&self) -> u32 {
        self.record_on(today()).await
    }

    pub(crate) async fn record_on(&self, day: NaiveDate) -> u32 {
        let mut stats = self.stats.write().await;
        stats.record(day);
        debug!("Translations today: {}", stats.translations_today);
        stats.translations_today
    }

    /// Get current statistics, reset first if the day rolled over
    pub async fn snapshot(&self) -> Statistics {
        let mut stats = self.stats.write().await;
        stats.reset_if_needed(today());
        stats.clone()
    }

    /// Get today's count
    pub async fn translations_today(&self) -> u32 {
        self.snapshot().await.translations_today
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
