//! Trend analysis
//!
//! Turns an ordered sequence of daily rollups into a directional signal by
//! comparing the recent half of the window against the older half.

use crate::models::{DailyAggregate, TrendDirection, TrendSignal};

/// Default percentage change above which the trend counts as increasing
pub const DEFAULT_INCREASE_THRESHOLD: f64 = 10.0;
/// Default percentage change below which the trend counts as decreasing
pub const DEFAULT_DECREASE_THRESHOLD: f64 = -10.0;

/// Classifies the recent spam-rate trajectory from daily aggregates
#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    increase_threshold: f64,
    decrease_threshold: f64,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            increase_threshold: DEFAULT_INCREASE_THRESHOLD,
            decrease_threshold: DEFAULT_DECREASE_THRESHOLD,
        }
    }
}

impl TrendAnalyzer {
    /// Create an analyzer with custom policy thresholds
    #[must_use]
    pub const fn new(increase_threshold: f64, decrease_threshold: f64) -> Self {
        Self {
            increase_threshold,
            decrease_threshold,
        }
    }

    /// Analyze a most-recent-first sequence of daily aggregates over a
    /// window of `window_days`.
    ///
    /// An empty sequence yields the defined STABLE/0% default, not an
    /// error. The window is split by index: the recent half covers
    /// `[0, window/2)` and the older half `[window/2, window)` (integer
    /// division, so the recent half is weighted toward today). The divisor
    /// guard `max(older_avg, 1)` avoids division by zero at the cost of
    /// understating the change when the older baseline is truly zero.
    #[must_use]
    pub fn analyze(&self, aggregates: &[DailyAggregate], window_days: usize) -> TrendSignal {
        if aggregates.is_empty() {
            return TrendSignal::stable();
        }
        if window_days == 0 {
            return TrendSignal {
                direction: TrendDirection::Unknown,
                change_percent: 0.0,
                recent_avg: 0.0,
                older_avg: 0.0,
            };
        }

        let half = window_days / 2;
        let window = &aggregates[..aggregates.len().min(window_days)];
        let split = half.min(window.len());
        let recent = &window[..split];
        let older = &window[split..];

        let recent_avg = mean_spam_count(recent);
        let older_avg = mean_spam_count(older);

        let change_percent =
            round2((recent_avg - older_avg) / older_avg.max(1.0) * 100.0);

        let direction = if change_percent > self.increase_threshold {
            TrendDirection::Increasing
        } else if change_percent < self.decrease_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        TrendSignal {
            direction,
            change_percent,
            recent_avg: round2(recent_avg),
            older_avg: round2(older_avg),
        }
    }
}

fn mean_spam_count(aggregates: &[DailyAggregate]) -> f64 {
    if aggregates.is_empty() {
        return 0.0;
    }
    aggregates.iter().map(|a| a.spam_count as f64).sum::<f64>() / aggregates.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
