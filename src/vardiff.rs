use super::*;

/// Target share interval the table below tries to converge on.
const TARGET_INTERVAL_SECS: f64 = 30.0;

/// Default difficulty bounds when `Settings` doesn't configure one.
const DEFAULT_MIN_DIFF: u64 = 1_000;
const DEFAULT_MAX_DIFF: u64 = 100_000_000;

/// How long a `mining.set_difficulty` and its follow-up `clean_jobs` notify
/// are kept apart, giving a miner time to apply the new target before its
/// next share lands against a job built for the old one.
const SETTLING_DELAY: Duration = Duration::from_millis(500);

/// Per-connection variable-difficulty controller. On every accepted share it
/// looks at the elapsed time since the previous one and applies a fixed
/// adjustment table, aiming the share rate at one every 30s.
#[derive(Debug)]
pub(crate) struct Vardiff {
    min_diff: Difficulty,
    max_diff: Difficulty,
    current_diff: Difficulty,
    last_share_time: Option<Instant>,
    /// Most recent 5 inter-share gaps, newest last.
    deltas: VecDeque<f64>,
    dsps: DecayingAverage,
    shares_since_change: u32,
}

impl Vardiff {
    pub(crate) fn new(
        start_diff: Difficulty,
        _vardiff_period: Duration,
        vardiff_window: Duration,
        min_diff: Option<Difficulty>,
        max_diff: Option<Difficulty>,
    ) -> Self {
        Self {
            min_diff: min_diff.unwrap_or(Difficulty::from(DEFAULT_MIN_DIFF)),
            max_diff: max_diff.unwrap_or(Difficulty::from(DEFAULT_MAX_DIFF)),
            current_diff: start_diff,
            last_share_time: None,
            deltas: VecDeque::with_capacity(5),
            dsps: DecayingAverage::new(vardiff_window),
            shares_since_change: 0,
        }
    }

    pub(crate) fn current_diff(&self) -> Difficulty {
        self.current_diff
    }

    pub(crate) fn dsps(&self) -> f64 {
        self.dsps.value()
    }

    pub(crate) fn shares_since_change(&self) -> u32 {
        self.shares_since_change
    }

    /// The settling delay to wait between sending `mining.set_difficulty`
    /// and the follow-up `clean_jobs` notify after a difficulty change.
    pub(crate) fn settling_delay(&self) -> Duration {
        SETTLING_DELAY
    }

    /// Records a share submitted at pool difficulty `current_diff` and
    /// returns the new difficulty if the adjustment table moves it by more
    /// than 5%, clamped to `[min_diff, max_diff]` and never above the
    /// network difficulty.
    pub(crate) fn record_share(
        &mut self,
        current_diff: Difficulty,
        network_diff: Difficulty,
    ) -> Option<Difficulty> {
        let now = Instant::now();
        self.current_diff = current_diff;
        self.dsps.record(current_diff.as_f64(), now);
        self.shares_since_change = self.shares_since_change.saturating_add(1);

        let Some(last) = self.last_share_time.replace(now) else {
            return None;
        };

        let dt = now.duration_since(last).as_secs_f64();

        if self.deltas.len() == 5 {
            self.deltas.pop_front();
        }
        self.deltas.push_back(dt);

        let d = current_diff.as_f64();
        let multiplier = adjustment_multiplier(dt);

        let max_diff = self.max_diff.as_f64().min(network_diff.as_f64());
        let min_diff = self.min_diff.as_f64();

        let optimal = match multiplier {
            Adjustment::Multiply(factor) => d * factor,
            Adjustment::Unchanged => d,
        };

        let clamped = optimal.clamp(min_diff, max_diff);

        if (clamped - d).abs() <= 0.05 * d {
            return None;
        }

        let new_diff = Difficulty::from(clamped);

        if new_diff == self.current_diff {
            return None;
        }

        self.current_diff = new_diff;
        self.shares_since_change = 0;
        Some(new_diff)
    }
}

enum Adjustment {
    Multiply(f64),
    Unchanged,
}

/// Δt-bucketed adjustment table: dead band 15-45s, sharper multipliers the
/// faster a share lands, a gentle decrease above 60s.
fn adjustment_multiplier(dt: f64) -> Adjustment {
    if dt < 1.0 {
        Adjustment::Multiply((10.0f64).max(TARGET_INTERVAL_SECS / dt.max(0.01)))
    } else if dt < 5.0 {
        Adjustment::Multiply((5.0f64).max(TARGET_INTERVAL_SECS / dt.max(0.1)))
    } else if dt < 15.0 {
        Adjustment::Multiply(2.0)
    } else if dt <= 45.0 {
        Adjustment::Unchanged
    } else if dt > 60.0 {
        Adjustment::Multiply(0.7)
    } else {
        Adjustment::Unchanged
    }
}
