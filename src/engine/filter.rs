//! Countdown reading filter.
//!
//! OCR on the countdown is noisy: spaces drift in, 分 comes back as 份, 6 as
//! b, and whole reads come back garbled. The filter normalizes the text,
//! parses minutes and seconds, and rejects readings that jump upward within
//! an epoch, since the real countdown only ever decreases until a restock
//! rolls it over.

use regex::Regex;
use std::sync::OnceLock;

/// Baseline meaning "no reading accepted yet this epoch": any value passes
/// the monotonicity check against it.
const UNCONSTRAINED: u32 = u32::MAX;

/// Readings at or above an hour are implausible for a short-cycle restock
/// and are let through the monotonicity check, since a jump that large means
/// the timer itself rolled over rather than OCR noise.
const LONG_TIMER_SECS: u32 = 3600;

/// A parsed countdown reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerReading {
    pub minutes: u32,
    pub seconds: u32,
}

impl TimerReading {
    pub fn total_seconds(&self) -> u32 {
        self.minutes * 60 + self.seconds
    }
}

/// Outcome of feeding one raw OCR string through the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// A plausible reading that passed all checks.
    Accepted(TimerReading),
    /// Garbled, implausible, or non-monotonic. Ignore and re-poll.
    Rejected,
    /// The display shows a day- or hour-scale timer: the shop rolled over
    /// to a long wait and the epoch baseline was reset.
    RolledOver,
}

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("hard-coded pattern"))
}

/// Fixes the OCR confusions seen in practice on this font.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '份' => '分',
            'b' => '6',
            other => other,
        })
        .collect()
}

/// Per-epoch countdown filter. One epoch spans from a restock rollover to
/// the next; within it, accepted readings must not increase.
#[derive(Debug)]
pub struct TimerFilter {
    last_total: u32,
    refreshed: bool,
}

impl Default for TimerFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerFilter {
    pub fn new() -> Self {
        Self {
            last_total: UNCONSTRAINED,
            refreshed: false,
        }
    }

    /// Feeds one raw OCR string through the filter.
    pub fn feed(&mut self, raw: &str) -> FilterOutcome {
        let text = normalize(raw);

        // Day- or hour-scale display means the restock landed and the shop
        // is showing the next long wait.
        if text.contains('天') || text.contains("小时") {
            self.last_total = UNCONSTRAINED;
            self.refreshed = true;
            return FilterOutcome::RolledOver;
        }

        let runs: Vec<u32> = digit_runs()
            .find_iter(&text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        if runs.len() < 2 {
            return FilterOutcome::Rejected;
        }
        let (minutes, seconds) = (runs[0], runs[1]);
        if minutes > 60 || seconds > 60 {
            return FilterOutcome::Rejected;
        }

        let reading = TimerReading { minutes, seconds };
        let total = reading.total_seconds();

        // A reading above the last accepted one is OCR noise, unless a
        // refresh just reset the countdown or the value is hour-scale.
        if total > self.last_total && total < LONG_TIMER_SECS && !self.refreshed {
            return FilterOutcome::Rejected;
        }

        self.last_total = total;
        self.refreshed = false;
        FilterOutcome::Accepted(reading)
    }

    /// Records that a refresh was clicked, so the next reading may exceed
    /// the previous baseline.
    pub fn mark_refreshed(&mut self) {
        self.refreshed = true;
    }

    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    /// Clears the baseline for a new epoch.
    pub fn reset_epoch(&mut self) {
        self.last_total = UNCONSTRAINED;
        self.refreshed = false;
    }
}
