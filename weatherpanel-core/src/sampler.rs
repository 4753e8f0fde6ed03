//! Reduce the provider's 3-hourly forecast list to one entry per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 8 slots of 3 hours make one day.
pub const SAMPLING_STRIDE: usize = 8;

/// Days covered by the free 5-day/3-hour forecast.
pub const FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Every 8th entry from index 0. Relies on the provider keeping a fixed
    /// 3-hour cadence.
    #[default]
    Stride,
    /// First entry of each calendar day.
    CalendarDay,
}

impl SamplingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingPolicy::Stride => "stride",
            SamplingPolicy::CalendarDay => "calendar_day",
        }
    }

    pub const fn all() -> &'static [SamplingPolicy] {
        &[SamplingPolicy::Stride, SamplingPolicy::CalendarDay]
    }

    pub fn apply<'a, T>(&self, entries: &'a [T], day_of: impl Fn(&T) -> NaiveDate) -> Vec<&'a T> {
        match self {
            SamplingPolicy::Stride => sample(entries),
            SamplingPolicy::CalendarDay => sample_by_day(entries, day_of),
        }
    }
}

impl std::fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every [`SAMPLING_STRIDE`]th entry starting at index 0.
///
/// Returns `ceil(len / 8)` entries; inputs shorter than one stride give a
/// single entry, or none when empty.
pub fn sample<T>(entries: &[T]) -> Vec<&T> {
    entries.iter().step_by(SAMPLING_STRIDE).collect()
}

/// First entry of each calendar day, at most [`FORECAST_DAYS`] of them.
///
/// Entries whose day is not after the last picked day are skipped, so the
/// result is strictly ascending even if the input is not.
pub fn sample_by_day<T>(entries: &[T], day_of: impl Fn(&T) -> NaiveDate) -> Vec<&T> {
    let mut picked = Vec::with_capacity(FORECAST_DAYS);
    let mut last_day: Option<NaiveDate> = None;

    for entry in entries {
        if picked.len() == FORECAST_DAYS {
            break;
        }

        let day = day_of(entry);
        if last_day.is_none_or(|last| day > last) {
            last_day = Some(day);
            picked.push(entry);
        }
    }

    picked
}
