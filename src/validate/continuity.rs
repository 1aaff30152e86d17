//! Regularity and continuity of the timestamp index.
//!
//! 1. Infer a frequency from the distinct, sorted instants alone (the declared
//!    granularity plays no part in this).
//! 2. Rebuild the full grid from the first to the last instant at that
//!    frequency.
//! 3. Compare the grid with the index as given, row by row. Gaps, duplicates
//!    and out-of-order rows all fail here.
//! 4. Require the inferred frequency to be the declared granularity's
//!    canonical one.
//!
//! Inference tries, in order: calendar months (all points on the 1st, or all
//! on the last day of their month, at the same wall time), calendar days
//! (same wall time, uniform day step), then a fixed absolute step. Calendar
//! rules use the local calendar of the series' zone, so DST days of 23 or 25
//! hours still count as one day.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::domain::{Frequency, Granularity};
use crate::error::IngestError;

pub const IRREGULAR_MESSAGE: &str = "Index frequency could not be inferred; data may be irregular.";
pub const MISSING_DATES_MESSAGE: &str = "Index frequency could be inferred, but missing dates.";

/// Run the full continuity check and return the inferred frequency.
///
/// The caller must already have enforced the minimum length.
pub fn check_continuity(index: &[DateTime<Tz>], granularity: Granularity) -> Result<Frequency, IngestError> {
    let Some(frequency) = infer_frequency(index) else {
        // Duplicates can leave fewer than three distinct instants; any two
        // instants form a regular grid, so the duplicates are what fails.
        let message = if has_too_few_distinct(index) { MISSING_DATES_MESSAGE } else { IRREGULAR_MESSAGE };
        return Err(IngestError::Continuity(message.to_string()));
    };
    tracing::debug!(%frequency, points = index.len(), "inferred index frequency");

    let (Some(first), Some(last)) = (index.iter().min(), index.iter().max()) else {
        return Err(IngestError::Continuity(IRREGULAR_MESSAGE.to_string()));
    };
    let grid = expected_grid(first, last, frequency, index.len());
    if grid.as_slice() != index {
        return Err(IngestError::Continuity(MISSING_DATES_MESSAGE.to_string()));
    }

    let expected = granularity.frequency();
    if frequency != expected {
        return Err(IngestError::Continuity(format!(
            "Index frequency '{frequency}' does not match granularity '{granularity}' (expected '{expected}')."
        )));
    }

    Ok(frequency)
}

/// Infer the sampling frequency of a timestamp sequence.
///
/// Returns `None` for fewer than three distinct instants or when no single
/// frequency explains every step.
pub fn infer_frequency(index: &[DateTime<Tz>]) -> Option<Frequency> {
    let mut points = index.to_vec();
    points.sort();
    points.dedup();
    if points.len() < 3 {
        return None;
    }

    let local: Vec<NaiveDateTime> = points.iter().map(|p| p.naive_local()).collect();
    let utc: Vec<NaiveDateTime> = points.iter().map(|p| p.naive_utc()).collect();

    infer_monthly(&local)
        .or_else(|| infer_daily(&local))
        .or_else(|| infer_fixed(&utc))
}

/// Build the regular grid from `first` to `last` (inclusive).
///
/// Generation stops once the grid holds more than `limit` points, since it
/// can no longer match an index of that length.
pub fn expected_grid(first: &DateTime<Tz>, last: &DateTime<Tz>, frequency: Frequency, limit: usize) -> Vec<DateTime<Tz>> {
    let tz = first.timezone();
    let mut grid = Vec::new();

    match frequency {
        Frequency::Fixed(step) => {
            if step <= Duration::zero() {
                return grid;
            }
            let end = last.naive_utc();
            let mut cur = first.naive_utc();
            while cur <= end && grid.len() <= limit {
                grid.push(tz.from_utc_datetime(&cur));
                let Some(next) = cur.checked_add_signed(step) else { break };
                cur = next;
            }
        }
        Frequency::Days(n) => {
            let start = first.naive_local();
            walk_local(&mut grid, tz, last, limit, |k| start.checked_add_days(Days::new(k * u64::from(n))));
        }
        Frequency::MonthStart(n) | Frequency::MonthEnd(n) => {
            let start = first.naive_local();
            let base = month_index(start.date());
            let month_end = matches!(frequency, Frequency::MonthEnd(_));
            walk_local(&mut grid, tz, last, limit, |k| {
                let idx = base.checked_add(i64::try_from(k).ok()?.checked_mul(i64::from(n))?)?;
                let (year, month) = month_from_index(idx)?;
                let date = if month_end { month_end_date(year, month)? } else { NaiveDate::from_ymd_opt(year, month, 1)? };
                Some(date.and_time(start.time()))
            });
        }
    }

    grid
}

/// Localize the `k`-th wall-clock step for k = 0, 1, ... until past `last`.
fn walk_local<F>(grid: &mut Vec<DateTime<Tz>>, tz: Tz, last: &DateTime<Tz>, limit: usize, step: F)
where
    F: Fn(u64) -> Option<NaiveDateTime>,
{
    // A few extra iterations cover wall times skipped by DST transitions.
    let max_steps = limit as u64 + 2;
    for k in 0..=max_steps {
        let Some(local) = step(k) else { break };
        let Some(ts) = tz.from_local_datetime(&local).earliest() else { continue };
        if ts > *last || grid.len() > limit {
            break;
        }
        grid.push(ts);
    }
}

fn infer_monthly(local: &[NaiveDateTime]) -> Option<Frequency> {
    if !same_wall_time(local) {
        return None;
    }
    let month_end = if local.iter().all(|t| t.day() == 1) {
        false
    } else if local.iter().all(|t| is_month_end(t.date())) {
        true
    } else {
        return None;
    };
    let months: Vec<i64> = local.iter().map(|t| month_index(t.date())).collect();
    let step = u32::try_from(uniform_step(&months)?).ok()?;
    Some(if month_end { Frequency::MonthEnd(step) } else { Frequency::MonthStart(step) })
}

fn infer_daily(local: &[NaiveDateTime]) -> Option<Frequency> {
    if !same_wall_time(local) {
        return None;
    }
    let days: Vec<i64> = local.iter().map(|t| i64::from(t.date().num_days_from_ce())).collect();
    let step = u32::try_from(uniform_step(&days)?).ok()?;
    Some(Frequency::Days(step))
}

fn infer_fixed(utc: &[NaiveDateTime]) -> Option<Frequency> {
    let step = utc[1] - utc[0];
    if step <= Duration::zero() {
        return None;
    }
    utc.windows(2)
        .all(|w| w[1] - w[0] == step)
        .then_some(Frequency::Fixed(step))
}

/// True when duplicates leave one or two distinct instants in a longer index.
fn has_too_few_distinct(index: &[DateTime<Tz>]) -> bool {
    let mut points = index.to_vec();
    points.sort();
    points.dedup();
    (1..3).contains(&points.len()) && points.len() < index.len()
}

fn same_wall_time(local: &[NaiveDateTime]) -> bool {
    let time = local[0].time();
    local.iter().all(|t| t.time() == time)
}

/// Common positive difference between consecutive values, if there is one.
fn uniform_step(values: &[i64]) -> Option<i64> {
    let step = values[1] - values[0];
    (step > 0 && values.windows(2).all(|w| w[1] - w[0] == step)).then_some(step)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_from_index(idx: i64) -> Option<(i32, u32)> {
    let year = i32::try_from(idx.div_euclid(12)).ok()?;
    let month = u32::try_from(idx.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

fn month_end_date(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().is_some_and(|next| next.day() == 1)
}
