use chrono::NaiveDate;
use rand::Rng;

use crate::calendar::{MonthName, AVG_WEEKS_PER_MONTH};
use crate::errors::EstimatorError;
use crate::seasonality::SeasonalityEntry;

pub(crate) fn uniform(rng: &mut impl Rng, lo: f64, hi: f64) -> f64 {
    rng.gen_range(lo..hi)
}

pub(crate) fn uniform_int(rng: &mut impl Rng, lo: i64, hi: i64) -> i64 {
    rng.gen_range(lo..=hi.max(lo))
}

fn validate(entry: &SeasonalityEntry) -> Result<(), EstimatorError> {
    if !entry.min.is_finite() || !entry.max.is_finite() || entry.min < 0.0 || entry.min > entry.max
    {
        return Err(EstimatorError::InvalidRange {
            product_name: entry.product_name.clone(),
            min: entry.min,
            max: entry.max,
        });
    }
    Ok(())
}

/// Tiered quantity rules shared by both grains, in priority order: exact
/// peak month, exact dip month, 1-2 months before a peak, 1-2 months before
/// a dip, baseline noise. Month comparisons never wrap across year end.
fn tiered_quantity(
    min: f64,
    max: f64,
    date: NaiveDate,
    trend_peaks: &[MonthName],
    dips: &[MonthName],
    rng: &mut impl Rng,
) -> f64 {
    let month = MonthName::of(date);
    let month_index = month.index0();

    if trend_peaks.contains(&month) {
        (max.ceil() * uniform(rng, 1.5, 2.0)).round()
    } else if dips.contains(&month) {
        (min.floor() * rng.gen::<f64>()).round()
    } else if trend_peaks
        .iter()
        .map(|m| m.index0())
        .any(|idx| idx - 1 == month_index || idx - 2 == month_index)
    {
        (max * uniform(rng, 0.9, 1.1)).round()
    } else if dips
        .iter()
        .map(|m| m.index0())
        .any(|idx| idx - 1 == month_index || idx - 2 == month_index)
    {
        (max * uniform(rng, 0.6, 0.8)).round()
    } else {
        let lo = min.ceil() as i64;
        let hi = (max.floor() as i64).max(lo);
        (uniform_int(rng, lo, hi) as f64 * uniform(rng, 0.5, 1.0)).round()
    }
}

/// Representative monthly quantity for one period, always at least 1.
pub fn estimate_monthly(
    entry: &SeasonalityEntry,
    date: NaiveDate,
    rng: &mut impl Rng,
) -> Result<i64, EstimatorError> {
    validate(entry)?;
    let quantity = tiered_quantity(entry.min, entry.max, date, &entry.trend_peaks, &entry.dips, rng);
    Ok((quantity as i64).max(1))
}

/// Position-in-month scaling for the weekly grain: first and last weeks of
/// a month carry more volume than the middle weeks.
pub fn weekly_weightage(position: u32, total_weeks: u32, rng: &mut impl Rng) -> f64 {
    if position == 1 {
        uniform(rng, 1.3, 1.6)
    } else if position == total_weeks {
        uniform(rng, 1.2, 1.5)
    } else {
        uniform(rng, 0.7, 1.0)
    }
}

/// Weekly variant: the monthly min/max are first spread across the average
/// weeks per month, then the same tiering applies, then the position
/// weightage. Always at least 1.
pub fn estimate_weekly(
    entry: &SeasonalityEntry,
    date: NaiveDate,
    week_position: u32,
    total_weeks: u32,
    rng: &mut impl Rng,
) -> Result<i64, EstimatorError> {
    validate(entry)?;
    let weekly_min = (entry.min / AVG_WEEKS_PER_MONTH).floor();
    let weekly_max = (entry.max / AVG_WEEKS_PER_MONTH).floor();
    let base = tiered_quantity(weekly_min, weekly_max, date, &entry.trend_peaks, &entry.dips, rng);
    let weighted = base * weekly_weightage(week_position, total_weeks, rng);
    Ok((weighted.round() as i64).max(1))
}
