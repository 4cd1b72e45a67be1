use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::CalendarError;

/// Historical depth and future horizon of every generation run, in months.
pub const PAST_MONTHS: i32 = 36;
pub const FUTURE_MONTHS: i32 = 18;

/// Hard cap on iso week enumeration. Exceeding it means the calendar
/// arithmetic went wrong and the run must abort loudly instead of silently
/// truncating the series.
pub const WEEK_ENUMERATION_CAP: usize = 500;

/// 52 weeks / 12 months, as used when splitting monthly ranges into weeks.
pub const AVG_WEEKS_PER_MONTH: f64 = 4.33;

/// Locale-independent month naming. Seasonality files use the full English
/// names on the wire, so serde round-trips the variant names directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonthName {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl MonthName {
    pub const ALL: [MonthName; 12] = [
        MonthName::January,
        MonthName::February,
        MonthName::March,
        MonthName::April,
        MonthName::May,
        MonthName::June,
        MonthName::July,
        MonthName::August,
        MonthName::September,
        MonthName::October,
        MonthName::November,
        MonthName::December,
    ];

    /// Zero-based month index, matching `chrono::Datelike::month0`.
    pub fn index0(self) -> i32 {
        Self::ALL.iter().position(|m| *m == self).unwrap_or_default() as i32
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::ALL[date.month0() as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MonthName::January => "January",
            MonthName::February => "February",
            MonthName::March => "March",
            MonthName::April => "April",
            MonthName::May => "May",
            MonthName::June => "June",
            MonthName::July => "July",
            MonthName::August => "August",
            MonthName::September => "September",
            MonthName::October => "October",
            MonthName::November => "November",
            MonthName::December => "December",
        }
    }
}

/// One month-end bucket, anchored to the last day of the month.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthPeriod {
    pub month_end: NaiveDate,
    pub month_label: String,
    pub week_label: String,
    pub offset_months: i32,
}

/// One iso-week bucket. The month it belongs to is decided by its Wednesday.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekPeriod {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    pub week_label: String,
    pub month_label: String,
}

pub fn add_months(base: NaiveDate, offset_months: i32) -> Result<NaiveDate, CalendarError> {
    let shifted = if offset_months >= 0 {
        base.checked_add_months(Months::new(offset_months as u32))
    } else {
        base.checked_sub_months(Months::new(offset_months.unsigned_abs()))
    };
    shifted.ok_or(CalendarError::DateOverflow { base, offset_months })
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> Result<NaiveDate, CalendarError> {
    let next_month = add_months(start_of_month(date), 1)?;
    next_month.pred_opt().ok_or(CalendarError::DateOverflow { base: date, offset_months: 1 })
}

pub fn start_of_iso_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", MonthName::of(date).as_str(), date.year())
}

/// Enumerates the 55 month-end buckets covering `reference - 36 months`
/// through `reference + 18 months`, ascending. Regenerated on every call.
pub fn enumerate_months(reference: NaiveDate) -> Result<Vec<MonthPeriod>, CalendarError> {
    let mut periods = Vec::with_capacity((PAST_MONTHS + FUTURE_MONTHS + 1) as usize);
    for offset in -PAST_MONTHS..=FUTURE_MONTHS {
        let month_end = end_of_month(add_months(reference, offset)?)?;
        periods.push(MonthPeriod {
            month_end,
            month_label: month_label(month_end),
            week_label: format!("Week {}", month_end.iso_week().week()),
            offset_months: offset,
        });
    }
    Ok(periods)
}

/// Enumerates iso weeks from the week containing `start` until the first
/// week whose Monday falls past `end`.
pub fn enumerate_iso_weeks(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<WeekPeriod>, CalendarError> {
    let mut weeks = Vec::new();
    let mut current = start_of_iso_week(start);

    while current <= end {
        if weeks.len() >= WEEK_ENUMERATION_CAP {
            return Err(CalendarError::WeekCapExceeded { start, end, cap: WEEK_ENUMERATION_CAP });
        }

        let iso = current.iso_week();
        weeks.push(WeekPeriod {
            week_start: current,
            week_end: current + Duration::days(6),
            iso_year: iso.year(),
            iso_week: iso.week(),
            week_label: format!("{}-W{:02}", iso.year(), iso.week()),
            month_label: month_label(current + Duration::days(3)),
        });

        current = current + Duration::days(7);
    }

    Ok(weeks)
}

/// Position of a week inside the month its Wednesday belongs to, clamped
/// to 1..=6.
pub fn week_position_in_month(week_start: NaiveDate) -> u32 {
    let wednesday = week_start + Duration::days(3);
    let elapsed_weeks = (wednesday - start_of_month(wednesday)).num_days() / 7;
    (elapsed_weeks + 1).clamp(1, 6) as u32
}

/// Number of iso weeks whose Wednesday falls inside the month containing
/// `date`, floored at 4.
pub fn total_weeks_in_month(date: NaiveDate) -> Result<u32, CalendarError> {
    let month = date.month();
    let mut current = start_of_iso_week(start_of_month(date));
    let end_bound = start_of_iso_week(end_of_month(date)?) + Duration::days(6);

    let mut count = 0u32;
    while current <= end_bound {
        if (current + Duration::days(3)).month() == month {
            count += 1;
        }
        current = current + Duration::days(7);
        if count > 6 {
            break;
        }
    }

    Ok(count.max(4))
}
