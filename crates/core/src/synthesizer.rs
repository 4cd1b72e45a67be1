use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::{start_of_iso_week, AVG_WEEKS_PER_MONTH};
use crate::catalog::{Category, Channel, Country};
use crate::estimator::{uniform, uniform_int};

/// The three forecasting models emitted per (product, period) cell. The
/// `best` flag marks the model whose MAPE draws from the tighter band.
#[derive(Clone, Copy, Debug)]
pub struct ModelSpec {
    pub name: &'static str,
    pub best: bool,
}

pub const MODELS: [ModelSpec; 3] = [
    ModelSpec { name: "XGBoost", best: true },
    ModelSpec { name: "LightGBM", best: false },
    ModelSpec { name: "ARIMA", best: false },
];

/// Weekly-grain period markers carried alongside the shared record fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeekDetail {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    pub position_in_month: u32,
}

/// One row of the wide fact table: (product x period x model).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub country: Country,
    pub state: String,
    pub city: String,
    pub plant: String,
    pub category: Category,
    pub sku_code: String,
    pub product_name: String,
    pub channel: Channel,
    pub item_date: NaiveDate,
    pub month_label: String,
    pub week_label: String,
    pub model_name: &'static str,
    pub actual_units: Option<i64>,
    pub baseline_forecast: i64,
    pub ml_forecast: i64,
    pub sales_units: Option<i64>,
    pub promotion_marketing: Option<i64>,
    pub consensus_forecast: Option<i64>,
    pub revenue_forecast_lakhs: Decimal,
    pub inventory_level_pct: Option<i64>,
    pub stock_out_days: Option<i64>,
    pub on_hand_units: Option<i64>,
    pub mape: i64,
    pub actual_percent: i64,
    pub ml_forecast_percent: i64,
    pub marketing_percent: i64,
    pub week_detail: Option<WeekDetail>,
}

pub fn draw_mape(model: &ModelSpec, rng: &mut impl Rng) -> i64 {
    if model.best {
        uniform_int(rng, 0, 40)
    } else {
        uniform_int(rng, 10, 100)
    }
}

/// Per-category magnitude bias. Unknown categories (external data that does
/// not parse into the closed enum) take the generic band.
pub fn category_bias(category: Option<Category>, rng: &mut impl Rng) -> f64 {
    let (lo, hi) = match category {
        Some(Category::SweetMixes) => (0.8, 1.2),
        Some(Category::Beverages) => (1.1, 1.6),
        Some(Category::Masala) => (0.9, 1.3),
        Some(Category::ReadyToEat) => (1.0, 1.5),
        Some(Category::BreakfastCereals) => (1.0, 1.4),
        Some(Category::CondimentsSauces) => (0.9, 1.3),
        Some(Category::DairyAlternatives) => (1.1, 1.5),
        Some(Category::Seafood) => (0.8, 1.2),
        None => (0.9, 1.3),
    };
    uniform(rng, lo, hi)
}

/// Planner optimism by calendar quarter, deliberately decorrelated from the
/// actual's own seasonality: optimistic Feb/Mar/Nov/Dec, conservative
/// Jun/Jul/Aug.
pub fn seasonal_bias(month0: u32, rng: &mut impl Rng) -> f64 {
    if matches!(month0, 1 | 2 | 10 | 11) {
        uniform(rng, 1.2, 1.7)
    } else if matches!(month0, 5 | 6 | 7) {
        uniform(rng, 0.6, 0.9)
    } else {
        1.0
    }
}

/// Forecast decay with horizon: future periods get the wider band.
pub fn future_uncertainty(is_future: bool, rng: &mut impl Rng) -> f64 {
    if is_future {
        uniform(rng, 0.7, 1.4)
    } else {
        uniform(rng, 0.85, 1.15)
    }
}

/// Weekly horizons are bucketed into months before the future check.
pub fn months_from_weeks(weeks_from_now: i64) -> i64 {
    (weeks_from_now as f64 / AVG_WEEKS_PER_MONTH).floor() as i64
}

/// Baseline forecast derived from the actual with stacked multiplicative
/// noise. The weekly grain stacks an extra volatility factor. A non-finite
/// intermediate falls back to a plain random multiple of the actual.
pub fn advanced_baseline(
    actual: i64,
    category: Option<Category>,
    month0: u32,
    is_future: bool,
    weekly_volatility: bool,
    rng: &mut impl Rng,
) -> i64 {
    let mut value = actual as f64
        * category_bias(category, rng)
        * seasonal_bias(month0, rng)
        * future_uncertainty(is_future, rng);
    if weekly_volatility {
        value *= uniform(rng, 0.6, 1.4);
    }
    value *= uniform(rng, 0.7, 1.3);

    let rounded = value.round();
    if !rounded.is_finite() {
        return (actual as f64 * uniform(rng, 0.8, 1.2)).round() as i64;
    }
    rounded as i64
}

/// Allocation percentages; the three always sum to exactly 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PercentSplit {
    pub actual: i64,
    pub ml_forecast: i64,
    pub marketing: i64,
}

pub fn percent_split(rng: &mut impl Rng) -> PercentSplit {
    let actual = uniform(rng, 40.0, 50.0).round() as i64;
    let ml_forecast = uniform(rng, 30.0, 40.0).round() as i64;
    PercentSplit { actual, ml_forecast, marketing: 100 - actual - ml_forecast }
}

pub fn revenue_lakhs(actual: i64, rng: &mut impl Rng) -> Decimal {
    let value = (actual as f64 / 1000.0) * uniform(rng, 1.1, 1.4);
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Week of month so far, capped at 4.
pub fn week_of_month(date: NaiveDate) -> u32 {
    ((date.day() + 6) / 7).min(4)
}

/// Partial-current-month simulation: early in the month only a fraction of
/// the bucket's demand has been observed.
pub fn adjust_actual_for_current_month(
    actual: i64,
    period_end: NaiveDate,
    reference: NaiveDate,
) -> i64 {
    if period_end.year() != reference.year() || period_end.month() != reference.month() {
        return actual;
    }
    match week_of_month(reference) {
        1 => (actual as f64 / 4.0).round() as i64,
        2 => (actual as f64 / 3.0).round() as i64,
        _ => actual,
    }
}

/// Partial-current-week simulation keyed on the reference day of week.
pub fn adjust_actual_for_current_week(
    actual: i64,
    week_start: NaiveDate,
    reference: NaiveDate,
) -> i64 {
    if start_of_iso_week(reference) != week_start {
        return actual;
    }
    let factor = match reference.weekday().number_from_monday() {
        1 | 2 => 0.3,
        3 | 4 => 0.6,
        5 | 6 => 0.85,
        _ => 1.0,
    };
    (actual as f64 * factor).round() as i64
}

/// Running per-year May actuals for one product, threaded through the
/// period loop so October through December can be lifted relative to May.
/// Never shared across products.
#[derive(Clone, Debug, Default)]
pub struct MayLedger {
    by_year: BTreeMap<i32, i64>,
}

impl MayLedger {
    pub fn record_month(&mut self, year: i32, actual: i64) {
        self.by_year.insert(year, actual);
    }

    pub fn accumulate_week(&mut self, year: i32, actual: i64) {
        *self.by_year.entry(year).or_insert(0) += actual;
    }

    pub fn actual_for(&self, year: i32) -> Option<i64> {
        self.by_year.get(&year).copied()
    }
}

/// Monthly retail lift: October must clear a randomized fraction of the
/// same year's May actual; November and December use their own bands, with
/// December depending on the country.
pub fn apply_monthly_seasonal_lift(
    actual: i64,
    month0: u32,
    year: i32,
    country: Country,
    ledger: &MayLedger,
    rng: &mut impl Rng,
) -> i64 {
    let Some(may_actual) = ledger.actual_for(year) else {
        return actual;
    };
    let may_actual = may_actual as f64;
    let lifted = match month0 {
        9 => (actual as f64).max(may_actual * uniform(rng, 1.0, 1.3)),
        10 => (actual as f64).max(may_actual * uniform(rng, 0.6, 0.8)),
        11 => {
            let multiplier = if country == Country::Usa {
                uniform(rng, 1.0, 1.3)
            } else {
                uniform(rng, 0.4, 0.6)
            };
            (actual as f64).max(may_actual * multiplier)
        }
        _ => return actual,
    };
    lifted.round() as i64
}

/// Weekly October lift against the accumulated May weekly volume. The
/// fraction is fixed here, unlike the randomized monthly bands.
pub const WEEKLY_MAY_OCTOBER_FRACTION: f64 = 0.3;

pub fn apply_weekly_seasonal_lift(actual: i64, month0: u32, year: i32, ledger: &MayLedger) -> i64 {
    if month0 != 9 {
        return actual;
    }
    match ledger.actual_for(year) {
        Some(may_sum) => {
            (actual as f64).max(may_sum as f64 * WEEKLY_MAY_OCTOBER_FRACTION).round() as i64
        }
        None => actual,
    }
}
