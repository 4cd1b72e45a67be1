use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;

use crate::calendar::{
    add_months, end_of_month, enumerate_iso_weeks, enumerate_months, start_of_iso_week,
    start_of_month, total_weeks_in_month, week_position_in_month, FUTURE_MONTHS, PAST_MONTHS,
};
use crate::catalog::{CountryCatalog, Product};
use crate::errors::GenerationError;
use crate::estimator::{estimate_monthly, estimate_weekly, uniform, uniform_int};
use crate::seasonality::{SeasonalityEntry, SeasonalityTable};
use crate::synthesizer::{
    adjust_actual_for_current_month, adjust_actual_for_current_week, advanced_baseline,
    apply_monthly_seasonal_lift, apply_weekly_seasonal_lift, draw_mape, months_from_weeks,
    percent_split, revenue_lakhs, ForecastRecord, MayLedger, WeekDetail, MODELS,
};

/// Everything a per-product generation pass needs. `reference_date` is the
/// explicit "today" anchor; the core never reads the wall clock.
pub struct GenerationContext<'a> {
    pub table: &'a SeasonalityTable,
    pub default_entry: SeasonalityEntry,
    pub reference_date: NaiveDate,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        catalog: &CountryCatalog,
        table: &'a SeasonalityTable,
        reference_date: NaiveDate,
    ) -> Self {
        Self { table, default_entry: catalog.default_entry(), reference_date }
    }

    fn entry_for(&self, product: &Product) -> &SeasonalityEntry {
        self.table
            .lookup(
                &product.state,
                product.category.as_str(),
                &product.plant,
                &product.product_name,
            )
            .unwrap_or(&self.default_entry)
    }
}

/// 55 month-end periods x 3 models for one product.
pub fn monthly_records_for_product(
    product: &Product,
    ctx: &GenerationContext<'_>,
    rng: &mut impl Rng,
) -> Result<Vec<ForecastRecord>, GenerationError> {
    let periods = enumerate_months(ctx.reference_date)?;
    let entry = ctx.entry_for(product);
    let mut ledger = MayLedger::default();
    let mut records = Vec::with_capacity(periods.len() * MODELS.len());

    for period in &periods {
        let month0 = period.month_end.month0();
        let year = period.month_end.year();
        let offset = i64::from(period.offset_months);

        let mut actual = estimate_monthly(entry, period.month_end, rng)?;
        actual = apply_monthly_seasonal_lift(actual, month0, year, product.country, &ledger, rng);

        let on_hand = estimate_monthly(entry, period.month_end, rng)?;
        let baseline =
            advanced_baseline(actual, Some(product.category), month0, offset > 0, false, rng);
        let consensus = (actual as f64 * uniform(rng, 0.7, 1.4)).round() as i64;
        let inventory_level_pct = (consensus as f64 / uniform(rng, 2.0, 2.5)).round() as i64;
        let stock_out_days = uniform_int(rng, 14, 21);
        let split = percent_split(rng);

        actual = adjust_actual_for_current_month(actual, period.month_end, ctx.reference_date);
        if month0 == 4 {
            ledger.record_month(year, actual);
        }
        let revenue = revenue_lakhs(actual, rng);

        for model in &MODELS {
            let mape = draw_mape(model, rng);
            let ml = (actual as f64 * uniform(rng, 0.9, 1.1)).round() as i64;
            records.push(ForecastRecord {
                country: product.country,
                state: product.state.clone(),
                city: product.city.clone(),
                plant: product.plant.clone(),
                category: product.category,
                sku_code: product.sku_code.clone(),
                product_name: product.product_name.clone(),
                channel: product.channel,
                item_date: period.month_end,
                month_label: period.month_label.clone(),
                week_label: period.week_label.clone(),
                model_name: model.name,
                actual_units: (offset <= 0).then_some(actual),
                baseline_forecast: baseline,
                ml_forecast: ml,
                sales_units: (offset <= 1).then(|| (ml as f64 * 0.8).round() as i64),
                promotion_marketing: (offset <= 1).then(|| (ml as f64 * 0.2).round() as i64),
                consensus_forecast: (offset <= 1).then_some(consensus),
                revenue_forecast_lakhs: revenue,
                inventory_level_pct: (offset == 0).then_some(inventory_level_pct),
                stock_out_days: (offset == 0).then_some(stock_out_days),
                on_hand_units: (offset == 0).then_some(on_hand),
                mape,
                actual_percent: split.actual,
                ml_forecast_percent: split.ml_forecast,
                marketing_percent: split.marketing,
                week_detail: None,
            });
        }
    }

    Ok(records)
}

/// Iso-week periods spanning the same window as the monthly grain, x 3
/// models, for one product.
pub fn weekly_records_for_product(
    product: &Product,
    ctx: &GenerationContext<'_>,
    rng: &mut impl Rng,
) -> Result<Vec<ForecastRecord>, GenerationError> {
    let window_start = start_of_month(add_months(ctx.reference_date, -PAST_MONTHS)?);
    let window_end = end_of_month(add_months(ctx.reference_date, FUTURE_MONTHS)?)?;
    let weeks = enumerate_iso_weeks(window_start, window_end)?;
    let current_week_start = start_of_iso_week(ctx.reference_date);

    let entry = ctx.entry_for(product);
    let mut ledger = MayLedger::default();
    let mut records = Vec::with_capacity(weeks.len() * MODELS.len());

    for week in &weeks {
        let wednesday = week.week_start + Duration::days(3);
        let month0 = wednesday.month0();
        let year = wednesday.year();
        let position = week_position_in_month(week.week_start);
        let total_weeks = total_weeks_in_month(wednesday)?;

        let is_current = week.week_start == current_week_start;
        let is_past = week.week_end < ctx.reference_date;
        let is_future = week.week_start > ctx.reference_date;

        let mut actual = estimate_weekly(entry, wednesday, position, total_weeks, rng)?;
        actual = apply_weekly_seasonal_lift(actual, month0, year, &ledger);
        if month0 == 4 {
            ledger.accumulate_week(year, actual);
        }

        let on_hand = (actual as f64 * uniform(rng, 0.8, 1.2)).round() as i64;
        let weeks_from_now = (week.week_start - ctx.reference_date).num_days() / 7;
        let months_out = months_from_weeks(weeks_from_now);
        let baseline =
            advanced_baseline(actual, Some(product.category), month0, months_out > 0, true, rng);
        let consensus = (actual as f64 * uniform(rng, 0.7, 1.4)).round() as i64;
        let inventory_level_pct = (consensus as f64 / uniform(rng, 1.4, 2.0)).round() as i64;
        let stock_out_days = uniform_int(rng, 1, 3);
        let split = percent_split(rng);

        if is_current {
            actual = adjust_actual_for_current_week(actual, week.week_start, ctx.reference_date);
        }
        let revenue = revenue_lakhs(actual, rng);
        let observed = is_past || is_current;

        for model in &MODELS {
            let mape = draw_mape(model, rng);
            let ml = (actual as f64 * uniform(rng, 0.9, 1.1)).round() as i64;
            records.push(ForecastRecord {
                country: product.country,
                state: product.state.clone(),
                city: product.city.clone(),
                plant: product.plant.clone(),
                category: product.category,
                sku_code: product.sku_code.clone(),
                product_name: product.product_name.clone(),
                channel: product.channel,
                item_date: week.week_end,
                month_label: week.month_label.clone(),
                week_label: week.week_label.clone(),
                model_name: model.name,
                actual_units: observed.then_some(actual),
                baseline_forecast: baseline,
                ml_forecast: ml,
                sales_units: observed.then(|| (ml as f64 * 0.8).round() as i64),
                promotion_marketing: observed.then(|| (ml as f64 * 0.2).round() as i64),
                consensus_forecast: (!is_future).then_some(consensus),
                revenue_forecast_lakhs: revenue,
                inventory_level_pct: is_current.then_some(inventory_level_pct),
                stock_out_days: is_current.then_some(stock_out_days),
                on_hand_units: is_current.then_some(on_hand),
                mape,
                actual_percent: split.actual,
                ml_forecast_percent: split.ml_forecast,
                marketing_percent: split.marketing,
                week_detail: Some(WeekDetail {
                    week_start: week.week_start,
                    week_end: week.week_end,
                    iso_year: week.iso_year,
                    iso_week: week.iso_week,
                    position_in_month: position,
                }),
            });
        }
    }

    Ok(records)
}
