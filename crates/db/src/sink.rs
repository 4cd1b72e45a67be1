use async_trait::async_trait;
use chrono::NaiveDate;
use demandgen_core::catalog::Country;
use demandgen_core::sink::{ForecastSink, Grain, SinkError, TableStats};
use demandgen_core::synthesizer::ForecastRecord;
use sqlx::Row;

use crate::DbPool;

/// SQLite-backed sink. Revenue is stored as TEXT to keep the decimal exact;
/// dates go in as ISO-8601 strings. Inserts run row by row with no
/// surrounding transaction: a failure mid-batch leaves the rows written so
/// far in place.
pub struct SqlForecastSink {
    pool: DbPool,
}

impl SqlForecastSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn db_error(error: sqlx::Error) -> SinkError {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                SinkError::Unavailable(error.to_string())
            }
            other => SinkError::Query(other.to_string()),
        }
    }
}

async fn insert_monthly(pool: &DbPool, record: &ForecastRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO demand_forecast (
            country, state, city, plant, category, sku_code, product_name, channel,
            item_date, month_label, week_label, model_name,
            actual_units, baseline_forecast, ml_forecast,
            sales_units, promotion_marketing, consensus_forecast,
            revenue_forecast_lakhs, inventory_level_pct, stock_out_days, on_hand_units,
            mape, actual_percent, ml_forecast_percent, marketing_percent
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.country.as_str())
    .bind(&record.state)
    .bind(&record.city)
    .bind(&record.plant)
    .bind(record.category.as_str())
    .bind(&record.sku_code)
    .bind(&record.product_name)
    .bind(record.channel.as_str())
    .bind(record.item_date)
    .bind(&record.month_label)
    .bind(&record.week_label)
    .bind(record.model_name)
    .bind(record.actual_units)
    .bind(record.baseline_forecast)
    .bind(record.ml_forecast)
    .bind(record.sales_units)
    .bind(record.promotion_marketing)
    .bind(record.consensus_forecast)
    .bind(record.revenue_forecast_lakhs.to_string())
    .bind(record.inventory_level_pct)
    .bind(record.stock_out_days)
    .bind(record.on_hand_units)
    .bind(record.mape)
    .bind(record.actual_percent)
    .bind(record.ml_forecast_percent)
    .bind(record.marketing_percent)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_weekly(pool: &DbPool, record: &ForecastRecord) -> Result<(), SinkError> {
    let detail = record.week_detail.as_ref().ok_or_else(|| {
        SinkError::Query(format!(
            "weekly record for {} on {} is missing its week detail",
            record.sku_code, record.item_date
        ))
    })?;

    sqlx::query(
        r#"
        INSERT INTO weekly_demand_forecast (
            country, state, city, plant, category, sku_code, product_name, channel,
            item_date, month_label, week_label, model_name,
            week_start_date, week_end_date, iso_year, iso_week_number, week_position_in_month,
            actual_units, baseline_forecast, ml_forecast,
            sales_units, promotion_marketing, consensus_forecast,
            revenue_forecast_lakhs, inventory_level_pct, stock_out_days, on_hand_units,
            mape, actual_percent, ml_forecast_percent, marketing_percent
        ) VALUES (
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(record.country.as_str())
    .bind(&record.state)
    .bind(&record.city)
    .bind(&record.plant)
    .bind(record.category.as_str())
    .bind(&record.sku_code)
    .bind(&record.product_name)
    .bind(record.channel.as_str())
    .bind(record.item_date)
    .bind(&record.month_label)
    .bind(&record.week_label)
    .bind(record.model_name)
    .bind(detail.week_start)
    .bind(detail.week_end)
    .bind(detail.iso_year)
    .bind(detail.iso_week)
    .bind(detail.position_in_month)
    .bind(record.actual_units)
    .bind(record.baseline_forecast)
    .bind(record.ml_forecast)
    .bind(record.sales_units)
    .bind(record.promotion_marketing)
    .bind(record.consensus_forecast)
    .bind(record.revenue_forecast_lakhs.to_string())
    .bind(record.inventory_level_pct)
    .bind(record.stock_out_days)
    .bind(record.on_hand_units)
    .bind(record.mape)
    .bind(record.actual_percent)
    .bind(record.ml_forecast_percent)
    .bind(record.marketing_percent)
    .execute(pool)
    .await
    .map_err(SqlForecastSink::db_error)?;
    Ok(())
}

#[async_trait]
impl ForecastSink for SqlForecastSink {
    async fn clear(&self, grain: Grain, country: Option<Country>) -> Result<u64, SinkError> {
        let result = match country {
            Some(country) => {
                sqlx::query(&format!("DELETE FROM {} WHERE country = ?", grain.table_name()))
                    .bind(country.as_str())
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query(&format!("DELETE FROM {}", grain.table_name()))
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(Self::db_error)?;

        Ok(result.rows_affected())
    }

    async fn insert(&self, grain: Grain, records: &[ForecastRecord]) -> Result<u64, SinkError> {
        let mut written = 0u64;
        for record in records {
            match grain {
                Grain::Monthly => {
                    insert_monthly(&self.pool, record).await.map_err(Self::db_error)?;
                }
                Grain::Weekly => {
                    insert_weekly(&self.pool, record).await?;
                }
            }
            written += 1;
        }
        Ok(written)
    }

    async fn stats(&self, grain: Grain) -> Result<TableStats, SinkError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT
                COUNT(*) AS total_records,
                COALESCE(SUM(CASE WHEN country = 'India' THEN 1 ELSE 0 END), 0) AS india_records,
                COALESCE(SUM(CASE WHEN country = 'USA' THEN 1 ELSE 0 END), 0) AS usa_records,
                MIN(item_date) AS earliest_date,
                MAX(item_date) AS latest_date
            FROM {}
            "#,
            grain.table_name()
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_error)?;

        Ok(TableStats {
            total_records: row.try_get("total_records").map_err(Self::db_error)?,
            india_records: row.try_get("india_records").map_err(Self::db_error)?,
            usa_records: row.try_get("usa_records").map_err(Self::db_error)?,
            earliest_date: row
                .try_get::<Option<NaiveDate>, _>("earliest_date")
                .map_err(Self::db_error)?,
            latest_date: row
                .try_get::<Option<NaiveDate>, _>("latest_date")
                .map_err(Self::db_error)?,
        })
    }
}
