use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Country;
use crate::synthesizer::ForecastRecord;

/// The two persistence grains. Each maps to its own fact table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grain {
    Monthly,
    Weekly,
}

impl Grain {
    pub fn table_name(&self) -> &'static str {
        match self {
            Grain::Monthly => "demand_forecast",
            Grain::Weekly => "weekly_demand_forecast",
        }
    }
}

impl std::fmt::Display for Grain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grain::Monthly => write!(f, "monthly"),
            Grain::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("sink query failed: {0}")]
    Query(String),
}

/// Row counts and date coverage for one fact table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub total_records: i64,
    pub india_records: i64,
    pub usa_records: i64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
}

/// Persistence seam between generation and storage. Implementations report
/// how many rows each operation touched.
#[async_trait]
pub trait ForecastSink: Send + Sync {
    /// Deletes rows for one grain, optionally scoped to a country.
    async fn clear(&self, grain: Grain, country: Option<Country>) -> Result<u64, SinkError>;

    /// Appends a batch of records to the grain's table.
    async fn insert(&self, grain: Grain, records: &[ForecastRecord]) -> Result<u64, SinkError>;

    async fn stats(&self, grain: Grain) -> Result<TableStats, SinkError>;
}

/// Mutex-guarded in-memory sink with per-country failure injection, for
/// exercising partial-failure paths without a database.
#[derive(Default)]
pub struct InMemoryForecastSink {
    rows: Mutex<HashMap<Grain, Vec<ForecastRecord>>>,
    fail_insert_for: Mutex<Option<Country>>,
    fail_clear: Mutex<bool>,
}

impl InMemoryForecastSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any insert batch containing a record for `country` will fail.
    pub fn set_fail_insert_for(&self, country: Country) {
        *self.fail_insert_for.lock().unwrap_or_else(|e| e.into_inner()) = Some(country);
    }

    pub fn set_fail_clear(&self, fail: bool) {
        *self.fail_clear.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn rows(&self, grain: Grain) -> Vec<ForecastRecord> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&grain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, grain: Grain) -> usize {
        self.rows(grain).len()
    }
}

#[async_trait]
impl ForecastSink for InMemoryForecastSink {
    async fn clear(&self, grain: Grain, country: Option<Country>) -> Result<u64, SinkError> {
        if *self.fail_clear.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(SinkError::Unavailable("connection refused".to_string()));
        }
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let table = rows.entry(grain).or_default();
        let before = table.len();
        match country {
            Some(country) => table.retain(|r| r.country != country),
            None => table.clear(),
        }
        Ok((before - table.len()) as u64)
    }

    async fn insert(&self, grain: Grain, records: &[ForecastRecord]) -> Result<u64, SinkError> {
        let poison = *self.fail_insert_for.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(country) = poison {
            if records.iter().any(|r| r.country == country) {
                return Err(SinkError::Query(format!(
                    "insert rejected for {country}"
                )));
            }
        }
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.entry(grain).or_default().extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn stats(&self, grain: Grain) -> Result<TableStats, SinkError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let table = rows.get(&grain).map(Vec::as_slice).unwrap_or(&[]);
        Ok(TableStats {
            total_records: table.len() as i64,
            india_records: table.iter().filter(|r| r.country == Country::India).count() as i64,
            usa_records: table.iter().filter(|r| r.country == Country::Usa).count() as i64,
            earliest_date: table.iter().map(|r| r.item_date).min(),
            latest_date: table.iter().map(|r| r.item_date).max(),
        })
    }
}
