use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{Country, CountryCatalog};
use crate::errors::GenerationError;
use crate::generator::{
    monthly_records_for_product, weekly_records_for_product, GenerationContext,
};
use crate::seasonality::SeasonalityTable;
use crate::sink::{ForecastSink, Grain, TableStats};

/// Terminal state of a finished run. Intermediate progress shows up in the
/// workflow log entries, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Done,
    FailedPartial,
}

/// Per-country outcome of a run. `products_count` is the full catalog size;
/// products skipped over estimation failures still count toward it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CountryRunResult {
    pub success: bool,
    pub message: String,
    pub records_count: u64,
    pub products_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CountryOutcome {
    pub country: Country,
    pub result: CountryRunResult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowLogEntry {
    pub step: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Summary of a full run across both countries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub state: RunState,
    pub grain: Grain,
    pub reference_date: NaiveDate,
    pub duration_seconds: f64,
    pub cleared_records: u64,
    pub final_stats: Option<TableStats>,
    pub workflow_logs: Vec<WorkflowLogEntry>,
    pub results: Vec<CountryOutcome>,
}

/// Drives a generation run end to end: clear, generate per country, insert,
/// report. A country that fails leaves the other country's data intact.
pub struct GenerationService<'a> {
    sink: &'a dyn ForecastSink,
    seasonality_dir: PathBuf,
}

impl<'a> GenerationService<'a> {
    pub fn new(sink: &'a dyn ForecastSink, seasonality_dir: impl Into<PathBuf>) -> Self {
        Self { sink, seasonality_dir: seasonality_dir.into() }
    }

    fn seasonality_path(&self, catalog: &CountryCatalog) -> PathBuf {
        self.seasonality_dir.join(catalog.seasonality_file)
    }

    /// Generates and inserts every product batch for one country. Estimation
    /// failures skip the product; insert failure fails the whole country.
    pub async fn generate_country(
        &self,
        grain: Grain,
        country: Country,
        reference_date: NaiveDate,
        rng: &mut StdRng,
    ) -> CountryRunResult {
        let catalog = CountryCatalog::for_country(country);
        let table = SeasonalityTable::load(&self.seasonality_path(&catalog));
        if table.is_empty() {
            info!(%country, "no seasonality entries loaded, generating from defaults");
        }

        let ctx = GenerationContext::new(&catalog, &table, reference_date);
        let products = catalog.products();
        let products_count = products.len();
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for product in &products {
            let batch = match grain {
                Grain::Monthly => monthly_records_for_product(product, &ctx, rng),
                Grain::Weekly => weekly_records_for_product(product, &ctx, rng),
            };
            match batch {
                Ok(batch) => records.extend(batch),
                Err(error) => {
                    skipped += 1;
                    warn!(
                        %country,
                        sku = %product.sku_code,
                        %error,
                        "skipping product after generation failure"
                    );
                }
            }
        }

        match self.sink.insert(grain, &records).await {
            Ok(inserted) => {
                let message = if skipped == 0 {
                    format!("generated {inserted} {grain} records for {country}")
                } else {
                    format!(
                        "generated {inserted} {grain} records for {country}, skipped {skipped} products"
                    )
                };
                info!(%country, inserted, skipped, "country generation complete");
                CountryRunResult { success: true, message, records_count: inserted, products_count }
            }
            Err(error) => {
                warn!(%country, %error, "insert failed, country run abandoned");
                CountryRunResult {
                    success: false,
                    message: format!("insert failed for {country}: {error}"),
                    records_count: 0,
                    products_count,
                }
            }
        }
    }

    /// Full run for one grain: truncate the table, then generate both
    /// countries. A clear failure aborts the run; a country failure is
    /// reported but does not stop the other country.
    pub async fn generate_all(
        &self,
        grain: Grain,
        reference_date: NaiveDate,
    ) -> Result<RunReport, GenerationError> {
        let started = Instant::now();
        let mut logs = Vec::new();
        log_step(&mut logs, "clear", format!("truncating {} table", grain.table_name()));

        let cleared = self.sink.clear(grain, None).await?;
        log_step(&mut logs, "clear", format!("removed {cleared} existing records"));

        let mut rng = StdRng::from_entropy();
        let mut results = Vec::with_capacity(Country::ALL.len());
        for country in Country::ALL {
            log_step(&mut logs, "generate", format!("generating {grain} data for {country}"));
            let result = self.generate_country(grain, country, reference_date, &mut rng).await;
            log_step(&mut logs, "generate", result.message.clone());
            results.push(CountryOutcome { country, result });
        }

        let final_stats = match self.sink.stats(grain).await {
            Ok(stats) => Some(stats),
            Err(error) => {
                warn!(%error, "could not collect final table stats");
                None
            }
        };

        let success = results.iter().all(|outcome| outcome.result.success);
        let state = if success { RunState::Done } else { RunState::FailedPartial };
        log_step(&mut logs, "finish", format!("run finished in state {state:?}"));

        Ok(RunReport {
            success,
            state,
            grain,
            reference_date,
            duration_seconds: started.elapsed().as_secs_f64(),
            cleared_records: cleared,
            final_stats,
            workflow_logs: logs,
            results,
        })
    }

    /// Deletes rows for one grain, optionally scoped to a country.
    pub async fn clear(
        &self,
        grain: Grain,
        country: Option<Country>,
    ) -> Result<u64, GenerationError> {
        let deleted = self.sink.clear(grain, country).await?;
        info!(%grain, ?country, deleted, "cleared forecast records");
        Ok(deleted)
    }

    pub async fn stats(&self, grain: Grain) -> Result<TableStats, GenerationError> {
        Ok(self.sink.stats(grain).await?)
    }

    pub fn seasonality_dir(&self) -> &Path {
        &self.seasonality_dir
    }
}

fn log_step(logs: &mut Vec<WorkflowLogEntry>, step: &str, message: String) {
    info!(step, "{message}");
    logs.push(WorkflowLogEntry { step: step.to_string(), message, timestamp: Utc::now() });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::catalog::Country;
    use crate::sink::{Grain, InMemoryForecastSink};

    use super::{GenerationService, RunState};

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn full_monthly_run_covers_both_countries() {
        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");

        let report = service.generate_all(Grain::Monthly, reference()).await.unwrap();
        assert!(report.success);
        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.cleared_records, 0);
        assert_eq!(report.results.len(), 2);
        for outcome in &report.results {
            // 120 products x 55 periods x 3 models per country.
            assert!(outcome.result.success);
            assert_eq!(outcome.result.records_count, 19_800);
            assert_eq!(outcome.result.products_count, 120);
        }

        let stats = report.final_stats.unwrap();
        assert_eq!(stats.total_records, 39_600);
        assert_eq!(stats.india_records, 19_800);
        assert_eq!(stats.usa_records, 19_800);
        assert!(!report.workflow_logs.is_empty());
    }

    #[tokio::test]
    async fn monthly_run_emits_may_and_october_periods_with_the_lift_applied() {
        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");
        service.generate_all(Grain::Monthly, reference()).await.unwrap();

        let rows = sink.rows(Grain::Monthly);
        let sambhar: Vec<_> = rows
            .iter()
            .filter(|r| {
                r.sku_code == "SKU-SAMBHAR"
                    && r.state == "Karnataka"
                    && r.plant == "Kar123"
                    && r.channel == crate::catalog::Channel::Gt
                    && r.model_name == "XGBoost"
            })
            .collect();
        assert_eq!(sambhar.len(), 55);
        assert!(sambhar.iter().any(|r| r.month_label == "May 2025"));
        assert!(sambhar.iter().any(|r| r.month_label == "October 2025"));

        for year in [2023, 2024] {
            let may = sambhar
                .iter()
                .find(|r| r.month_label == format!("May {year}"))
                .and_then(|r| r.actual_units)
                .unwrap();
            let october = sambhar
                .iter()
                .find(|r| r.month_label == format!("October {year}"))
                .and_then(|r| r.actual_units)
                .unwrap();
            assert!(october >= may);
        }
    }

    #[tokio::test]
    async fn insert_failure_for_one_country_leaves_a_partial_run() {
        let sink = InMemoryForecastSink::new();
        sink.set_fail_insert_for(Country::Usa);
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");

        let report = service.generate_all(Grain::Monthly, reference()).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.state, RunState::FailedPartial);

        let india = report.results.iter().find(|o| o.country == Country::India).unwrap();
        assert!(india.result.success);
        let usa = report.results.iter().find(|o| o.country == Country::Usa).unwrap();
        assert!(!usa.result.success);
        assert_eq!(usa.result.records_count, 0);

        let stats = report.final_stats.unwrap();
        assert_eq!(stats.india_records, 19_800);
        assert_eq!(stats.usa_records, 0);
    }

    #[tokio::test]
    async fn unusable_seasonality_range_skips_the_product_not_the_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let poisoned = serde_json::json!([{
            "state": "Karnataka",
            "category": "Masala",
            "plat": "Kar123",
            "product_name": "Sambhar Powder - 100gm",
            "min": 4000.0,
            "max": 2500.0,
        }]);
        std::fs::write(dir.path().join("output.json"), poisoned.to_string()).unwrap();

        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, dir.path());
        let mut rng = StdRng::seed_from_u64(11);
        let result =
            service.generate_country(Grain::Monthly, Country::India, reference(), &mut rng).await;

        assert!(result.success);
        assert_eq!(result.products_count, 120);
        // The inverted range hits both channels of one plant/SKU cell:
        // (120 - 2) products x 165 records each.
        assert_eq!(result.records_count, 19_470);
        assert!(result.message.contains("skipped 2 products"), "unexpected: {}", result.message);
    }

    #[tokio::test]
    async fn clear_failure_aborts_the_run() {
        let sink = InMemoryForecastSink::new();
        sink.set_fail_clear(true);
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");
        assert!(service.generate_all(Grain::Monthly, reference()).await.is_err());
        assert_eq!(sink.row_count(Grain::Monthly), 0);
    }

    #[tokio::test]
    async fn weekly_run_populates_week_detail_on_every_record() {
        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");

        let report = service.generate_all(Grain::Weekly, reference()).await.unwrap();
        assert!(report.success);

        let rows = sink.rows(Grain::Weekly);
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.week_detail.is_some()));
    }

    #[tokio::test]
    async fn rerun_replaces_previous_data_instead_of_appending() {
        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");

        service.generate_all(Grain::Monthly, reference()).await.unwrap();
        let report = service.generate_all(Grain::Monthly, reference()).await.unwrap();
        assert_eq!(report.cleared_records, 39_600);
        assert_eq!(sink.row_count(Grain::Monthly), 39_600);
    }

    #[tokio::test]
    async fn scoped_clear_reports_deleted_rows() {
        let sink = InMemoryForecastSink::new();
        let service = GenerationService::new(&sink, "/nonexistent/seasonality");
        service.generate_all(Grain::Monthly, reference()).await.unwrap();

        let deleted = service.clear(Grain::Monthly, Some(Country::India)).await.unwrap();
        assert_eq!(deleted, 19_800);
        let stats = service.stats(Grain::Monthly).await.unwrap();
        assert_eq!(stats.india_records, 0);
        assert_eq!(stats.usa_records, 19_800);
    }
}
