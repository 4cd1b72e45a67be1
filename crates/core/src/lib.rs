pub mod calendar;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod estimator;
pub mod generator;
pub mod orchestrator;
pub mod seasonality;
pub mod sink;
pub mod synthesizer;

pub use calendar::{MonthName, MonthPeriod, WeekPeriod};
pub use catalog::{Category, Channel, Country, CountryCatalog, Product};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{CalendarError, EstimatorError, GenerationError};
pub use generator::{monthly_records_for_product, weekly_records_for_product, GenerationContext};
pub use orchestrator::{
    CountryOutcome, CountryRunResult, GenerationService, RunReport, RunState, WorkflowLogEntry,
};
pub use seasonality::{SeasonalityEntry, SeasonalityTable};
pub use sink::{ForecastSink, Grain, InMemoryForecastSink, SinkError, TableStats};
pub use synthesizer::{ForecastRecord, ModelSpec, WeekDetail, MODELS};
