use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use demandgen_core::catalog::Country;
use demandgen_core::config::{ConfigOverrides, LoadOptions};
use demandgen_core::orchestrator::{CountryRunResult, GenerationService, RunReport};
use demandgen_core::sink::Grain;
use demandgen_db::SqlForecastSink;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::commands::{build_runtime, load_config, open_pool, CommandFailure, CommandResult};

enum RunOutput {
    Country(CountryRunResult),
    Full(RunReport),
}

pub fn run(
    grain: Grain,
    country: Option<String>,
    reference_date: Option<NaiveDate>,
    seasonality_dir: Option<PathBuf>,
) -> CommandResult {
    let country = match country {
        Some(raw) => match Country::parse(&raw) {
            Some(country) => Some(country),
            None => {
                return CommandResult::failure(
                    "generate",
                    "usage",
                    format!("unknown country `{raw}` (expected india or usa)"),
                    2,
                );
            }
        },
        None => None,
    };

    let options = LoadOptions {
        overrides: ConfigOverrides { seasonality_dir, ..ConfigOverrides::default() },
        ..LoadOptions::default()
    };
    let config = match load_config("generate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("generate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    // The wall clock only enters here; everything below runs off the anchor.
    let reference_date = reference_date.unwrap_or_else(|| Utc::now().date_naive());

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let sink = SqlForecastSink::new(pool.clone());
        let service = GenerationService::new(&sink, config.generator.seasonality_dir.clone());

        let output = match country {
            Some(country) => {
                service
                    .clear(grain, Some(country))
                    .await
                    .map_err(|error| ("generation", error.to_string(), 6u8))?;
                let mut rng = StdRng::from_entropy();
                let outcome =
                    service.generate_country(grain, country, reference_date, &mut rng).await;
                RunOutput::Country(outcome)
            }
            None => {
                let report = service
                    .generate_all(grain, reference_date)
                    .await
                    .map_err(|error| ("generation", error.to_string(), 6u8))?;
                RunOutput::Full(report)
            }
        };

        pool.close().await;
        Ok::<RunOutput, CommandFailure>(output)
    });

    match result {
        Ok(RunOutput::Country(outcome)) => {
            let details = serde_json::to_value(&outcome).ok();
            if outcome.success {
                CommandResult::success_with_details("generate", outcome.message.clone(), details)
            } else {
                CommandResult::failure_with_details(
                    "generate",
                    "generation",
                    outcome.message.clone(),
                    6,
                    details,
                )
            }
        }
        Ok(RunOutput::Full(report)) => {
            let summary = report
                .results
                .iter()
                .map(|outcome| outcome.result.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            let details = serde_json::to_value(&report).ok();
            if report.success {
                CommandResult::success_with_details(
                    "generate",
                    format!("{summary} in {:.1}s", report.duration_seconds),
                    details,
                )
            } else {
                CommandResult::failure_with_details(
                    "generate",
                    "generation_partial",
                    summary,
                    6,
                    details,
                )
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("generate", error_class, message, exit_code)
        }
    }
}
