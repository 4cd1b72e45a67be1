use demandgen_core::catalog::Country;
use demandgen_core::config::LoadOptions;
use demandgen_core::sink::{ForecastSink, Grain};
use demandgen_db::SqlForecastSink;
use serde_json::json;

use crate::commands::{build_runtime, load_config, open_pool, CommandFailure, CommandResult};

pub fn run(grain: Grain, country: Option<String>) -> CommandResult {
    let country = match country {
        Some(raw) => match Country::parse(&raw) {
            Some(country) => Some(country),
            None => {
                return CommandResult::failure(
                    "clear",
                    "usage",
                    format!("unknown country `{raw}` (expected india or usa)"),
                    2,
                );
            }
        },
        None => None,
    };

    let config = match load_config("clear", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("clear") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let sink = SqlForecastSink::new(pool.clone());
        let deleted =
            sink.clear(grain, country).await.map_err(|error| ("clear", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<u64, CommandFailure>(deleted)
    });

    match result {
        Ok(deleted) => {
            let scope = match country {
                Some(country) => format!(" for {country}"),
                None => String::new(),
            };
            CommandResult::success_with_details(
                "clear",
                format!("removed {deleted} records from {}{scope}", grain.table_name()),
                Some(json!({ "rows_deleted": deleted })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("clear", error_class, message, exit_code)
        }
    }
}
