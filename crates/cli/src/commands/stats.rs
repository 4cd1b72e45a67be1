use demandgen_core::config::LoadOptions;
use demandgen_core::sink::{ForecastSink, Grain};
use demandgen_db::SqlForecastSink;

use crate::commands::{build_runtime, load_config, open_pool, CommandFailure, CommandResult};

pub fn run(grain: Grain) -> CommandResult {
    let config = match load_config("stats", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("stats") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let sink = SqlForecastSink::new(pool.clone());
        let stats = sink.stats(grain).await.map_err(|error| ("stats", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, CommandFailure>(stats)
    });

    match result {
        Ok(stats) => {
            let coverage = match (stats.earliest_date, stats.latest_date) {
                (Some(earliest), Some(latest)) => format!("{earliest}..{latest}"),
                _ => "no dates".to_string(),
            };
            let message = format!(
                "{}: {} records (India {}, USA {}), {coverage}",
                grain.table_name(),
                stats.total_records,
                stats.india_records,
                stats.usa_records
            );
            CommandResult::success_with_details("stats", message, serde_json::to_value(&stats).ok())
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("stats", error_class, message, exit_code)
        }
    }
}
