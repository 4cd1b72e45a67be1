pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use demandgen_core::config::{AppConfig, LoadOptions};
use demandgen_core::sink::Grain;

#[derive(Debug, Parser)]
#[command(
    name = "demandgen",
    about = "Synthetic demand forecast data generator",
    long_about = "Generate, clear, and inspect seasonality-aware synthetic demand forecast data \
                  for the monthly and weekly fact tables.",
    after_help = "Examples:\n  demandgen migrate\n  demandgen generate --grain weekly\n  demandgen generate --country india --reference-date 2025-06-15\n  demandgen stats --grain monthly"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GrainArg {
    Monthly,
    Weekly,
}

impl From<GrainArg> for Grain {
    fn from(value: GrainArg) -> Self {
        match value {
            GrainArg::Monthly => Grain::Monthly,
            GrainArg::Weekly => Grain::Weekly,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Regenerate forecast data, replacing whatever the table currently holds")]
    Generate {
        #[arg(long, value_enum, default_value = "monthly", help = "Which fact table to fill")]
        grain: GrainArg,
        #[arg(long, help = "Limit the run to one country (india or usa)")]
        country: Option<String>,
        #[arg(long, help = "Anchor date for the generation window, defaults to today")]
        reference_date: Option<NaiveDate>,
        #[arg(long, help = "Directory holding the seasonality JSON files")]
        seasonality_dir: Option<PathBuf>,
    },
    #[command(about = "Delete forecast rows for one grain, optionally scoped to a country")]
    Clear {
        #[arg(long, value_enum, default_value = "monthly", help = "Which fact table to clear")]
        grain: GrainArg,
        #[arg(long, help = "Limit the delete to one country (india or usa)")]
        country: Option<String>,
    },
    #[command(about = "Report row counts and date coverage for one fact table")]
    Stats {
        #[arg(long, value_enum, default_value = "monthly", help = "Which fact table to inspect")]
        grain: GrainArg,
    },
}

fn init_logging(config: &AppConfig) {
    use demandgen_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Generate { grain, country, reference_date, seasonality_dir } => {
            commands::generate::run(grain.into(), country, reference_date, seasonality_dir)
        }
        Command::Clear { grain, country } => commands::clear::run(grain.into(), country),
        Command::Stats { grain } => commands::stats::run(grain.into()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
