use std::env;
use std::sync::{Mutex, OnceLock};

use demandgen_cli::commands::{clear, generate, migrate, stats};
use demandgen_core::sink::Grain;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("DEMANDGEN_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("DEMANDGEN_DATABASE_URL", "postgres://example")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn stats_on_a_fresh_database_reports_zero_records() {
    with_env(
        &[
            ("DEMANDGEN_DATABASE_URL", "sqlite::memory:"),
            ("DEMANDGEN_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = stats::run(Grain::Monthly);
            assert_eq!(result.exit_code, 0, "expected successful stats run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "stats");
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("demand_forecast: 0 records"), "unexpected: {message}");
            assert_eq!(payload["details"]["total_records"], 0);
        },
    );
}

#[test]
fn clear_rejects_an_unknown_country() {
    with_env(&[("DEMANDGEN_DATABASE_URL", "sqlite::memory:")], || {
        let result = clear::run(Grain::Monthly, Some("germany".to_string()));
        assert_eq!(result.exit_code, 2, "expected usage failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "clear");
        assert_eq!(payload["error_class"], "usage");
    });
}

#[test]
fn generate_rejects_an_unknown_country() {
    with_env(&[("DEMANDGEN_DATABASE_URL", "sqlite::memory:")], || {
        let result = generate::run(Grain::Monthly, Some("germany".to_string()), None, None);
        assert_eq!(result.exit_code, 2, "expected usage failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "generate");
        assert_eq!(payload["error_class"], "usage");
    });
}

#[test]
fn generate_scoped_to_one_country_succeeds_in_memory() {
    with_env(
        &[
            ("DEMANDGEN_DATABASE_URL", "sqlite::memory:"),
            ("DEMANDGEN_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let reference = "2025-06-15".parse().ok();
            let result = generate::run(Grain::Monthly, Some("india".to_string()), reference, None);
            assert_eq!(result.exit_code, 0, "expected successful generate run: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "generate");
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("19800"), "unexpected message: {message}");
            assert!(message.contains("India"), "unexpected message: {message}");
            assert_eq!(payload["details"]["records_count"], 19800);
            assert_eq!(payload["details"]["products_count"], 120);
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DEMANDGEN_DATABASE_URL",
        "DEMANDGEN_DATABASE_MAX_CONNECTIONS",
        "DEMANDGEN_DATABASE_TIMEOUT_SECS",
        "DEMANDGEN_SEASONALITY_DIR",
        "DEMANDGEN_LOGGING_LEVEL",
        "DEMANDGEN_LOGGING_FORMAT",
        "DEMANDGEN_LOG_LEVEL",
        "DEMANDGEN_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
