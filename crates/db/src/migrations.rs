use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use demandgen_core::config::DatabaseConfig;
    use sqlx::Row;

    use super::{run_pending, MIGRATOR};
    use crate::{connect, DbPool};

    const FACT_TABLES: &[&str] = &["demand_forecast", "weekly_demand_forecast"];

    const FACT_INDEXES: &[&str] = &[
        "idx_demand_forecast_country",
        "idx_demand_forecast_item_date",
        "idx_demand_forecast_sku_code",
        "idx_weekly_demand_forecast_country",
        "idx_weekly_demand_forecast_item_date",
        "idx_weekly_demand_forecast_sku_code",
    ];

    async fn memory_pool() -> DbPool {
        let settings = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            timeout_secs: 30,
        };
        connect(&settings).await.expect("connect")
    }

    async fn schema_objects(pool: &DbPool, kind: &str) -> Vec<(String, String)> {
        let mut objects: Vec<(String, String)> = sqlx::query(
            "SELECT name, IFNULL(sql, '') AS sql FROM sqlite_master WHERE type = ?",
        )
        .bind(kind)
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("sql")))
        .filter(|(name, _)| {
            FACT_TABLES.contains(&name.as_str()) || FACT_INDEXES.contains(&name.as_str())
        })
        .collect();
        objects.sort();
        objects
    }

    #[tokio::test]
    async fn migrations_create_both_fact_tables_and_their_indexes() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        let tables = schema_objects(&pool, "table").await;
        assert_eq!(tables.len(), FACT_TABLES.len());

        let indexes = schema_objects(&pool, "index").await;
        assert_eq!(indexes.len(), FACT_INDEXES.len());
    }

    #[tokio::test]
    async fn undo_removes_everything_the_migrations_created() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert!(schema_objects(&pool, "table").await.is_empty());
        assert!(schema_objects(&pool, "index").await.is_empty());
    }

    #[tokio::test]
    async fn up_down_up_lands_on_the_same_schema() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");
        let first = schema_objects(&pool, "table").await;

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        run_pending(&pool).await.expect("re-run migrations");

        let second = schema_objects(&pool, "table").await;
        assert_eq!(first, second, "rerunning migrations should rebuild identical tables");
    }
}
