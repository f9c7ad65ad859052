use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    // Health check
    careloop_db::health_check(&pool).await.unwrap();

    // Verify the three entity tables exist and are queryable.
    let tables = ["users", "medications", "dose_events"];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// The updated_at trigger fires on every table.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_updated_at_trigger_installed(pool: PgPool) {
    let triggers: Vec<(String,)> = sqlx::query_as(
        "SELECT event_object_table \
         FROM information_schema.triggers \
         WHERE trigger_schema = 'public' \
         GROUP BY event_object_table \
         ORDER BY event_object_table",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let tables: Vec<&str> = triggers.iter().map(|(t,)| t.as_str()).collect();
    assert_eq!(tables, vec!["dose_events", "medications", "users"]);
}
