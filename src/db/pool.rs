use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// The pool is the only shared resource in the process; aggregation and
/// statistics run on data already fetched through it.
pub async fn create_pool(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
        .expect("Failed to create database pool")
}
