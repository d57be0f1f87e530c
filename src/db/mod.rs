pub mod models;
pub mod store;

pub use store::TipStore;

/// Fresh in-memory database with the schema applied. A single connection,
/// since every `sqlite::memory:` connection is its own database.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");
    pool
}
