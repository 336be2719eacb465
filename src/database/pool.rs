use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Builds the pool without connecting; the startup probe reports reachability.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect_lazy(database_url)?;
    Ok(pool)
}
