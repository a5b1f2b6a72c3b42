use sqlx::migrate::Migrator;

use super::{DbPool, DbPoolError};

/// Schema for every table the report engine reads.
static SCHEMA: Migrator = sqlx::migrate!("../../migrations");

/// Applies pending migrations and returns how many the schema defines.
pub async fn run_migrations(pool: &DbPool) -> Result<usize, DbPoolError> {
    SCHEMA.run(pool).await?;
    Ok(SCHEMA.iter().count())
}
