use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::config::AppConfig;

pub type Tx = Transaction<'static, Postgres>;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    tracing::info!("connected to postgres");
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Opens a unit of work. Commit is explicit; dropping the transaction rolls it back.
pub async fn begin(db: &PgPool) -> Result<Tx, sqlx::Error> {
    db.begin().await
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
