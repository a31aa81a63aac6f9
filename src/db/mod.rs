pub(crate) mod models;
pub(crate) mod types;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

use crate::core::config::Settings;

pub(crate) async fn init_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    let database_url = settings.database().database_url();
    let mut connect_options: PgConnectOptions = database_url.parse()?;

    connect_options = connect_options
        .application_name("lm-platform")
        .log_statements(tracing::log::LevelFilter::Off);

    PgPoolOptions::new()
        .max_connections(settings.database().max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
}

pub(crate) async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// SQLSTATE 23505: a unique or primary-key constraint rejected the write.
/// Returns the violated constraint name.
pub(crate) fn unique_violation(error: &sqlx::Error) -> Option<&str> {
    violated_constraint(error, "23505")
}

/// SQLSTATE 23503: a referenced row does not exist (or vanished mid-request).
pub(crate) fn foreign_key_violation(error: &sqlx::Error) -> Option<&str> {
    violated_constraint(error, "23503")
}

fn violated_constraint<'e>(error: &'e sqlx::Error, code: &str) -> Option<&'e str> {
    match error {
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some(code) => {
            Some(db_error.constraint().unwrap_or_default())
        }
        _ => None,
    }
}
