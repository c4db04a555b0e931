use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::time::Duration;
use tracing::info;
use tubesense_core::config::DatabaseConfig;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open the analysis database described by `config` and apply migrations.
pub async fn init_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let db_path = &config.sqlite_path;
    info!("Initializing database at: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let journal_mode = if config.enable_wal {
        SqliteJournalMode::Wal
    } else {
        SqliteJournalMode::Delete
    };
    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(journal_mode)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect_with(connect_options)
        .await?;

    run_migrations(&pool).await?;
    info!("Database initialized");
    Ok(pool)
}

/// Apply embedded migrations to an existing pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

pub mod repository;
pub use repository::*;
