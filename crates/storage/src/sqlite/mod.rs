use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{SessionRecorder, Storage, VerbRepository};

mod mapping;
mod migrate;
mod session_repo;
mod verb_repo;

/// Applied to every pooled connection.
const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

/// Verb catalog and session recorder backed by one SQLite database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open the quiz database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a connection
    /// pragma is refused.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the `verbs`, `quiz_sessions` and `session_verb_errors` tables up to the
    /// latest schema version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration step fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Catalog and recorder sharing one migrated SQLite database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let verbs: Arc<dyn VerbRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRecorder> = Arc::new(repo);
        Ok(Self { verbs, sessions })
    }
}
