use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migrations that have not been applied yet.
///
/// Version 1 creates the verb catalog, recorded sessions and per-verb error counts.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS verbs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    infinitive TEXT NOT NULL,
                    past_simple TEXT NOT NULL,
                    past_participle TEXT NOT NULL,
                    french TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Sessions outlive catalog edits, so verb ids are not foreign keys.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_sessions (
                    id INTEGER PRIMARY KEY,
                    status TEXT NOT NULL CHECK (status IN ('active', 'paused', 'completed')),
                    started_at TEXT NOT NULL,
                    paused_at TEXT,
                    completed_at TEXT,
                    total_correct INTEGER NOT NULL DEFAULT 0 CHECK (total_correct >= 0),
                    total_errors INTEGER NOT NULL DEFAULT 0 CHECK (total_errors >= 0),
                    rounds INTEGER NOT NULL DEFAULT 0 CHECK (rounds >= 0),
                    snapshot TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_verb_errors (
                    session_id INTEGER NOT NULL,
                    verb_id INTEGER NOT NULL,
                    errors INTEGER NOT NULL CHECK (errors >= 0),
                    PRIMARY KEY (session_id, verb_id),
                    FOREIGN KEY (session_id) REFERENCES quiz_sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_verbs_infinitive ON verbs(infinitive);")
            .execute(&mut *tx)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_verbs_french ON verbs(french);")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_sessions_status_paused
                    ON quiz_sessions (status, paused_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
