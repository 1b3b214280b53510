//! Forward-only, idempotent schema setup.

use sqlx::SqlitePool;

use crate::error::StoreResult;

/// Create the `jobs` table and its indexes if they do not already exist, then
/// run the one-time legacy-status rewrite.
pub async fn run(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_path TEXT NOT NULL,
            metadata_json TEXT,
            user_feedback TEXT,
            artist_hint TEXT,
            status TEXT NOT NULL,
            job_type TEXT NOT NULL,
            error TEXT,
            result_json TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            started_at TEXT,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_folder_path ON jobs(folder_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_job_type ON jobs(job_type)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    migrate_legacy_statuses(pool).await?;

    Ok(())
}

/// Historical statuses `in_progress`, `approved` (meaning `ready`), `failed`,
/// and `completed` (also meaning `ready`, before the terminal `completed`
/// status existed) are not part of the target model. This rewrite runs
/// exactly once, ever, against a database's entire lifetime (tracked via
/// `schema_migrations`) — on a genuine legacy database this is the very
/// first connection, before any modern code has had a chance to write a row
/// whose `completed` genuinely means the terminal state; on a fresh database
/// there are no rows yet, so the rewrite is a no-op and the gate is set so
/// that every `completed` row written from then on keeps its modern meaning.
async fn migrate_legacy_statuses(pool: &SqlitePool) -> StoreResult<()> {
    let already_applied: Option<(String,)> =
        sqlx::query_as("SELECT name FROM schema_migrations WHERE name = ?")
            .bind("legacy_status_rewrite")
            .fetch_optional(pool)
            .await?;

    if already_applied.is_some() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE jobs SET status = 'analyzing' WHERE status = 'in_progress'")
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE jobs SET status = 'ready' WHERE status = 'completed'")
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE jobs SET status = 'ready' WHERE status = 'approved'")
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE jobs SET status = 'error' WHERE status = 'failed'")
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO schema_migrations (name) VALUES (?)")
        .bind("legacy_status_rewrite")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
