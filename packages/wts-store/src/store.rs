//! The job store: a durable, process-safe queue with a strict state machine.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use wts_config::StoreConfig;

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::model::{Job, JobStatus, JobType, Proposal};

/// Durable, process-safe queue of jobs with a strict state machine,
/// claim-and-advance semantics, and a small query surface. This is the
/// system's only shared mutable state: every other component holds only
/// process-local state.
#[derive(Debug, Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Connect to (creating if absent) the configured database file, apply
    /// WAL journaling and `synchronous=NORMAL`, and run schema migrations.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.connection_string())
            .map_err(StoreError::StoreUnavailable)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        migrations::run(&store.pool).await?;
        Ok(store)
    }

    /// Wrap an already-open pool (used by tests and in-memory stores).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        migrations::run(&self.pool).await
    }

    /// Insert a new job row in `queued` status.
    pub async fn enqueue(
        &self,
        folder_path: &str,
        job_type: JobType,
        metadata_json: Option<&str>,
        user_feedback: Option<&str>,
        artist_hint: Option<&str>,
    ) -> StoreResult<Job> {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO jobs (folder_path, job_type, status, metadata_json, user_feedback, artist_hint)
            VALUES (?, ?, 'queued', ?, ?, ?)
            "#,
        )
        .bind(folder_path)
        .bind(job_type.as_str())
        .bind(metadata_json)
        .bind(user_feedback)
        .bind(artist_hint)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(id).await?.ok_or_else(|| {
            StoreError::NotFound(format!("job {id} vanished immediately after insert"))
        })
    }

    /// Existence check used by the Scanner to avoid re-enqueueing a folder.
    pub async fn has_any_for_folder(
        &self,
        folder_path: &str,
        statuses: Option<&[JobStatus]>,
    ) -> StoreResult<bool> {
        let statuses = statuses.unwrap_or(&JobStatus::ALL);
        let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT 1 FROM jobs WHERE folder_path = ? AND status IN ({placeholders}) LIMIT 1"
        );

        let mut query = sqlx::query(&sql).bind(folder_path);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        Ok(query.fetch_optional(&self.pool).await?.is_some())
    }

    /// `BEGIN IMMEDIATE` select-then-update claim of the oldest `queued` job,
    /// prioritizing `scan` jobs over `analyze` jobs so scans cannot starve.
    pub async fn claim_queued_for_analysis(&self) -> StoreResult<Option<Job>> {
        self.claim_one(
            "SELECT id FROM jobs WHERE status = 'queued' \
             ORDER BY CASE WHEN job_type = 'scan' THEN 0 ELSE 1 END, id ASC LIMIT 1",
            JobStatus::Analyzing,
        )
        .await
    }

    /// `BEGIN IMMEDIATE` select-then-update claim of the oldest `accepted` job.
    pub async fn claim_accepted_for_move(&self) -> StoreResult<Option<Job>> {
        self.claim_one(
            "SELECT id FROM jobs WHERE status = 'accepted' ORDER BY id ASC LIMIT 1",
            JobStatus::Moving,
        )
        .await
    }

    async fn claim_one(&self, select_sql: &str, claim_status: JobStatus) -> StoreResult<Option<Job>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let row: Option<(i64,)> = match sqlx::query_as(select_sql).fetch_optional(&mut *conn).await {
            Ok(row) => row,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e.into());
            }
        };

        let Some((id,)) = row else {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            return Ok(None);
        };

        if let Err(e) = sqlx::query(
            "UPDATE jobs SET status = ?, started_at = strftime('%Y-%m-%dT%H:%M:%SZ','now'), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(claim_status.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await
        {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(e.into());
        }

        sqlx::query("COMMIT").execute(&mut *conn).await?;
        drop(conn);

        self.get_by_id(id).await
    }

    /// `analyzing → ready`, storing the generated proposal.
    pub async fn approve(&self, job_id: i64, proposal: &Proposal) -> StoreResult<()> {
        let job = self.require_job(job_id).await?;
        if job.status != JobStatus::Analyzing {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status.to_string(),
                to: JobStatus::Ready.to_string(),
            });
        }

        let result_json = serde_json::to_string(proposal)?;
        sqlx::query(
            "UPDATE jobs SET status = 'ready', result_json = ?, error = NULL, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(result_json)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Any in-flight status (`analyzing`, `moving`) → `error`, the only exit
    /// from a worker-held job that fails.
    pub async fn fail(&self, job_id: i64, message: &str) -> StoreResult<()> {
        let job = self.require_job(job_id).await?;
        if !matches!(job.status, JobStatus::Analyzing | JobStatus::Moving) {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status.to_string(),
                to: JobStatus::Error.to_string(),
            });
        }

        sqlx::query(
            "UPDATE jobs SET status = 'error', error = ?, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `analyzing → completed`, used for `scan`-type jobs which have no
    /// `ready`/`accepted` phase of their own.
    pub async fn complete_scan(&self, job_id: i64) -> StoreResult<()> {
        let job = self.require_job(job_id).await?;
        if job.status != JobStatus::Analyzing {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status.to_string(),
                to: JobStatus::Completed.to_string(),
            });
        }

        sqlx::query(
            "UPDATE jobs SET status = 'completed', \
             completed_at = strftime('%Y-%m-%dT%H:%M:%SZ','now'), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `moving → completed`.
    pub async fn complete_move(&self, job_id: i64) -> StoreResult<()> {
        let job = self.require_job(job_id).await?;
        if job.status != JobStatus::Moving {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status.to_string(),
                to: JobStatus::Completed.to_string(),
            });
        }

        sqlx::query(
            "UPDATE jobs SET status = 'completed', \
             completed_at = strftime('%Y-%m-%dT%H:%M:%SZ','now'), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent proposal for a path whose current status is `ready`.
    pub async fn get_result(&self, folder_path: &str) -> StoreResult<Option<Proposal>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT result_json FROM jobs WHERE folder_path = ? AND status = 'ready' \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(folder_path)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Conditional transition addressing the newest row for a folder: only
    /// applies if its current status is one of `from_statuses`.
    pub async fn update_latest_status_for_folder(
        &self,
        folder_path: &str,
        from_statuses: &[JobStatus],
        to_status: JobStatus,
    ) -> StoreResult<Option<Job>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, status FROM jobs WHERE folder_path = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(folder_path)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, status_raw)) = row else {
            return Ok(None);
        };

        let current = JobStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::NotFound(format!("unrecognized status '{status_raw}'")))?;

        if !from_statuses.contains(&current) {
            return Err(StoreError::InvalidTransition {
                job_id: id,
                from: current.to_string(),
                to: to_status.to_string(),
            });
        }

        sqlx::query(
            "UPDATE jobs SET status = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') \
             WHERE id = ?",
        )
        .bind(to_status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// `ready -> accepted` for the newest row matching `folder_path`,
    /// optionally overwriting `result_json` with a human-edited proposal
    /// before the transition.
    pub async fn accept_proposal(
        &self,
        folder_path: &str,
        proposal: Option<&Proposal>,
    ) -> StoreResult<Option<Job>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, status FROM jobs WHERE folder_path = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(folder_path)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, status_raw)) = row else {
            return Ok(None);
        };

        let current = JobStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::NotFound(format!("unrecognized status '{status_raw}'")))?;
        if current != JobStatus::Ready {
            return Err(StoreError::InvalidTransition {
                job_id: id,
                from: current.to_string(),
                to: JobStatus::Accepted.to_string(),
            });
        }

        match proposal {
            Some(proposal) => {
                let result_json = serde_json::to_string(proposal)?;
                sqlx::query(
                    "UPDATE jobs SET status = 'accepted', result_json = ?, \
                     updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
                )
                .bind(result_json)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE jobs SET status = 'accepted', \
                     updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
                )
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }

        self.get_by_id(id).await
    }

    /// Return the newest row for a folder to `queued`, replacing its
    /// metadata and feedback and clearing everything a fresh claim would set.
    pub async fn requeue_for_reconsideration(
        &self,
        folder_path: &str,
        metadata_json: Option<&str>,
        feedback: Option<&str>,
    ) -> StoreResult<Option<Job>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM jobs WHERE folder_path = ? ORDER BY id DESC LIMIT 1")
                .bind(folder_path)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id,)) = row else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE jobs SET status = 'queued', metadata_json = ?, user_feedback = ?, \
             result_json = NULL, error = NULL, started_at = NULL, completed_at = NULL, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?",
        )
        .bind(metadata_json)
        .bind(feedback)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// The newest row for a folder, regardless of status (used to check
    /// whether every album under an artist-collection folder has completed).
    pub async fn latest_status_for_folder(&self, folder_path: &str) -> StoreResult<Option<Job>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM jobs WHERE folder_path = ? ORDER BY id DESC LIMIT 1")
                .bind(folder_path)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((id,)) => self.get_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Zero-filled histogram over all eight statuses.
    pub async fn counts(&self) -> StoreResult<HashMap<JobStatus, i64>> {
        let mut counts: HashMap<JobStatus, i64> =
            JobStatus::ALL.iter().map(|s| (*s, 0)).collect();

        let rows = sqlx::query("SELECT status, COUNT(*) as n FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let status_raw: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            if let Some(status) = JobStatus::parse(&status_raw) {
                *counts.entry(status).or_insert(0) += n;
            }
        }

        Ok(counts)
    }

    /// Newest rows first, optionally filtered to a set of statuses.
    pub async fn recent_jobs(
        &self,
        limit: i64,
        statuses: Option<&[JobStatus]>,
    ) -> StoreResult<Vec<Job>> {
        let jobs = match statuses {
            None => {
                sqlx::query("SELECT * FROM jobs ORDER BY updated_at DESC, id DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(statuses) => {
                let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!(
                    "SELECT * FROM jobs WHERE status IN ({placeholders}) \
                     ORDER BY updated_at DESC, id DESC LIMIT ?"
                );
                let mut query = sqlx::query(&sql);
                for status in statuses {
                    query = query.bind(status.as_str());
                }
                query.bind(limit).fetch_all(&self.pool).await?
            }
        };

        jobs.into_iter().map(row_to_job).collect()
    }

    /// Reset every `analyzing` job whose `started_at` is older than
    /// `max_age_secs` back to `queued`, clearing `started_at`. Returns the
    /// number of rows reset.
    pub async fn reset_stale_analyzing(&self, max_age_secs: i64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'queued', started_at = NULL, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') \
             WHERE status = 'analyzing' \
             AND started_at IS NOT NULL \
             AND (strftime('%s','now') - strftime('%s', started_at)) > ?",
        )
        .bind(max_age_secs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Administrative deletion; jobs are never otherwise destroyed.
    pub async fn delete_job(&self, job_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// True if the store has no rows at all (used to decide whether to
    /// enqueue an initial scan job on boot).
    pub async fn is_empty(&self) -> StoreResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 == 0)
    }

    pub async fn get_by_id(&self, id: i64) -> StoreResult<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_job).transpose()
    }

    async fn require_job(&self, id: i64) -> StoreResult<Job> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> StoreResult<Job> {
    let status_raw: String = row.try_get("status")?;
    let job_type_raw: String = row.try_get("job_type")?;

    let status = JobStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::NotFound(format!("unrecognized status '{status_raw}'")))?;
    let job_type = JobType::parse(&job_type_raw)
        .ok_or_else(|| StoreError::NotFound(format!("unrecognized job_type '{job_type_raw}'")))?;

    Ok(Job {
        id: row.try_get("id")?,
        folder_path: row.try_get("folder_path")?,
        job_type,
        metadata_json: row.try_get("metadata_json")?,
        user_feedback: row.try_get("user_feedback")?,
        artist_hint: row.try_get("artist_hint")?,
        status,
        result_json: row.try_get("result_json")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}
