//! Long-lived claim loop: takes `queued`/`accepted` jobs from the JobStore
//! and dispatches them to the scanner, proposal generator, or file mover.
//! Runs alongside an independent stale-reset sweep task.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use wts_config::{StoreConfig, WorkerConfig};
use wts_oracle::Oracle;
use wts_store::{Job, JobStore, JobType, Proposal};

use crate::collection;
use crate::error::{CoreError, CoreResult};
use crate::file_mover;
use crate::folder_shape;
use crate::paths::SharedPaths;
use crate::progress::ProgressTracker;
use crate::proposal_generator;
use crate::scanner;

#[derive(Clone)]
pub struct WorkerPool {
    store: JobStore,
    oracle: Arc<dyn Oracle>,
    paths: SharedPaths,
    progress: Arc<ProgressTracker>,
    worker_config: WorkerConfig,
    stale_job_max_age_secs: u64,
}

impl WorkerPool {
    pub fn new(
        store: JobStore,
        oracle: Arc<dyn Oracle>,
        paths: SharedPaths,
        progress: Arc<ProgressTracker>,
        worker_config: WorkerConfig,
        store_config: &StoreConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            paths,
            progress,
            worker_config,
            stale_job_max_age_secs: store_config.stale_job_max_age_secs,
        }
    }

    /// Runs until `shutdown` fires, then lets in-flight jobs finish before
    /// returning.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let sweep = self.clone().spawn_stale_sweep();
        let max_workers = self.worker_config.worker_count.max(1);
        let mut tasks: JoinSet<()> = JoinSet::new();

        'outer: loop {
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "worker task panicked");
                }
            }

            let mut claimed_this_round = false;
            while tasks.len() < max_workers {
                let anything_running = !tasks.is_empty() || claimed_this_round;
                match self.claim_next(anything_running).await {
                    Ok(Some(job)) => {
                        claimed_this_round = true;
                        let worker = self.clone();
                        tasks.spawn(async move { worker.dispatch(job).await });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "claim attempt failed");
                        break;
                    }
                }
            }

            if !claimed_this_round {
                tokio::select! {
                    _ = shutdown.recv() => break 'outer,
                    _ = tokio::time::sleep(Duration::from_millis(self.worker_config.poll_interval_ms)) => {}
                }
            } else if shutdown.try_recv().is_ok() {
                break 'outer;
            }
        }

        sweep.abort();
        tracing::info!("worker pool shutting down, draining in-flight jobs");
        while tasks.join_next().await.is_some() {}
    }

    async fn claim_next(&self, anything_running: bool) -> CoreResult<Option<Job>> {
        if let Some(job) = self.store.claim_queued_for_analysis().await? {
            return Ok(Some(job));
        }
        if !anything_running {
            if let Some(job) = self.store.claim_accepted_for_move().await? {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    fn spawn_stale_sweep(self) -> tokio::task::JoinHandle<()> {
        let interval = Duration::from_secs(self.worker_config.stale_sweep_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match self.store.reset_stale_analyzing(self.stale_job_max_age_secs as i64).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(count = n, "reset stale analyzing jobs"),
                    Err(e) => tracing::error!(error = %e, "stale-reset sweep failed"),
                }
            }
        })
    }

    async fn dispatch(&self, job: Job) {
        tracing::debug!(job_id = job.id, job_type = %job.job_type, folder = %job.folder_path, "dispatching job");

        let result = match job.job_type {
            JobType::Scan => self.handle_scan(&job).await,
            JobType::Analyze => self.handle_analyze(&job).await,
            JobType::Move => self.handle_move(&job).await,
        };

        if let Err(e) = result {
            e.log();
            if let Err(store_err) = self.store.fail(job.id, &e.to_string()).await {
                tracing::error!(job_id = job.id, error = %store_err, "failed to record job failure");
            }
            self.progress.record_error();
        }
    }

    async fn handle_scan(&self, job: &Job) -> CoreResult<()> {
        let root = Path::new(&job.folder_path);
        scanner::scan(&self.store, root).await?;
        self.store.complete_scan(job.id).await?;
        Ok(())
    }

    async fn handle_analyze(&self, job: &Job) -> CoreResult<()> {
        let folder = Path::new(&job.folder_path);
        let shape = folder_shape::analyze(folder)?;
        let proposal = proposal_generator::generate_proposal(
            &shape,
            job.artist_hint.as_deref(),
            job.user_feedback.as_deref(),
            self.oracle.as_ref(),
        )
        .await?;
        self.store.approve(job.id, &proposal).await?;
        Ok(())
    }

    async fn handle_move(&self, job: &Job) -> CoreResult<()> {
        let proposal: Proposal = job
            .result_json
            .as_deref()
            .ok_or_else(|| CoreError::InvalidFolder(format!("job {} has no result to move", job.id)))
            .and_then(|raw| serde_json::from_str(raw).map_err(|e| CoreError::ProposalParse(e.to_string())))?;

        let folder = Path::new(&job.folder_path);
        let target_root = self.paths.read().await.target_dir.clone();
        let copied = file_mover::move_folder(folder, &proposal, &target_root)?;
        self.store.complete_move(job.id).await?;
        self.progress.record_success(proposal);
        tracing::info!(job_id = job.id, files = copied, folder = %job.folder_path, "moved folder");

        if let Some(artist_hint) = &job.artist_hint {
            if let Some(parent) = folder.parent() {
                if let Err(e) = collection::maybe_write_collection_mark(&self.store, parent).await {
                    tracing::warn!(artist = %artist_hint, error = %e, "failed to check collection completion");
                }
            }
        }

        Ok(())
    }
}
