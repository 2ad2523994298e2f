use std::sync::Arc;

use log::{error, info};
use tokio::sync::Semaphore;

use super::api::PipelineApi;
use super::monitor::{TerminalState, Watchdog, WorkerResult};
use crate::repositories::RepositoryRef;

pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Monitors every repository on its own task and returns results in input order.
///
/// All tasks are spawned up front; at most `max_concurrent` of them talk to
/// GitLab at once. `on_finished` runs as each worker ends, in completion order.
pub async fn monitor_all<A, F>(
    watchdog: Arc<Watchdog<A>>,
    repositories: Vec<RepositoryRef>,
    max_concurrent: usize,
    on_finished: F,
) -> Vec<WorkerResult>
where
    A: PipelineApi + ?Sized + 'static,
    F: Fn(&WorkerResult) + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let on_finished = Arc::new(on_finished);

    info!(
        "Monitoring {} repositories ({} at a time)...",
        repositories.len(),
        max_concurrent.max(1)
    );

    let handles: Vec<_> = repositories
        .into_iter()
        .map(|repository| {
            let watchdog = Arc::clone(&watchdog);
            let semaphore = Arc::clone(&semaphore);
            let on_finished = Arc::clone(&on_finished);
            let task_repository = repository.clone();

            let handle = tokio::spawn(async move {
                // Never closed, so the permit is always granted.
                let _permit = semaphore.acquire_owned().await.ok();
                let result = watchdog.monitor(&task_repository).await;
                on_finished(&result);
                result
            });

            (repository, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (repository, handle) in handles {
        let result = handle.await.unwrap_or_else(|e| {
            error!("Worker for repository {repository} aborted: {e}");
            WorkerResult::failed(
                repository,
                TerminalState::FailedException,
                format!("worker aborted: {e}"),
                0,
            )
        });
        results.push(result);
    }

    results
}
