use crate::interactor::{BuilderHandle, WorkerChannel};
use crate::models::*;
use crate::registry::JobTypeRegistry;
use crate::store::Store;
use buildfarm_common::api::worker::WorkerStatus;
use buildfarm_common::api::CancelState;
use buildfarm_common::errors::*;
use buildfarm_common::{BuildQueueStatus, BuildStatus};
use chrono::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Takes a queue entry out of scheduling.
///
/// Entries that never reached a builder are removed right away. Running
/// entries are only flagged, the builder has to be told to stop first and
/// [`mark_as_cancelled`] finishes the job once it did (or didn't, in time).
/// Cancelling an entry that is already on its way out does nothing.
pub fn cancel(
    store: &mut Store,
    registry: &JobTypeRegistry,
    queue_id: BuildQueueId,
    reason: CancelReason,
    now: DateTime<Utc>,
) -> Result<CancelState> {
    if !store.contains_queue_entry(queue_id) {
        debug!("{} is not queued anymore, nothing to cancel", queue_id);
        return Ok(CancelState::NotQueued);
    }

    let (entry, build) = store.entry_and_build_mut(queue_id)?;
    match entry.status {
        BuildQueueStatus::Waiting | BuildQueueStatus::Suspended => {
            registry
                .get(entry.job.job_type())?
                .job_aborted(build, reason, now)?;
            info!("Cancelled {} of {} before it was dispatched", queue_id, build.id);
            store.destroy_queue(queue_id)?;
            Ok(CancelState::Cancelled)
        }
        BuildQueueStatus::Running => {
            build.set_status(BuildStatus::Cancelling, now)?;
            build.status_reason = Some(reason.to_string());
            entry.status = BuildQueueStatus::Cancelling;
            entry.cancel_reason = Some(reason);
            info!(
                "Cancelling {} of {} on {:?} ({})",
                queue_id, build.id, entry.builder, reason
            );
            Ok(CancelState::Cancelling)
        }
        BuildQueueStatus::Cancelling => {
            debug!("{} is already being cancelled", queue_id);
            Ok(CancelState::AlreadyCancelling)
        }
    }
}

/// Second half of cancelling a running entry, called after the builder
/// acknowledged the abort or the abort timed out. A missing entry means the
/// cancellation was already settled.
pub fn mark_as_cancelled(
    store: &mut Store,
    registry: &JobTypeRegistry,
    queue_id: BuildQueueId,
    now: DateTime<Utc>,
) -> Result<()> {
    if !store.contains_queue_entry(queue_id) {
        debug!("{} is already gone", queue_id);
        return Ok(());
    }

    let (entry, build) = store.entry_and_build_mut(queue_id)?;
    if entry.status != BuildQueueStatus::Cancelling {
        bail!("Can't mark {} as cancelled while it is {}", queue_id, entry.status);
    }
    let reason = entry.cancel_reason.unwrap_or(CancelReason::Requested);
    registry
        .get(entry.job.job_type())?
        .job_aborted(build, reason, now)?;
    info!("Cancelled {} of {}", queue_id, build.id);

    store.destroy_queue(queue_id)?;
    Ok(())
}

/// Asks the builder to abort and waits until it stopped working on the job.
async fn abort_job(
    channel: &dyn WorkerChannel,
    builder: &BuilderHandle,
    queue_id: BuildQueueId,
    poll_interval: Duration,
) -> Result<()> {
    channel.abort(builder, queue_id).await?;
    loop {
        match channel.poll_status(builder, queue_id).await {
            Ok(WorkerStatus::Aborted) | Ok(WorkerStatus::Done(_)) => return Ok(()),
            Ok(status) => trace!("{} on {:?} is still {:?}", queue_id, builder.name, status),
            Err(err) => debug!("Failed to poll {} on {:?}: {:#}", queue_id, builder.name, err),
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// In-flight abort requests, one per cancelling queue entry. Each one
/// resolves to `true` if the builder acknowledged the abort and `false` if
/// it timed out or failed.
#[derive(Debug, Default)]
pub struct Cancellations {
    pending: HashMap<BuildQueueId, oneshot::Receiver<bool>>,
}

impl Cancellations {
    pub fn new() -> Cancellations {
        Cancellations::default()
    }

    pub fn is_pending(&self, queue_id: BuildQueueId) -> bool {
        self.pending.contains_key(&queue_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn spawn(
        &mut self,
        queue_id: BuildQueueId,
        builder: BuilderHandle,
        channel: Arc<dyn WorkerChannel>,
        timeout: Duration,
        poll_interval: Duration,
    ) {
        if self.is_pending(queue_id) {
            return;
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let fut = abort_job(channel.as_ref(), &builder, queue_id, poll_interval);
            let acknowledged = match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(())) => {
                    debug!("Builder {:?} aborted {}", builder.name, queue_id);
                    true
                }
                Ok(Err(err)) => {
                    warn!("Failed to abort {} on {:?}: {:#}", queue_id, builder.name, err);
                    false
                }
                Err(_) => {
                    warn!(
                        "Builder {:?} didn't abort {} within {}s",
                        builder.name,
                        queue_id,
                        timeout.as_secs()
                    );
                    false
                }
            };
            // the receiver is gone if the scheduler shut down
            tx.send(acknowledged).ok();
        });
        self.pending.insert(queue_id, rx);
    }

    /// Collects the abort requests that finished since the last call.
    pub fn take_finished(&mut self) -> Vec<(BuildQueueId, bool)> {
        let mut finished = Vec::new();
        self.pending.retain(|queue_id, rx| match rx.try_recv() {
            Ok(acknowledged) => {
                finished.push((*queue_id, acknowledged));
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Closed) => {
                error!("Abort task for {} went away without a result", queue_id);
                finished.push((*queue_id, false));
                false
            }
        });
        finished.sort();
        finished
    }

    /// Waits for every in-flight abort request.
    pub async fn settle(&mut self) -> Vec<(BuildQueueId, bool)> {
        let mut finished = Vec::new();
        for (queue_id, rx) in self.pending.drain() {
            finished.push((queue_id, rx.await.unwrap_or(false)));
        }
        finished.sort();
        finished
    }
}
