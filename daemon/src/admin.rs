//! Operator commands. These only trigger the transitions the scheduler also
//! uses, they don't make any decisions of their own.

use crate::cancel;
use crate::models::*;
use crate::registry::JobTypeRegistry;
use crate::store::Store;
use buildfarm_common::api::{BuildRequest, CancelState, QueuedBuild};
use buildfarm_common::errors::*;
use buildfarm_common::{BuildQueueStatus, BuildStatus, CleanStatus};
use chrono::prelude::*;
use chrono::Duration;

/// Creates a pending build and its waiting queue entry.
pub fn queue_build(
    store: &mut Store,
    registry: &JobTypeRegistry,
    request: &BuildRequest,
    now: DateTime<Utc>,
) -> Result<QueuedBuild> {
    let behaviour = registry.get(request.job_type)?;
    let id = store.allocate_build_id();
    let build = behaviour.new_build(id, request, now)?;
    let estimated_duration = behaviour.estimated_duration(request);

    let build_id = store.insert_build(build)?;
    let queue_id = store.enqueue(build_id, estimated_duration)?;
    store.score_entry(queue_id, registry, now)?;
    info!("Queued {} for {} {}", build_id, request.name, request.version);

    Ok(QueuedBuild {
        build_id: build_id.0,
        queue_id: queue_id.0,
    })
}

pub fn manual_score(store: &mut Store, queue_id: BuildQueueId, value: i32) -> Result<()> {
    store.queue_entry_mut(queue_id)?.manual_score(value);
    Ok(())
}

pub fn cancel_build(
    store: &mut Store,
    registry: &JobTypeRegistry,
    build_id: BuildId,
    now: DateTime<Utc>,
) -> Result<CancelState> {
    let build = store.build(build_id)?;
    if let Some(queue_id) = build.build_queue() {
        cancel::cancel(store, registry, queue_id, CancelReason::Requested, now)
    } else {
        debug!("{} is {}, nothing to cancel", build_id, build.status());
        Ok(CancelState::NotQueued)
    }
}

/// Marks an idle builder dirty so the next scan resets it.
pub fn reset_builder(store: &mut Store, builder_id: BuilderId, now: DateTime<Utc>) -> Result<()> {
    let builder = store.builder_mut(builder_id)?;
    if let Some(job) = builder.current_job() {
        bail!("Builder {:?} is busy with {}, cancel it first", builder.name, job);
    }
    info!("Scheduling reset of builder {:?}", builder.name);
    builder.set_clean_status(CleanStatus::Dirty, now);
    Ok(())
}

pub fn enable_builder(store: &mut Store, builder_id: BuilderId, now: DateTime<Utc>) -> Result<()> {
    store.builder_mut(builder_id)?.enable(now);
    Ok(())
}

pub fn disable_builder(store: &mut Store, builder_id: BuilderId, reason: String) -> Result<()> {
    store.builder_mut(builder_id)?.disable(reason);
    Ok(())
}

/// Sends a build that ended up in a retryable state back to the queue.
pub fn retry_build(
    store: &mut Store,
    registry: &JobTypeRegistry,
    build_id: BuildId,
    now: DateTime<Utc>,
) -> Result<QueuedBuild> {
    let build = store.build_mut(build_id)?;
    build.reset_for_retry(now)?;
    let estimated_duration = Duration::seconds(build.estimated_duration);

    let queue_id = store.enqueue(build_id, estimated_duration)?;
    store.score_entry(queue_id, registry, now)?;
    info!("Retrying {} as {}", build_id, queue_id);

    Ok(QueuedBuild {
        build_id: build_id.0,
        queue_id: queue_id.0,
    })
}

/// The input of a pending build was replaced by a newer one.
pub fn supersede_build(store: &mut Store, build_id: BuildId, now: DateTime<Utc>) -> Result<()> {
    let build = store.build(build_id)?;
    let queue_id = build
        .build_queue()
        .ok_or_else(|| anyhow!("{} is {} and can't be superseded", build_id, build.status()))?;

    let (entry, build) = store.entry_and_build_mut(queue_id)?;
    if entry.status.holds_builder() {
        bail!("{} is already running, cancel it instead", build_id);
    }
    build.set_status(BuildStatus::Superseded, now)?;
    info!("{} was superseded", build_id);
    store.destroy_queue(queue_id)?;
    Ok(())
}

pub fn suspend(store: &mut Store, queue_id: BuildQueueId) -> Result<()> {
    store.queue_entry_mut(queue_id)?.suspend()?;
    info!("Suspended {}", queue_id);
    Ok(())
}

pub fn resume(store: &mut Store, queue_id: BuildQueueId) -> Result<()> {
    let entry = store.queue_entry_mut(queue_id)?;
    entry.resume()?;
    debug_assert_eq!(entry.status(), BuildQueueStatus::Waiting);
    info!("Resumed {}", queue_id);
    Ok(())
}

/// Reported by the upload pipeline once it processed a successful build.
pub fn complete_upload(
    store: &mut Store,
    build_id: BuildId,
    success: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let build = store.build_mut(build_id)?;
    if build.status() != BuildStatus::Uploading {
        bail!("{} is {}, not waiting for an upload", build_id, build.status());
    }
    let status = if success {
        BuildStatus::FullyBuilt
    } else {
        BuildStatus::FailedToUpload
    };
    build.set_status(status, now)?;
    info!("Upload of {} finished: {}", build_id, status);
    Ok(())
}
