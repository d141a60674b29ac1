use crate::cancel::{self, Cancellations};
use crate::db::{self, Pool};
use crate::interactor::{BuilderHandle, WorkerChannel};
use crate::models::*;
use crate::registry::JobTypeRegistry;
use crate::store::Store;
use buildfarm_common::api::worker::{BuildOutcome, BuildResult, BuilderState, JobPayload, WorkerStatus};
use buildfarm_common::config::ScheduleConfig;
use buildfarm_common::errors::*;
use buildfarm_common::{BuildQueueStatus, BuildStatus, CleanStatus, ResetProtocol};
use chrono::prelude::*;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for the delay between two attempts of a job.
const MAX_RETRY_DELAY: i64 = 24 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePolicy {
    pub scan_interval: Duration,
    pub lease_duration: chrono::Duration,
    pub cancel_timeout: Duration,
    pub cancel_poll_interval: Duration,
    pub clean_timeout: chrono::Duration,
    pub max_retries: u32,
    /// Seconds, doubled with every further failure.
    pub retry_delay_base: i64,
    pub builder_failure_threshold: u32,
}

impl From<&ScheduleConfig> for SchedulePolicy {
    fn from(config: &ScheduleConfig) -> SchedulePolicy {
        SchedulePolicy {
            scan_interval: Duration::from_secs(config.scan_interval()),
            lease_duration: chrono::Duration::seconds(config.lease_duration()),
            cancel_timeout: Duration::from_secs(config.cancel_timeout()),
            cancel_poll_interval: Duration::from_secs(config.cancel_poll_interval()),
            clean_timeout: chrono::Duration::seconds(config.clean_timeout()),
            max_retries: config.max_retries(),
            retry_delay_base: config.retry_delay_base(),
            builder_failure_threshold: config.builder_failure_threshold(),
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> SchedulePolicy {
        SchedulePolicy::from(&ScheduleConfig::default())
    }
}

impl SchedulePolicy {
    /// How long a job waits before it's offered again after its nth failure.
    pub fn retry_delay(&self, failure_count: u32) -> chrono::Duration {
        let exponent = failure_count.saturating_sub(1).min(16);
        let secs = self
            .retry_delay_base
            .saturating_mul(1 << exponent)
            .min(MAX_RETRY_DELAY);
        chrono::Duration::seconds(secs)
    }
}

/// What a single scan changed, mostly useful for logging and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanReport {
    pub dispatched: Vec<(BuildQueueId, BuilderId)>,
    pub completed: Vec<BuildQueueId>,
    pub requeued: Vec<BuildQueueId>,
    pub failed: Vec<BuildQueueId>,
    pub lease_expired: Vec<BuildQueueId>,
    pub cancelled: Vec<BuildQueueId>,
    pub cleaned: Vec<BuilderId>,
    pub disabled: Vec<BuilderId>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        *self == ScanReport::default()
    }
}

/// Result of a transient failure of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Requeued,
    GaveUp,
}

/// Picks at most one waiting entry for every available builder. Builders are
/// visited in id order, each one takes the highest scoring entry it is
/// compatible with that no other builder took in this round. Equal scores
/// are dispatched oldest first.
pub fn select_candidates(
    store: &Store,
    registry: &JobTypeRegistry,
    now: DateTime<Utc>,
) -> Vec<(BuildQueueId, BuilderId)> {
    let mut candidates = store
        .queue_entries()
        .filter(|entry| entry.is_candidate(now))
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| {
        b.last_score()
            .cmp(&a.last_score())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut claimed = HashSet::new();
    let mut plan = Vec::new();
    for builder in store.builders().filter(|b| b.is_available()) {
        let pick = candidates.iter().find(|entry| {
            !claimed.contains(&entry.id)
                && entry.job.is_compatible_with(builder)
                && is_eligible(store, registry, entry, builder)
        });

        if let Some(entry) = pick {
            trace!(
                "Picked {} (score {}) for builder {:?}",
                entry.id,
                entry.last_score(),
                builder.name
            );
            claimed.insert(entry.id);
            plan.push((entry.id, builder.id));
        }
    }
    plan
}

fn is_eligible(store: &Store, registry: &JobTypeRegistry, entry: &BuildQueue, builder: &Builder) -> bool {
    let result = store.build(entry.build_id).and_then(|build| {
        let behaviour = registry.get(entry.job.job_type())?;
        Ok(behaviour.is_eligible(build, builder))
    });
    match result {
        Ok(eligible) => eligible,
        Err(err) => {
            error!("Failed to check eligibility of {}: {:#}", entry.id, err);
            false
        }
    }
}

/// Sends a running job back to the queue after a transient error, or gives up
/// on it once it failed too often.
pub fn requeue_or_fail(
    store: &mut Store,
    registry: &JobTypeRegistry,
    policy: &SchedulePolicy,
    queue_id: BuildQueueId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Retry> {
    let (entry, build) = store.entry_and_build_mut(queue_id)?;
    if entry.status != BuildQueueStatus::Running {
        bail!("Can't requeue {} while it is {}", queue_id, entry.status);
    }

    build.failure_count += 1;
    if build.failure_count > policy.max_retries {
        warn!(
            "Giving up on {} after {} attempts: {}",
            build.id, build.failure_count, reason
        );
        build.status_reason = Some(format!(
            "Giving up after {} attempts: {}",
            build.failure_count, reason
        ));
        build.set_status(BuildStatus::FailedToBuild, now)?;
        store.destroy_queue(queue_id)?;
        return Ok(Retry::GaveUp);
    }

    let delay = policy.retry_delay(build.failure_count);
    info!(
        "Requeueing {} of {} in {}s ({}/{}): {}",
        queue_id,
        build.id,
        delay.num_seconds(),
        build.failure_count,
        policy.max_retries,
        reason
    );
    registry.get(entry.job.job_type())?.job_reset(build, now)?;
    store.requeue(queue_id)?;
    store.queue_entry_mut(queue_id)?.not_before = Some(now + delay);
    Ok(Retry::Requeued)
}

/// Records what the builder reported about a finished job and ends its
/// scheduling. Successful builds continue with the upload.
pub fn complete_job(
    store: &mut Store,
    queue_id: BuildQueueId,
    outcome: BuildOutcome,
    now: DateTime<Utc>,
) -> Result<()> {
    let (entry, build) = store.entry_and_build_mut(queue_id)?;
    if entry.status != BuildQueueStatus::Running {
        bail!("Can't complete {} while it is {}", queue_id, entry.status);
    }

    let status = match outcome.result {
        BuildResult::Ok => BuildStatus::Uploading,
        BuildResult::FailedToBuild => BuildStatus::FailedToBuild,
        BuildResult::ChrootWait => BuildStatus::ChrootWait,
        BuildResult::DepWait => BuildStatus::ManualDepWait,
        BuildResult::FailedToUpload => BuildStatus::FailedToUpload,
    };
    info!("{} of {} finished: {}", queue_id, build.id, status);
    build.log = outcome.log;
    build.dependencies = outcome.dependencies;
    build.set_status(status, now)?;

    store.destroy_queue(queue_id)?;
    Ok(())
}

fn job_payload(entry: &BuildQueue, build: &Build) -> JobPayload {
    JobPayload {
        queue_id: entry.id.0,
        build_id: build.id.0,
        job_type: entry.job.job_type(),
        name: build.name.clone(),
        version: build.version.clone(),
        processor: entry.job.processor().map(String::from),
        virtualized: entry.job.virtualized(),
        archive: build.archive.name.clone(),
    }
}

enum Cleaning {
    Reset,
    Poll,
}

/// The scan loop. There is exactly one of these per build farm, it is the
/// only writer of scheduling decisions.
pub struct Scheduler {
    pool: Pool,
    registry: Arc<JobTypeRegistry>,
    channel: Arc<dyn WorkerChannel>,
    policy: SchedulePolicy,
    cancellations: Cancellations,
    state_path: Option<PathBuf>,
}

impl Scheduler {
    pub fn new(
        pool: Pool,
        registry: Arc<JobTypeRegistry>,
        channel: Arc<dyn WorkerChannel>,
        policy: SchedulePolicy,
    ) -> Scheduler {
        Scheduler {
            pool,
            registry,
            channel,
            policy,
            cancellations: Cancellations::new(),
            state_path: None,
        }
    }

    /// Persist the store after every scan.
    pub fn with_state_path(mut self, path: Option<PathBuf>) -> Scheduler {
        self.state_path = path;
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn pending_cancellations(&self) -> usize {
        self.cancellations.len()
    }

    pub async fn run(mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.policy.scan_interval);
        loop {
            interval.tick().await;

            match self.scan(Utc::now()).await {
                Ok(report) if !report.is_empty() => debug!("Scan finished: {:?}", report),
                Ok(_) => trace!("Scan finished without changes"),
                Err(err) => error!("Scan failed: {:#}", err),
            }

            if let Some(path) = &self.state_path {
                let result = db::lock(&self.pool).and_then(|store| db::save_snapshot(path, &store));
                if let Err(err) = result {
                    error!("Failed to save scheduling state: {:#}", err);
                }
            }
        }
    }

    /// One pass over all builders and queue entries. Errors talking to a
    /// builder are handled in here and never abort the scan.
    pub async fn scan(&mut self, now: DateTime<Utc>) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        let finished = self.cancellations.take_finished();
        self.resolve_cancellations(finished, now, &mut report)?;
        self.poll_running(now, &mut report).await?;
        self.start_aborts()?;
        self.clean_builders(now, &mut report).await?;
        {
            let mut store = db::lock(&self.pool)?;
            store.rescore(&self.registry, now);
        }
        self.dispatch(now, &mut report).await?;

        Ok(report)
    }

    /// Waits for every in-flight abort and finalizes those entries.
    pub async fn settle_cancellations(&mut self, now: DateTime<Utc>) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let finished = self.cancellations.settle().await;
        self.resolve_cancellations(finished, now, &mut report)?;
        Ok(report)
    }

    fn resolve_cancellations(
        &mut self,
        finished: Vec<(BuildQueueId, bool)>,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<()> {
        if finished.is_empty() {
            return Ok(());
        }

        let mut store = db::lock(&self.pool)?;
        for (queue_id, acknowledged) in finished {
            if !acknowledged {
                let builder = store.queue_entry(queue_id).ok().and_then(|e| e.builder());
                if let Some(builder) = builder {
                    let builder = store.builder_mut(builder)?;
                    if builder.record_failure(
                        &format!("Failed to abort {}", queue_id),
                        self.policy.builder_failure_threshold,
                    ) {
                        report.disabled.push(builder.id);
                    }
                }
            }

            match cancel::mark_as_cancelled(&mut store, &self.registry, queue_id, now) {
                Ok(()) => report.cancelled.push(queue_id),
                Err(err) => error!("Failed to finalize cancellation of {}: {:#}", queue_id, err),
            }
        }
        Ok(())
    }

    fn start_aborts(&mut self) -> Result<()> {
        let aborts = {
            let store = db::lock(&self.pool)?;
            let mut aborts = Vec::new();
            for entry in store.queue_entries() {
                if entry.status() != BuildQueueStatus::Cancelling
                    || self.cancellations.is_pending(entry.id)
                {
                    continue;
                }
                match entry.builder().map(|id| store.builder(id)) {
                    Some(Ok(builder)) => aborts.push((entry.id, BuilderHandle::from(builder))),
                    Some(Err(err)) => error!("Can't abort {}: {:#}", entry.id, err),
                    None => error!("Can't abort {}, it isn't bound to a builder", entry.id),
                }
            }
            aborts
        };

        for (queue_id, builder) in aborts {
            info!("Asking builder {:?} to abort {}", builder.name, queue_id);
            self.cancellations.spawn(
                queue_id,
                builder,
                self.channel.clone(),
                self.policy.cancel_timeout,
                self.policy.cancel_poll_interval,
            );
        }
        Ok(())
    }

    async fn poll_running(&mut self, now: DateTime<Utc>, report: &mut ScanReport) -> Result<()> {
        let running = {
            let store = db::lock(&self.pool)?;
            let mut running = Vec::new();
            for entry in store.queue_entries() {
                if entry.status() != BuildQueueStatus::Running {
                    continue;
                }
                match entry.builder().map(|id| store.builder(id)) {
                    Some(Ok(builder)) => running.push((entry.id, BuilderHandle::from(builder))),
                    Some(Err(err)) => error!("Can't poll {}: {:#}", entry.id, err),
                    None => error!("Can't poll {}, it isn't bound to a builder", entry.id),
                }
            }
            running
        };

        let channel = self.channel.clone();
        let results = join_all(running.into_iter().map(|(queue_id, builder)| {
            let channel = channel.clone();
            async move {
                let status = channel.poll_status(&builder, queue_id).await;
                (queue_id, builder, status)
            }
        }))
        .await;

        let mut store = db::lock(&self.pool)?;
        for (queue_id, builder, status) in results {
            if let Err(err) = self.handle_status(&mut store, queue_id, &builder, status, now, report) {
                error!("Failed to process status of {}: {:#}", queue_id, err);
            }
        }
        Ok(())
    }

    fn handle_status(
        &self,
        store: &mut Store,
        queue_id: BuildQueueId,
        builder: &BuilderHandle,
        status: Result<WorkerStatus>,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<()> {
        // the entry might have been cancelled while we were waiting
        match store.queue_entry(queue_id) {
            Ok(entry) if entry.status() == BuildQueueStatus::Running => (),
            _ => {
                debug!("{} changed while it was polled, skipping", queue_id);
                return Ok(());
            }
        }

        let failure = match status {
            Ok(WorkerStatus::Building) => {
                store.builder_mut(builder.id)?.record_success();
                let entry = store.queue_entry_mut(queue_id)?;
                entry.renew_lease(self.policy.lease_duration, now);
                return Ok(());
            }
            Ok(WorkerStatus::Done(outcome)) => {
                store.builder_mut(builder.id)?.record_success();
                complete_job(store, queue_id, outcome, now)?;
                report.completed.push(queue_id);
                return Ok(());
            }
            Ok(WorkerStatus::Aborted) => {
                store.builder_mut(builder.id)?.record_success();
                match requeue_or_fail(
                    store,
                    &self.registry,
                    &self.policy,
                    queue_id,
                    "builder aborted the job",
                    now,
                )? {
                    Retry::Requeued => report.requeued.push(queue_id),
                    Retry::GaveUp => report.failed.push(queue_id),
                }
                return Ok(());
            }
            Ok(WorkerStatus::Unresponsive) => "builder is unresponsive".to_string(),
            Err(err) => format!("{:#}", err),
        };

        let disabled = store
            .builder_mut(builder.id)?
            .record_failure(&failure, self.policy.builder_failure_threshold);
        if disabled {
            report.disabled.push(builder.id);
        }

        if store.queue_entry(queue_id)?.lease_expired(now) {
            warn!("Lease of {} on {:?} expired", queue_id, builder.name);
            cancel::cancel(store, &self.registry, queue_id, CancelReason::LeaseExpired, now)?;
            report.lease_expired.push(queue_id);
        }
        Ok(())
    }

    async fn clean_builders(&mut self, now: DateTime<Utc>, report: &mut ScanReport) -> Result<()> {
        let work = {
            let mut store = db::lock(&self.pool)?;
            let mut work = Vec::new();
            let ids = store.builders().map(|b| b.id).collect::<Vec<_>>();
            for id in ids {
                let builder = store.builder_mut(id)?;
                if !builder.builder_ok() || builder.current_job().is_some() {
                    continue;
                }

                let action = match (builder.clean_status(), builder.reset_protocol) {
                    (CleanStatus::Clean, _) => continue,
                    (CleanStatus::Dirty, _) => Cleaning::Reset,
                    // a synchronous reset was interrupted
                    (CleanStatus::Cleaning, ResetProtocol::Proto1_1) => Cleaning::Reset,
                    (CleanStatus::Cleaning, ResetProtocol::Proto2_0) => {
                        if now - builder.date_clean_status_changed > self.policy.clean_timeout {
                            builder.disable(format!(
                                "Builder didn't finish cleaning within {}s",
                                self.policy.clean_timeout.num_seconds()
                            ));
                            report.disabled.push(id);
                            continue;
                        }
                        Cleaning::Poll
                    }
                };

                if let Cleaning::Reset = action {
                    builder.set_clean_status(CleanStatus::Cleaning, now);
                }
                work.push((BuilderHandle::from(&*builder), action));
            }
            work
        };

        let channel = self.channel.clone();
        let results = join_all(work.into_iter().map(|(builder, action)| {
            let channel = channel.clone();
            async move {
                let result = match action {
                    Cleaning::Reset => {
                        info!("Resetting builder {:?}", builder.name);
                        channel.reset(&builder).await.map(|_| None)
                    }
                    Cleaning::Poll => channel.status(&builder).await.map(Some),
                };
                (builder, result)
            }
        }))
        .await;

        let mut store = db::lock(&self.pool)?;
        for (handle, result) in results {
            let builder = store.builder_mut(handle.id)?;
            match (result, handle.reset_protocol) {
                (Ok(None), ResetProtocol::Proto1_1) => {
                    builder.record_success();
                    builder.set_clean_status(CleanStatus::Clean, now);
                    info!("Builder {:?} is clean", builder.name);
                    report.cleaned.push(builder.id);
                }
                (Ok(None), ResetProtocol::Proto2_0) => {
                    builder.record_success();
                    debug!("Builder {:?} started cleaning", builder.name);
                }
                (Ok(Some(BuilderState::Idle)), _) => {
                    builder.record_success();
                    builder.set_clean_status(CleanStatus::Clean, now);
                    info!("Builder {:?} reported itself clean", builder.name);
                    report.cleaned.push(builder.id);
                }
                (Ok(Some(state)), _) => {
                    builder.record_success();
                    trace!("Builder {:?} is still {:?}", builder.name, state);
                }
                (Err(err), _) => {
                    if builder.clean_status() == CleanStatus::Cleaning
                        && handle.reset_protocol == ResetProtocol::Proto1_1
                    {
                        builder.set_clean_status(CleanStatus::Dirty, now);
                    }
                    let reason = format!("Failed to clean: {:#}", err);
                    if builder.record_failure(&reason, self.policy.builder_failure_threshold) {
                        report.disabled.push(builder.id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, now: DateTime<Utc>, report: &mut ScanReport) -> Result<()> {
        let jobs = {
            let mut store = db::lock(&self.pool)?;
            let plan = select_candidates(&store, &self.registry, now);

            let mut jobs = Vec::new();
            for (queue_id, builder_id) in plan {
                match self.start_job(&mut store, queue_id, builder_id, now) {
                    Ok(job) => jobs.push(job),
                    Err(err) => error!("Skipping dispatch of {} to {}: {:#}", queue_id, builder_id, err),
                }
            }
            jobs
        };

        let channel = self.channel.clone();
        let results = join_all(jobs.into_iter().map(|(queue_id, builder, payload)| {
            let channel = channel.clone();
            async move {
                let result = channel.dispatch(&builder, &payload).await;
                (queue_id, builder, result)
            }
        }))
        .await;

        let mut store = db::lock(&self.pool)?;
        for (queue_id, builder, result) in results {
            match result {
                Ok(()) => {
                    store.builder_mut(builder.id)?.record_success();
                    info!("Dispatched {} to builder {:?}", queue_id, builder.name);
                    report.dispatched.push((queue_id, builder.id));
                }
                Err(err) => {
                    let reason = format!("Failed to dispatch: {:#}", err);
                    if store
                        .builder_mut(builder.id)?
                        .record_failure(&reason, self.policy.builder_failure_threshold)
                    {
                        report.disabled.push(builder.id);
                    }
                    match requeue_or_fail(&mut store, &self.registry, &self.policy, queue_id, &reason, now) {
                        Ok(Retry::Requeued) => report.requeued.push(queue_id),
                        Ok(Retry::GaveUp) => report.failed.push(queue_id),
                        Err(err) => error!("Failed to requeue {}: {:#}", queue_id, err),
                    }
                }
            }
        }
        Ok(())
    }

    /// Binds the entry to the builder before the builder is contacted, a
    /// failed dispatch is treated like any other transient error.
    fn start_job(
        &self,
        store: &mut Store,
        queue_id: BuildQueueId,
        builder_id: BuilderId,
        now: DateTime<Utc>,
    ) -> Result<(BuildQueueId, BuilderHandle, JobPayload)> {
        store.attach(queue_id, builder_id, self.policy.lease_duration, now)?;

        let (entry, build) = store.entry_and_build_mut(queue_id)?;
        let started = self
            .registry
            .get(entry.job.job_type())
            .and_then(|behaviour| behaviour.job_started(build, builder_id, now));
        if let Err(err) = started {
            store.requeue(queue_id)?;
            return Err(err);
        }
        let payload = job_payload(entry, build);

        let builder = BuilderHandle::from(store.builder(builder_id)?);
        Ok((queue_id, builder, payload))
    }
}
