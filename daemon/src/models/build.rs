use crate::models::{BuildFarmJob, BuildId, BuildQueueId, BuilderId};
use buildfarm_common::api::{Archive, BuildInfo, BuildRequest, Pocket, Urgency};
use buildfarm_common::errors::*;
use buildfarm_common::BuildStatus;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// The durable outcome record of a job. Builds are never deleted, once a
/// terminal status is reached they stay around as a historical fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub job: BuildFarmJob,
    pub name: String,
    pub version: String,
    pub archive: Archive,
    pub pocket: Pocket,
    pub component: Option<String>,
    pub urgency: Urgency,
    pub requested_manually: bool,
    status: BuildStatus,
    /// The builder that last picked up this build.
    pub builder: Option<BuilderId>,
    pub(crate) build_queue: Option<BuildQueueId>,
    pub date_created: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    date_first_dispatched: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
    pub log: Option<String>,
    pub dependencies: Option<String>,
    pub failure_count: u32,
    pub status_reason: Option<String>,
    /// Seconds, reused when the build is queued again.
    #[serde(default)]
    pub estimated_duration: i64,
}

impl Build {
    pub fn new(id: BuildId, job: BuildFarmJob, request: &BuildRequest, now: DateTime<Utc>) -> Build {
        Build {
            id,
            job,
            name: request.name.clone(),
            version: request.version.clone(),
            archive: request.archive.clone(),
            pocket: request.pocket,
            component: request.component.clone(),
            urgency: request.urgency,
            requested_manually: request.manual,
            status: BuildStatus::NeedsBuild,
            builder: None,
            build_queue: None,
            date_created: now,
            date_started: None,
            date_first_dispatched: None,
            date_finished: None,
            log: None,
            dependencies: None,
            failure_count: 0,
            status_reason: None,
            estimated_duration: 0,
        }
    }

    pub fn status(&self) -> BuildStatus {
        self.status
    }

    pub fn build_queue(&self) -> Option<BuildQueueId> {
        self.build_queue
    }

    pub fn date_first_dispatched(&self) -> Option<DateTime<Utc>> {
        self.date_first_dispatched
    }

    pub fn title(&self) -> String {
        format!("{} {} ({})", self.name, self.version, self.job.job_type())
    }

    pub fn set_status(&mut self, next: BuildStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            bail!(
                "Invalid status transition for {}: {} -> {}",
                self.id,
                self.status,
                next
            );
        }

        debug!("Moving {} from {} to {}", self.id, self.status, next);
        self.status = next;
        if next.is_terminal() {
            self.date_finished = Some(now);
        }
        Ok(())
    }

    pub fn mark_dispatched(&mut self, builder: BuilderId, now: DateTime<Utc>) -> Result<()> {
        self.set_status(BuildStatus::Building, now)?;
        self.builder = Some(builder);
        self.date_started = Some(now);
        self.date_first_dispatched.get_or_insert(now);
        Ok(())
    }

    /// Puts a build that was interrupted by a transient error back into the
    /// pool of pending work.
    pub fn mark_pending(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != BuildStatus::NeedsBuild {
            self.set_status(BuildStatus::NeedsBuild, now)?;
        }
        self.date_started = None;
        Ok(())
    }

    /// Administrative retry of a build that ended up in a terminal state.
    /// `date_first_dispatched` is kept, it records the very first attempt.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.status.is_retryable() {
            bail!("{} can't be retried from {}", self.id, self.status);
        }
        self.set_status(BuildStatus::NeedsBuild, now)?;
        self.builder = None;
        self.date_started = None;
        self.date_finished = None;
        self.log = None;
        self.dependencies = None;
        self.failure_count = 0;
        self.status_reason = None;
        Ok(())
    }
}

impl From<&Build> for BuildInfo {
    fn from(build: &Build) -> BuildInfo {
        BuildInfo {
            id: build.id.0,
            job_type: build.job.job_type(),
            name: build.name.clone(),
            version: build.version.clone(),
            archive: build.archive.name.clone(),
            processor: build.job.processor().map(String::from),
            virtualized: build.job.virtualized(),
            status: build.status,
            builder_id: build.builder.map(|b| b.0),
            queue_id: build.build_queue.map(|q| q.0),
            date_created: build.date_created,
            date_started: build.date_started,
            date_first_dispatched: build.date_first_dispatched,
            date_finished: build.date_finished,
            log: build.log.clone(),
            dependencies: build.dependencies.clone(),
            failure_count: build.failure_count,
            status_reason: build.status_reason.clone(),
        }
    }
}
