use crate::models::{Build, BuildFarmJob, BuildId, BuildQueueId, BuilderId};
use crate::registry::JobTypeRegistry;
use buildfarm_common::api::QueueEntry;
use buildfarm_common::errors::*;
use buildfarm_common::BuildQueueStatus;
use chrono::prelude::*;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a running job is being taken away from its builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelReason {
    Requested,
    LeaseExpired,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancelled on request"),
            CancelReason::LeaseExpired => {
                write!(f, "cancelled after the builder stopped reporting progress")
            }
        }
    }
}

/// The scheduling record of a build, it only exists while the build is
/// waiting for or occupying a builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildQueue {
    pub id: BuildQueueId,
    pub build_id: BuildId,
    pub job: BuildFarmJob,
    pub(crate) status: BuildQueueStatus,
    last_score: i32,
    manual: bool,
    pub(crate) builder: Option<BuilderId>,
    pub date_started: Option<DateTime<Utc>>,
    /// Seconds.
    pub estimated_duration: i64,
    pub lease_expires: Option<DateTime<Utc>>,
    /// Set after a transient failure, the entry is not offered to builders
    /// before this point in time.
    pub not_before: Option<DateTime<Utc>>,
    pub cancel_reason: Option<CancelReason>,
}

impl BuildQueue {
    pub fn new(
        id: BuildQueueId,
        build_id: BuildId,
        job: BuildFarmJob,
        estimated_duration: Duration,
    ) -> BuildQueue {
        BuildQueue {
            id,
            build_id,
            job,
            status: BuildQueueStatus::Waiting,
            last_score: 0,
            manual: false,
            builder: None,
            date_started: None,
            estimated_duration: estimated_duration.num_seconds(),
            lease_expires: None,
            not_before: None,
            cancel_reason: None,
        }
    }

    pub fn status(&self) -> BuildQueueStatus {
        self.status
    }

    pub fn builder(&self) -> Option<BuilderId> {
        self.builder
    }

    pub fn last_score(&self) -> i32 {
        self.last_score
    }

    pub fn is_manually_scored(&self) -> bool {
        self.manual
    }

    /// Recomputes the score with the job type's scoring function. Once an
    /// administrator pinned the score this does nothing.
    pub fn score(&mut self, build: &Build, registry: &JobTypeRegistry, now: DateTime<Utc>) -> Result<()> {
        if self.manual {
            return Ok(());
        }
        let behaviour = registry.get(self.job.job_type())?;
        let score = behaviour.score(build, now);
        if score != self.last_score {
            trace!("Rescoring {} from {} to {}", self.id, self.last_score, score);
        }
        self.last_score = score;
        Ok(())
    }

    pub fn manual_score(&mut self, value: i32) {
        info!("Pinning score of {} to {}", self.id, value);
        self.last_score = value;
        self.manual = true;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if let Some(not_before) = self.not_before {
            not_before <= now
        } else {
            true
        }
    }

    pub fn is_candidate(&self, now: DateTime<Utc>) -> bool {
        self.status == BuildQueueStatus::Waiting && self.is_due(now)
    }

    pub fn renew_lease(&mut self, lease: Duration, now: DateTime<Utc>) {
        self.lease_expires = Some(now + lease);
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        if let Some(lease_expires) = self.lease_expires {
            lease_expires < now
        } else {
            false
        }
    }

    pub fn suspend(&mut self) -> Result<()> {
        match self.status {
            BuildQueueStatus::Waiting => {
                self.status = BuildQueueStatus::Suspended;
                Ok(())
            }
            BuildQueueStatus::Suspended => Ok(()),
            status => bail!("Can't suspend {} while it is {}", self.id, status),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.status {
            BuildQueueStatus::Suspended => {
                self.status = BuildQueueStatus::Waiting;
                Ok(())
            }
            BuildQueueStatus::Waiting => Ok(()),
            status => bail!("Can't resume {} while it is {}", self.id, status),
        }
    }

    pub fn to_api(&self, build: &Build) -> QueueEntry {
        QueueEntry {
            id: self.id.0,
            build_id: self.build_id.0,
            job_type: self.job.job_type(),
            name: build.name.clone(),
            version: build.version.clone(),
            processor: self.job.processor().map(String::from),
            virtualized: self.job.virtualized(),
            status: self.status,
            last_score: self.last_score,
            manual: self.manual,
            builder_id: self.builder.map(|b| b.0),
            date_started: self.date_started,
            estimated_duration: self.estimated_duration,
            lease_expires: self.lease_expires,
            not_before: self.not_before,
        }
    }
}
