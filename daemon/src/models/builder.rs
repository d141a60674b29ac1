use crate::models::{BuildQueueId, BuilderId};
use buildfarm_common::api::BuilderInfo;
use buildfarm_common::config::BuilderConfig;
use buildfarm_common::errors::*;
use buildfarm_common::{CleanStatus, ResetProtocol};
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Builder {
    pub id: BuilderId,
    pub name: String,
    pub url: String,
    pub processor: String,
    pub virtualized: bool,
    /// Manual builders are never picked by the scan loop.
    pub manual: bool,
    builder_ok: bool,
    fail_notes: Option<String>,
    pub(crate) current_job: Option<BuildQueueId>,
    clean_status: CleanStatus,
    pub date_clean_status_changed: DateTime<Utc>,
    pub reset_protocol: ResetProtocol,
    /// Consecutive failures talking to this builder.
    pub failure_count: u32,
}

impl Builder {
    pub fn new(id: BuilderId, config: &BuilderConfig, now: DateTime<Utc>) -> Builder {
        Builder {
            id,
            name: config.name.clone(),
            url: config.url.clone(),
            processor: config.processor.clone(),
            virtualized: config.virtualized,
            manual: config.manual,
            builder_ok: true,
            fail_notes: None,
            current_job: None,
            // we don't know what state the builder was left in
            clean_status: CleanStatus::Dirty,
            date_clean_status_changed: now,
            reset_protocol: config.reset_protocol,
            failure_count: 0,
        }
    }

    /// Applies a changed configuration to an already known builder.
    pub fn update(&mut self, config: &BuilderConfig) {
        self.url = config.url.clone();
        self.processor = config.processor.clone();
        self.virtualized = config.virtualized;
        self.manual = config.manual;
        self.reset_protocol = config.reset_protocol;
    }

    pub fn builder_ok(&self) -> bool {
        self.builder_ok
    }

    pub fn fail_notes(&self) -> Option<&str> {
        self.fail_notes.as_deref()
    }

    pub fn current_job(&self) -> Option<BuildQueueId> {
        self.current_job
    }

    pub fn clean_status(&self) -> CleanStatus {
        self.clean_status
    }

    pub fn set_clean_status(&mut self, status: CleanStatus, now: DateTime<Utc>) {
        if self.clean_status != status {
            debug!(
                "Builder {:?} changed from {} to {}",
                self.name, self.clean_status, status
            );
            self.clean_status = status;
            self.date_clean_status_changed = now;
        }
    }

    /// Idle, healthy, clean and taking automatic work.
    pub fn is_available(&self) -> bool {
        self.can_dispatch().is_ok()
    }

    pub fn can_dispatch(&self) -> Result<()> {
        if !self.builder_ok {
            bail!("Builder {:?} is disabled", self.name);
        }
        if self.manual {
            bail!("Builder {:?} is in manual mode", self.name);
        }
        if let Some(job) = self.current_job {
            bail!("Builder {:?} is still busy with {}", self.name, job);
        }
        if self.clean_status != CleanStatus::Clean {
            bail!(
                "Builder {:?} is {}, only clean builders accept jobs",
                self.name,
                self.clean_status
            );
        }
        Ok(())
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    /// Counts a failed interaction, once `threshold` consecutive failures are
    /// reached the builder is taken out of rotation. Returns `true` if this
    /// call disabled the builder.
    pub fn record_failure(&mut self, reason: &str, threshold: u32) -> bool {
        self.failure_count += 1;
        warn!(
            "Builder {:?} failed ({}/{}): {}",
            self.name, self.failure_count, threshold, reason
        );
        if self.builder_ok && self.failure_count >= threshold {
            self.disable(format!("Failure threshold reached: {}", reason));
            true
        } else {
            false
        }
    }

    /// Takes the builder out of rotation. A job that is currently running on it
    /// is left alone.
    pub fn disable(&mut self, reason: String) {
        warn!("Disabling builder {:?}: {}", self.name, reason);
        self.builder_ok = false;
        self.fail_notes = Some(reason);
    }

    /// Puts the builder back into rotation. A builder that was disabled while
    /// cleaning is marked dirty so the next scan resets it from scratch.
    pub fn enable(&mut self, now: DateTime<Utc>) {
        info!("Enabling builder {:?}", self.name);
        self.builder_ok = true;
        self.fail_notes = None;
        self.failure_count = 0;
        if self.clean_status == CleanStatus::Cleaning {
            self.set_clean_status(CleanStatus::Dirty, now);
        }
    }
}

impl From<&Builder> for BuilderInfo {
    fn from(builder: &Builder) -> BuilderInfo {
        BuilderInfo {
            id: builder.id.0,
            name: builder.name.clone(),
            url: builder.url.clone(),
            processor: builder.processor.clone(),
            virtualized: builder.virtualized,
            manual: builder.manual,
            builder_ok: builder.builder_ok,
            fail_notes: builder.fail_notes.clone(),
            current_job: builder.current_job.map(|j| j.0),
            clean_status: builder.clean_status,
            reset_protocol: builder.reset_protocol,
            failure_count: builder.failure_count,
        }
    }
}
