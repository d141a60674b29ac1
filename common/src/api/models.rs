use crate::{BuildQueueStatus, BuildStatus, CleanStatus, JobType, ResetProtocol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArchivePurpose {
    #[default]
    Primary,
    Partner,
    Ppa,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub name: String,
    #[serde(default)]
    pub purpose: ArchivePurpose,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub relative_build_score: i32,
}

fn enabled_by_default() -> bool {
    true
}

impl Archive {
    pub fn new<I: Into<String>>(name: I, purpose: ArchivePurpose) -> Archive {
        Archive {
            name: name.into(),
            purpose,
            enabled: true,
            private: false,
            relative_build_score: 0,
        }
    }
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Pocket {
    #[default]
    Release,
    Security,
    Updates,
    Proposed,
    Backports,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

/// Everything needed to create a build and queue it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub job_type: JobType,
    pub name: String,
    pub version: String,
    pub processor: Option<String>,
    pub virtualized: Option<bool>,
    pub archive: Archive,
    #[serde(default)]
    pub pocket: Pocket,
    pub component: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    /// Seconds, falls back to the job type's default estimate.
    pub estimated_duration: Option<i64>,
    /// Requested by a human rather than by an automatic trigger.
    #[serde(default)]
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedBuild {
    pub build_id: i32,
    pub queue_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderInfo {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub processor: String,
    pub virtualized: bool,
    pub manual: bool,
    pub builder_ok: bool,
    pub fail_notes: Option<String>,
    pub current_job: Option<i32>,
    pub clean_status: CleanStatus,
    pub reset_protocol: ResetProtocol,
    pub failure_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i32,
    pub build_id: i32,
    pub job_type: JobType,
    pub name: String,
    pub version: String,
    pub processor: Option<String>,
    pub virtualized: Option<bool>,
    pub status: BuildQueueStatus,
    pub last_score: i32,
    pub manual: bool,
    pub builder_id: Option<i32>,
    pub date_started: Option<DateTime<Utc>>,
    pub estimated_duration: i64,
    pub lease_expires: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: i32,
    pub job_type: JobType,
    pub name: String,
    pub version: String,
    pub archive: String,
    pub processor: Option<String>,
    pub virtualized: Option<bool>,
    pub status: BuildStatus,
    pub builder_id: Option<i32>,
    pub queue_id: Option<i32>,
    pub date_created: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_first_dispatched: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
    pub log: Option<String>,
    pub dependencies: Option<String>,
    pub failure_count: u32,
    pub status_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableBuilderRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
}

/// What happened to a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CancelState {
    /// The entry was still waiting and is gone.
    Cancelled,
    /// The builder was asked to abort, the entry is finalized later.
    Cancelling,
    /// A previous request is still in flight.
    AlreadyCancelling,
    /// Scheduling had already finished, nothing to cancel.
    NotQueued,
}
