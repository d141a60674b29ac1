//! Messages exchanged between the scheduler and a builder.

use crate::JobType;
use serde::{Deserialize, Serialize};

/// Sent to a builder when a job is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub queue_id: i32,
    pub build_id: i32,
    pub job_type: JobType,
    pub name: String,
    pub version: String,
    pub processor: Option<String>,
    pub virtualized: Option<bool>,
    pub archive: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum WorkerStatus {
    Building,
    Done(BuildOutcome),
    Aborted,
    Unresponsive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildResult {
    Ok,
    FailedToBuild,
    ChrootWait,
    DepWait,
    FailedToUpload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub result: BuildResult,
    pub log: Option<String>,
    /// Unsatisfied build dependencies, reported with `DepWait`.
    pub dependencies: Option<String>,
}

impl BuildOutcome {
    pub fn new(result: BuildResult) -> BuildOutcome {
        BuildOutcome {
            result,
            log: None,
            dependencies: None,
        }
    }
}

/// What the builder reports about itself, independent of any job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuilderState {
    Idle,
    Building,
    Cleaning,
}
