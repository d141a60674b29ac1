use colored::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod utils;

/// The kind of work a build farm job represents. Every job type has exactly one
/// behaviour registered with the scheduler.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    PackageBuild,
    RecipeBuild,
    TranslationTemplatesBuild,
    LiveFilesystemBuild,
    SnapBuild,
    OciRecipeBuild,
    CharmRecipeBuild,
}

/// Status of the durable build record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    NeedsBuild,
    Building,
    Uploading,
    FullyBuilt,
    FailedToBuild,
    ChrootWait,
    ManualDepWait,
    Superseded,
    FailedToUpload,
    Cancelling,
    Cancelled,
}

impl BuildStatus {
    /// Terminal states are historical facts, the build never leaves them
    /// without an explicit administrative retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildStatus::FullyBuilt
                | BuildStatus::FailedToBuild
                | BuildStatus::ChrootWait
                | BuildStatus::ManualDepWait
                | BuildStatus::Superseded
                | BuildStatus::FailedToUpload
                | BuildStatus::Cancelled
        )
    }

    /// States in which the build owns exactly one queue entry.
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            BuildStatus::NeedsBuild | BuildStatus::Building | BuildStatus::Cancelling
        )
    }

    /// Terminal states an administrator may send back to NEEDSBUILD.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BuildStatus::FailedToBuild
                | BuildStatus::ChrootWait
                | BuildStatus::ManualDepWait
                | BuildStatus::FailedToUpload
                | BuildStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        use BuildStatus::*;
        match (*self, next) {
            (NeedsBuild, Building)
            | (NeedsBuild, ManualDepWait)
            | (NeedsBuild, ChrootWait)
            | (NeedsBuild, Superseded)
            | (NeedsBuild, FailedToBuild)
            | (NeedsBuild, Cancelled) => true,
            (Building, NeedsBuild)
            | (Building, Uploading)
            | (Building, FullyBuilt)
            | (Building, FailedToBuild)
            | (Building, FailedToUpload)
            | (Building, ManualDepWait)
            | (Building, ChrootWait)
            | (Building, Cancelling) => true,
            (Uploading, FullyBuilt) | (Uploading, FailedToUpload) => true,
            (Cancelling, Cancelled) => true,
            (from, NeedsBuild) => from.is_retryable(),
            _ => false,
        }
    }

    pub fn fancy(&self) -> String {
        let label = format!("{:<14}", self.as_ref());
        match self {
            BuildStatus::FullyBuilt => label.green().to_string(),
            BuildStatus::NeedsBuild | BuildStatus::Building | BuildStatus::Uploading => {
                label.blue().to_string()
            }
            BuildStatus::ChrootWait | BuildStatus::ManualDepWait => label.yellow().to_string(),
            BuildStatus::Superseded | BuildStatus::Cancelling | BuildStatus::Cancelled => {
                label.dimmed().to_string()
            }
            BuildStatus::FailedToBuild | BuildStatus::FailedToUpload => label.red().to_string(),
        }
    }
}

/// Status of the ephemeral scheduling record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildQueueStatus {
    Waiting,
    Running,
    Cancelling,
    Suspended,
}

impl BuildQueueStatus {
    /// A builder is bound to the entry in these states.
    pub fn holds_builder(&self) -> bool {
        matches!(self, BuildQueueStatus::Running | BuildQueueStatus::Cancelling)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CleanStatus {
    Clean,
    Dirty,
    Cleaning,
}

/// How a builder is returned to a clean state after a job.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum ResetProtocol {
    /// The reset call returns once the builder accepts requests again.
    #[default]
    #[strum(serialize = "1.1")]
    #[serde(rename = "1.1")]
    Proto1_1,
    /// The reset call only acknowledges the request, the builder reports
    /// itself clean later on.
    #[strum(serialize = "2.0")]
    #[serde(rename = "2.0")]
    Proto2_0,
}
