use buildfarm_common::api::CancelState;
use buildfarm_common::{BuildQueueStatus, CleanStatus};
use colored::Colorize;

pub trait Fancy {
    fn fancy(&self) -> String;
}

impl Fancy for CleanStatus {
    fn fancy(&self) -> String {
        let label = format!("{:<8}", self.to_string());
        match self {
            CleanStatus::Clean => label.green().to_string(),
            CleanStatus::Dirty => label.yellow().to_string(),
            CleanStatus::Cleaning => label.blue().to_string(),
        }
    }
}

impl Fancy for BuildQueueStatus {
    fn fancy(&self) -> String {
        let label = format!("{:<10}", self.to_string());
        match self {
            BuildQueueStatus::Waiting => label.normal().to_string(),
            BuildQueueStatus::Running => label.blue().to_string(),
            BuildQueueStatus::Cancelling => label.yellow().to_string(),
            BuildQueueStatus::Suspended => label.dimmed().to_string(),
        }
    }
}

impl Fancy for CancelState {
    fn fancy(&self) -> String {
        match self {
            CancelState::Cancelled => self.to_string().green().to_string(),
            CancelState::Cancelling | CancelState::AlreadyCancelling => {
                self.to_string().yellow().to_string()
            }
            CancelState::NotQueued => self.to_string().dimmed().to_string(),
        }
    }
}
