use super::{archive_allows, recipe_score};
use crate::models::{Build, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::JobType;
use chrono::prelude::*;
use chrono::Duration;

/// Live filesystem images, these take a long time.
#[derive(Debug, Default)]
pub struct LiveFilesystemBuild;

impl JobTypeBehaviour for LiveFilesystemBuild {
    fn job_type(&self) -> JobType {
        JobType::LiveFilesystemBuild
    }

    fn score(&self, build: &Build, _now: DateTime<Utc>) -> i32 {
        recipe_score(build, 0)
    }

    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool {
        archive_allows(build, builder)
    }

    fn estimated_duration(&self, request: &BuildRequest) -> Duration {
        Duration::seconds(request.estimated_duration.unwrap_or(2 * 3600))
    }
}
