use super::{archive_allows, recipe_score};
use crate::models::{Build, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::JobType;
use chrono::prelude::*;
use chrono::Duration;

/// Source package recipe builds, usually triggered daily.
#[derive(Debug, Default)]
pub struct RecipeBuild;

impl JobTypeBehaviour for RecipeBuild {
    fn job_type(&self) -> JobType {
        JobType::RecipeBuild
    }

    fn score(&self, build: &Build, _now: DateTime<Utc>) -> i32 {
        // someone is waiting for a manually requested build, daily builds can wait
        recipe_score(build, 100)
    }

    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool {
        archive_allows(build, builder)
    }

    fn estimated_duration(&self, request: &BuildRequest) -> Duration {
        Duration::seconds(request.estimated_duration.unwrap_or(10 * 60))
    }
}
