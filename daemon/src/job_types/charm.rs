use super::{archive_allows, recipe_score};
use crate::models::{Build, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::JobType;
use chrono::prelude::*;

#[derive(Debug, Default)]
pub struct CharmRecipeBuild;

impl JobTypeBehaviour for CharmRecipeBuild {
    fn job_type(&self) -> JobType {
        JobType::CharmRecipeBuild
    }

    fn score(&self, build: &Build, _now: DateTime<Utc>) -> i32 {
        recipe_score(build, 50)
    }

    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool {
        archive_allows(build, builder)
    }
}
