use super::RECIPE_BASE_SCORE;
use crate::models::{Build, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::JobType;
use chrono::prelude::*;
use chrono::Duration;

/// Extracts translation templates from a source branch. These jobs are cheap
/// and don't belong to an archive.
#[derive(Debug, Default)]
pub struct TranslationTemplatesBuild;

impl JobTypeBehaviour for TranslationTemplatesBuild {
    fn job_type(&self) -> JobType {
        JobType::TranslationTemplatesBuild
    }

    fn score(&self, build: &Build, _now: DateTime<Utc>) -> i32 {
        RECIPE_BASE_SCORE + build.archive.relative_build_score
    }

    fn is_eligible(&self, _build: &Build, _builder: &Builder) -> bool {
        true
    }

    fn estimated_duration(&self, request: &BuildRequest) -> Duration {
        Duration::seconds(request.estimated_duration.unwrap_or(5 * 60))
    }
}
