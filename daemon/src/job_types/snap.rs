use super::{archive_allows, recipe_score};
use crate::models::{Build, BuildFarmJob, BuildId, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::errors::*;
use buildfarm_common::JobType;
use chrono::prelude::*;

/// Snap packages. Snaps fetch arbitrary sources from the network and are
/// only ever built on virtualized builders.
#[derive(Debug, Default)]
pub struct SnapBuild;

impl JobTypeBehaviour for SnapBuild {
    fn job_type(&self) -> JobType {
        JobType::SnapBuild
    }

    fn score(&self, build: &Build, _now: DateTime<Utc>) -> i32 {
        recipe_score(build, 50)
    }

    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool {
        archive_allows(build, builder)
    }

    fn new_build(&self, id: BuildId, request: &BuildRequest, now: DateTime<Utc>) -> Result<Build> {
        if request.job_type != JobType::SnapBuild {
            bail!("snap-build can't create builds for {}", request.job_type);
        }
        if request.virtualized == Some(false) {
            bail!("Snaps can't be built on non-virtualized builders");
        }
        let job = BuildFarmJob::new(request.job_type, request.processor.clone(), Some(true));
        Ok(Build::new(id, job, request, now))
    }
}
