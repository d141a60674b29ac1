use super::{age_bonus, archive_allows};
use crate::models::{Build, Builder};
use crate::registry::JobTypeBehaviour;
use buildfarm_common::api::{ArchivePurpose, Pocket, Urgency};
use buildfarm_common::JobType;
use chrono::prelude::*;

pub const PRIVATE_ARCHIVE_BONUS: i32 = 10000;
pub const COPY_ARCHIVE_PENALTY: i32 = 2600;

fn pocket_score(pocket: Pocket) -> i32 {
    match pocket {
        Pocket::Backports => 0,
        Pocket::Release => 1500,
        Pocket::Proposed | Pocket::Updates => 3000,
        Pocket::Security => 4500,
    }
}

fn component_score(component: Option<&str>) -> i32 {
    match component {
        Some("main") | Some("partner") => 1000,
        Some("restricted") => 750,
        Some("universe") => 250,
        _ => 0,
    }
}

fn urgency_score(urgency: Urgency) -> i32 {
    match urgency {
        Urgency::Low => 5,
        Urgency::Medium => 10,
        Urgency::High => 15,
        Urgency::Emergency => 20,
    }
}

/// Binary package builds from a source package.
#[derive(Debug, Default)]
pub struct PackageBuild;

impl JobTypeBehaviour for PackageBuild {
    fn job_type(&self) -> JobType {
        JobType::PackageBuild
    }

    fn score(&self, build: &Build, now: DateTime<Utc>) -> i32 {
        let mut score = pocket_score(build.pocket)
            + component_score(build.component.as_deref())
            + urgency_score(build.urgency)
            + age_bonus(build, now)
            + build.archive.relative_build_score;

        if build.archive.private {
            score += PRIVATE_ARCHIVE_BONUS;
        }
        if build.archive.purpose == ArchivePurpose::Copy {
            score -= COPY_ARCHIVE_PENALTY;
        }
        score
    }

    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool {
        archive_allows(build, builder)
    }
}
