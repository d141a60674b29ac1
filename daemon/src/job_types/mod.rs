//! Behaviours of the job types this build farm runs.

use crate::models::{Build, Builder};
use buildfarm_common::api::ArchivePurpose;
use chrono::prelude::*;

macro_rules! import_job_types {
    ($x:ident) => {
        mod $x;
        pub use self::$x::*;
    };
}

import_job_types!(package);
import_job_types!(recipe);
import_job_types!(translation_templates);
import_job_types!(livefs);
import_job_types!(snap);
import_job_types!(oci);
import_job_types!(charm);

/// Base score of everything that isn't a package build, high enough to
/// overtake package builds from the release pocket.
pub const RECIPE_BASE_SCORE: i32 = 2510;

/// Bonus for jobs that were waiting for a while, largest threshold first.
const AGE_BONUS: &[(i64, i32)] = &[(24 * 3600, 100), (4 * 3600, 50), (3600, 20), (300, 5)];

pub fn age_bonus(build: &Build, now: DateTime<Utc>) -> i32 {
    let waited = (now - build.date_created).num_seconds();
    AGE_BONUS
        .iter()
        .find(|(threshold, _)| waited >= *threshold)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

/// Private archives must not leak onto shared, non-virtualized hosts and
/// disabled archives don't get any builds at all.
pub fn archive_allows(build: &Build, builder: &Builder) -> bool {
    if !build.archive.enabled {
        return false;
    }
    if build.archive.private && !builder.virtualized {
        return false;
    }
    true
}

/// Score for the job types that don't have a scoring policy of their own.
pub fn recipe_score(build: &Build, manual_bonus: i32) -> i32 {
    let mut score = RECIPE_BASE_SCORE + build.archive.relative_build_score;
    if build.requested_manually {
        score += manual_bonus;
    }
    if build.archive.purpose == ArchivePurpose::Copy {
        score -= package::COPY_ARCHIVE_PENALTY;
    }
    score
}
