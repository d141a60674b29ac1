use crate::models::Builder;
use buildfarm_common::JobType;
use serde::{Deserialize, Serialize};

/// Describes what a job needs from a builder. Created once per job, the job
/// type can't be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFarmJob {
    job_type: JobType,
    processor: Option<String>,
    virtualized: Option<bool>,
}

impl BuildFarmJob {
    pub fn new(job_type: JobType, processor: Option<String>, virtualized: Option<bool>) -> Self {
        BuildFarmJob {
            job_type,
            processor: processor.map(|p| canonical_processor(&p).to_string()),
            virtualized,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    /// `None` if the job runs on any processor.
    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    /// `None` if the job doesn't care about virtualization.
    pub fn virtualized(&self) -> Option<bool> {
        self.virtualized
    }

    /// Checks the processor and virtualization requirements against what the
    /// builder offers. Job type specific checks are done by the registry.
    pub fn is_compatible_with(&self, builder: &Builder) -> bool {
        if let Some(processor) = &self.processor {
            if *processor != canonical_processor(&builder.processor) {
                return false;
            }
        }

        if let Some(virtualized) = self.virtualized {
            if virtualized != builder.virtualized {
                return false;
            }
        }

        true
    }
}

/// Rust's and the distros' names for the same architecture don't line up
/// (x86_64 vs amd64), everything is compared using the distro spelling.
pub fn canonical_processor(processor: &str) -> &str {
    match processor {
        "x86" => "i386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "powerpc64le" => "ppc64el",
        "riscv64gc" => "riscv64",
        other => other,
    }
}
