use crate::job_types;
use crate::models::*;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::errors::*;
use buildfarm_common::{BuildStatus, JobType};
use chrono::prelude::*;
use chrono::Duration;
use std::collections::HashMap;

/// Fallback if neither the request nor the job type knows better.
pub const DEFAULT_ESTIMATED_DURATION: i64 = 30 * 60;

/// Everything the scheduler needs to know about a kind of job. The scheduler
/// never looks at the job type itself, it only calls into this trait.
pub trait JobTypeBehaviour: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Priority of a waiting job, higher is dispatched first.
    fn score(&self, build: &Build, now: DateTime<Utc>) -> i32;

    /// Checked on top of the processor and virtualization match during
    /// candidate selection.
    fn is_eligible(&self, build: &Build, builder: &Builder) -> bool;

    fn new_build(&self, id: BuildId, request: &BuildRequest, now: DateTime<Utc>) -> Result<Build> {
        if request.job_type != self.job_type() {
            bail!(
                "{} can't create builds for {}",
                self.job_type(),
                request.job_type
            );
        }
        if request.name.is_empty() {
            bail!("Build request is missing a name");
        }
        let job = BuildFarmJob::new(request.job_type, request.processor.clone(), request.virtualized);
        Ok(Build::new(id, job, request, now))
    }

    fn estimated_duration(&self, request: &BuildRequest) -> Duration {
        Duration::seconds(
            request
                .estimated_duration
                .unwrap_or(DEFAULT_ESTIMATED_DURATION),
        )
    }

    /// A builder accepted the job.
    fn job_started(&self, build: &mut Build, builder: BuilderId, now: DateTime<Utc>) -> Result<()> {
        build.mark_dispatched(builder, now)
    }

    /// The job went back to the queue after a transient error.
    fn job_reset(&self, build: &mut Build, now: DateTime<Utc>) -> Result<()> {
        build.mark_pending(now)
    }

    /// The job was taken away from the queue, either on request or because
    /// its lease ran out.
    fn job_aborted(&self, build: &mut Build, reason: CancelReason, now: DateTime<Utc>) -> Result<()> {
        build.set_status(BuildStatus::Cancelled, now)?;
        build.status_reason = Some(reason.to_string());
        Ok(())
    }
}

/// Dispatch table from job type to behaviour, built once at startup and
/// handed to the scheduler.
#[derive(Default)]
pub struct JobTypeRegistry {
    behaviours: HashMap<JobType, Box<dyn JobTypeBehaviour>>,
}

impl JobTypeRegistry {
    pub fn new() -> JobTypeRegistry {
        JobTypeRegistry::default()
    }

    /// A registry with every job type this build farm knows about.
    pub fn standard() -> Result<JobTypeRegistry> {
        let mut registry = JobTypeRegistry::new();
        registry.register(job_types::PackageBuild)?;
        registry.register(job_types::RecipeBuild)?;
        registry.register(job_types::TranslationTemplatesBuild)?;
        registry.register(job_types::LiveFilesystemBuild)?;
        registry.register(job_types::SnapBuild)?;
        registry.register(job_types::OciRecipeBuild)?;
        registry.register(job_types::CharmRecipeBuild)?;
        Ok(registry)
    }

    pub fn register<B: JobTypeBehaviour + 'static>(&mut self, behaviour: B) -> Result<()> {
        let job_type = behaviour.job_type();
        if self.behaviours.contains_key(&job_type) {
            bail!("Job type {} is already registered", job_type);
        }
        debug!("Registering job type {}", job_type);
        self.behaviours.insert(job_type, Box::new(behaviour));
        Ok(())
    }

    pub fn get(&self, job_type: JobType) -> Result<&dyn JobTypeBehaviour> {
        self.behaviours
            .get(&job_type)
            .map(|b| b.as_ref())
            .ok_or_else(|| anyhow!("No behaviour registered for job type {}", job_type))
    }

    pub fn job_types(&self) -> impl Iterator<Item = JobType> + '_ {
        self.behaviours.keys().copied()
    }
}
