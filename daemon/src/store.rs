use crate::models::*;
use crate::registry::JobTypeRegistry;
use buildfarm_common::config::BuilderConfig;
use buildfarm_common::errors::*;
use buildfarm_common::{BuildQueueStatus, BuildStatus, CleanStatus};
use chrono::prelude::*;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lookup of a row that doesn't exist, kept as a distinct error so the http
/// api can answer with 404.
#[derive(Debug)]
pub struct NotFound {
    kind: &'static str,
    id: String,
}

impl NotFound {
    pub fn new(kind: &'static str, id: impl fmt::Display) -> Error {
        Error::new(NotFound {
            kind,
            id: id.to_string(),
        })
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        write!(w, "Unknown {}: {}", self.kind, self.id)
    }
}

impl std::error::Error for NotFound {}

/// Arena of all scheduling state. Rows reference each other by id only, every
/// method that touches a reference updates both sides of it.
#[derive(Debug, Default)]
pub struct Store {
    builds: BTreeMap<BuildId, Build>,
    queue: BTreeMap<BuildQueueId, BuildQueue>,
    builders: BTreeMap<BuilderId, Builder>,
    next_build_id: i32,
    next_queue_id: i32,
    next_builder_id: i32,
}

/// Serialized form of the store.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub builds: Vec<Build>,
    pub queue: Vec<BuildQueue>,
    pub builders: Vec<Builder>,
    pub next_build_id: i32,
    pub next_queue_id: i32,
    pub next_builder_id: i32,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn restore(snapshot: Snapshot) -> Result<Store> {
        let store = Store {
            builds: snapshot.builds.into_iter().map(|b| (b.id, b)).collect(),
            queue: snapshot.queue.into_iter().map(|q| (q.id, q)).collect(),
            builders: snapshot.builders.into_iter().map(|b| (b.id, b)).collect(),
            next_build_id: snapshot.next_build_id,
            next_queue_id: snapshot.next_queue_id,
            next_builder_id: snapshot.next_builder_id,
        };
        store
            .check_invariants()
            .context("Snapshot is inconsistent")?;
        Ok(store)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            builds: self.builds.values().cloned().collect(),
            queue: self.queue.values().cloned().collect(),
            builders: self.builders.values().cloned().collect(),
            next_build_id: self.next_build_id,
            next_queue_id: self.next_queue_id,
            next_builder_id: self.next_builder_id,
        }
    }

    /// Registers a builder, or updates the builder with the same name.
    pub fn upsert_builder(&mut self, config: &BuilderConfig, now: DateTime<Utc>) -> BuilderId {
        if let Some(builder) = self.builders.values_mut().find(|b| b.name == config.name) {
            builder.update(config);
            return builder.id;
        }

        self.next_builder_id += 1;
        let id = BuilderId(self.next_builder_id);
        info!("Registering builder {:?} as {}", config.name, id);
        self.builders.insert(id, Builder::new(id, config, now));
        id
    }

    pub fn builder(&self, id: BuilderId) -> Result<&Builder> {
        self.builders
            .get(&id)
            .ok_or_else(|| NotFound::new("builder", id))
    }

    pub fn builder_mut(&mut self, id: BuilderId) -> Result<&mut Builder> {
        self.builders
            .get_mut(&id)
            .ok_or_else(|| NotFound::new("builder", id))
    }

    /// Ordered by id.
    pub fn builders(&self) -> impl Iterator<Item = &Builder> {
        self.builders.values()
    }

    pub fn build(&self, id: BuildId) -> Result<&Build> {
        self.builds
            .get(&id)
            .ok_or_else(|| NotFound::new("build", id))
    }

    pub fn build_mut(&mut self, id: BuildId) -> Result<&mut Build> {
        self.builds
            .get_mut(&id)
            .ok_or_else(|| NotFound::new("build", id))
    }

    pub fn builds(&self) -> impl Iterator<Item = &Build> {
        self.builds.values()
    }

    pub fn queue_entry(&self, id: BuildQueueId) -> Result<&BuildQueue> {
        self.queue
            .get(&id)
            .ok_or_else(|| NotFound::new("queue entry", id))
    }

    pub fn queue_entry_mut(&mut self, id: BuildQueueId) -> Result<&mut BuildQueue> {
        self.queue
            .get_mut(&id)
            .ok_or_else(|| NotFound::new("queue entry", id))
    }

    /// Ordered by id, which is also the order the entries were created in.
    pub fn queue_entries(&self) -> impl Iterator<Item = &BuildQueue> {
        self.queue.values()
    }

    pub fn contains_queue_entry(&self, id: BuildQueueId) -> bool {
        self.queue.contains_key(&id)
    }

    /// Borrows a queue entry together with the build it schedules.
    pub fn entry_and_build_mut(
        &mut self,
        id: BuildQueueId,
    ) -> Result<(&mut BuildQueue, &mut Build)> {
        let entry = self
            .queue
            .get_mut(&id)
            .ok_or_else(|| NotFound::new("queue entry", id))?;
        let build = self
            .builds
            .get_mut(&entry.build_id)
            .ok_or_else(|| anyhow!("{} points to unknown build {}", id, entry.build_id))?;
        Ok((entry, build))
    }

    pub fn allocate_build_id(&mut self) -> BuildId {
        self.next_build_id += 1;
        BuildId(self.next_build_id)
    }

    pub fn insert_build(&mut self, build: Build) -> Result<BuildId> {
        let id = build.id;
        if self.builds.contains_key(&id) {
            bail!("{} already exists", id);
        }
        if build.status() != BuildStatus::NeedsBuild || build.build_queue().is_some() {
            bail!("New builds have to start out pending and unqueued");
        }
        self.builds.insert(id, build);
        Ok(id)
    }

    /// Creates the waiting queue entry of a pending build.
    pub fn enqueue(&mut self, build_id: BuildId, estimated_duration: Duration) -> Result<BuildQueueId> {
        let id = BuildQueueId(self.next_queue_id + 1);
        let build = self.build_mut(build_id)?;
        if build.status() != BuildStatus::NeedsBuild {
            bail!("Can't queue {} while it is {}", build_id, build.status());
        }
        if let Some(existing) = build.build_queue {
            bail!("{} is already queued as {}", build_id, existing);
        }
        build.build_queue = Some(id);
        build.estimated_duration = estimated_duration.num_seconds();
        let job = build.job.clone();

        self.next_queue_id += 1;
        self.queue
            .insert(id, BuildQueue::new(id, build_id, job, estimated_duration));
        debug!("Queued {} as {}", build_id, id);
        Ok(id)
    }

    /// Binds a waiting entry to a builder, both back-references are set
    /// together. Refuses builders that are not ready for work.
    pub fn attach(
        &mut self,
        queue_id: BuildQueueId,
        builder_id: BuilderId,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let builder = self.builder(builder_id)?;
        builder
            .can_dispatch()
            .with_context(|| anyhow!("Refusing to dispatch {} to {}", queue_id, builder_id))?;

        let entry = self.queue_entry_mut(queue_id)?;
        if entry.status != BuildQueueStatus::Waiting {
            bail!("Can't dispatch {} while it is {}", queue_id, entry.status);
        }
        entry.status = BuildQueueStatus::Running;
        entry.builder = Some(builder_id);
        entry.date_started = Some(now);
        entry.not_before = None;
        entry.renew_lease(lease, now);

        let builder = self.builder_mut(builder_id)?;
        builder.current_job = Some(queue_id);
        builder.set_clean_status(CleanStatus::Dirty, now);
        Ok(())
    }

    /// Puts a running entry back into the waiting state and frees its builder.
    pub fn requeue(&mut self, queue_id: BuildQueueId) -> Result<Option<BuilderId>> {
        let entry = self.queue_entry_mut(queue_id)?;
        let builder = entry.builder.take();
        entry.status = BuildQueueStatus::Waiting;
        entry.date_started = None;
        entry.lease_expires = None;
        entry.cancel_reason = None;

        if let Some(builder) = builder {
            self.release_builder(builder, queue_id)?;
        }
        Ok(builder)
    }

    /// Removes the queue entry of a build that left scheduling. This is the
    /// only way a build stops being scheduled.
    pub fn destroy_queue(&mut self, queue_id: BuildQueueId) -> Result<BuildQueue> {
        let entry = self
            .queue
            .remove(&queue_id)
            .ok_or_else(|| NotFound::new("queue entry", queue_id))?;

        if let Some(builder) = entry.builder {
            self.release_builder(builder, queue_id)?;
        }
        if let Some(build) = self.builds.get_mut(&entry.build_id) {
            build.build_queue = None;
        }
        debug!("Removed {} of {}", queue_id, entry.build_id);
        Ok(entry)
    }

    fn release_builder(&mut self, builder_id: BuilderId, queue_id: BuildQueueId) -> Result<()> {
        let builder = self.builder_mut(builder_id)?;
        if builder.current_job == Some(queue_id) {
            builder.current_job = None;
        } else {
            warn!(
                "{} was bound to {} but the builder points to {:?}",
                queue_id, builder_id, builder.current_job
            );
        }
        Ok(())
    }

    pub fn score_entry(
        &mut self,
        queue_id: BuildQueueId,
        registry: &JobTypeRegistry,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (entry, build) = self.entry_and_build_mut(queue_id)?;
        entry.score(build, registry, now)
    }

    /// Recomputes the score of every entry that is not running yet.
    pub fn rescore(&mut self, registry: &JobTypeRegistry, now: DateTime<Utc>) {
        for entry in self.queue.values_mut() {
            if entry.status.holds_builder() {
                continue;
            }
            let result = match self.builds.get(&entry.build_id) {
                Some(build) => entry.score(build, registry, now),
                None => Err(anyhow!("{} points to unknown build {}", entry.id, entry.build_id)),
            };
            if let Err(err) = result {
                error!("Failed to score {}: {:#}", entry.id, err);
            }
        }
    }

    /// Verifies the references between builds, queue entries and builders.
    pub fn check_invariants(&self) -> Result<()> {
        for build in self.builds.values() {
            match (build.status().is_scheduled(), build.build_queue()) {
                (true, Some(queue_id)) => {
                    let entry = self.queue_entry(queue_id).with_context(|| {
                        anyhow!("{} points to a missing queue entry", build.id)
                    })?;
                    if entry.build_id != build.id {
                        bail!("{} points to {} which belongs to {}", build.id, queue_id, entry.build_id);
                    }
                }
                (true, None) => bail!("{} is {} but not queued", build.id, build.status()),
                (false, Some(queue_id)) => {
                    bail!("{} is {} but still queued as {}", build.id, build.status(), queue_id)
                }
                (false, None) => (),
            }
        }

        for entry in self.queue.values() {
            let build = self
                .build(entry.build_id)
                .with_context(|| anyhow!("{} is orphaned", entry.id))?;
            if build.build_queue() != Some(entry.id) {
                bail!("{} is orphaned, {} points to {:?}", entry.id, build.id, build.build_queue());
            }

            let expected = match entry.status {
                BuildQueueStatus::Waiting | BuildQueueStatus::Suspended => BuildStatus::NeedsBuild,
                BuildQueueStatus::Running => BuildStatus::Building,
                BuildQueueStatus::Cancelling => BuildStatus::Cancelling,
            };
            if build.status() != expected {
                bail!("{} is {} but {} is {}", entry.id, entry.status, build.id, build.status());
            }

            match (entry.status.holds_builder(), entry.builder) {
                (true, Some(builder_id)) => {
                    let builder = self.builder(builder_id)?;
                    if builder.current_job != Some(entry.id) {
                        bail!("{} runs on {} but the builder points to {:?}", entry.id, builder_id, builder.current_job);
                    }
                }
                (true, None) => bail!("{} is {} without a builder", entry.id, entry.status),
                (false, Some(builder_id)) => {
                    bail!("{} is {} but bound to {}", entry.id, entry.status, builder_id)
                }
                (false, None) => (),
            }
        }

        for builder in self.builders.values() {
            if let Some(queue_id) = builder.current_job {
                let entry = self
                    .queue_entry(queue_id)
                    .with_context(|| anyhow!("{} points to a missing queue entry", builder.id))?;
                if entry.builder != Some(builder.id) || !entry.status.holds_builder() {
                    bail!("{} points to {} which is not running on it", builder.id, queue_id);
                }
            }
        }

        Ok(())
    }
}
