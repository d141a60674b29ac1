use crate::fixtures::worker::FakeWorker;
use buildd_manager::admin;
use buildd_manager::db::{self, Pool};
use buildd_manager::interactor::WorkerChannel;
use buildd_manager::models::{BuildId, BuildQueueId, BuilderId};
use buildd_manager::registry::JobTypeRegistry;
use buildd_manager::scheduler::{ScanReport, SchedulePolicy, Scheduler};
use buildd_manager::store::Store;
use buildfarm_common::api::BuildRequest;
use buildfarm_common::config::BuilderConfig;
use chrono::prelude::*;
use std::sync::{Arc, MutexGuard};

/// A scheduler with its store and a fake set of builders, scans are driven by
/// the test with an explicit clock.
pub struct Farm {
    pub pool: Pool,
    pub registry: Arc<JobTypeRegistry>,
    pub worker: Arc<FakeWorker>,
    pub scheduler: Scheduler,
    pub now: DateTime<Utc>,
}

impl Farm {
    pub fn new(builders: &[BuilderConfig], policy: SchedulePolicy) -> Farm {
        let pool = db::setup_pool(None).unwrap();
        buildd_manager::register_builders(&pool, builders).unwrap();

        let registry = Arc::new(JobTypeRegistry::standard().unwrap());
        let worker = Arc::new(FakeWorker::new());
        let channel: Arc<dyn WorkerChannel> = worker.clone();
        let scheduler = Scheduler::new(pool.clone(), registry.clone(), channel, policy);

        Farm {
            pool,
            registry,
            worker,
            scheduler,
            now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn store(&self) -> MutexGuard<'_, Store> {
        db::lock(&self.pool).unwrap()
    }

    pub fn builder_id(&self, name: &str) -> BuilderId {
        self.store()
            .builders()
            .find(|b| b.name == name)
            .map(|b| b.id)
            .unwrap()
    }

    pub fn queue(&self, request: &BuildRequest) -> (BuildId, BuildQueueId) {
        let mut store = self.store();
        let queued = admin::queue_build(&mut store, &self.registry, request, self.now).unwrap();
        (BuildId(queued.build_id), BuildQueueId(queued.queue_id))
    }

    pub fn advance(&mut self, duration: chrono::Duration) {
        self.now += duration;
    }

    /// Runs one scan and verifies the store is still consistent afterwards.
    pub async fn scan(&mut self) -> ScanReport {
        let report = self.scheduler.scan(self.now).await.unwrap();
        self.store().check_invariants().unwrap();
        report
    }

    /// Waits for all outstanding aborts and finalizes them.
    pub async fn settle(&mut self) -> ScanReport {
        let report = self.scheduler.settle_cancellations(self.now).await.unwrap();
        self.store().check_invariants().unwrap();
        report
    }
}
