#![cfg(test)]

use crate::data::*;
use crate::fixtures::farm::Farm;
use crate::fixtures::worker::Call;
use crate::fixtures::*;
use buildd_manager::models::*;
use buildd_manager::scheduler::SchedulePolicy;
use buildd_manager::{admin, cancel, db};
use buildfarm_common::api::worker::{BuildOutcome, BuildResult, BuilderState, WorkerStatus};
use buildfarm_common::api::CancelState;
use buildfarm_common::{BuildQueueStatus, BuildStatus, CleanStatus};
use chrono::Duration;
use rstest::rstest;
use tempfile::TempDir;

mod data;
pub(crate) mod fixtures;

#[rstest]
#[tokio::test]
pub async fn waiting_job_is_cancelled_right_away(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (build_id, queue_id) = farm.queue(&package_request("hello"));

    {
        let mut store = farm.store();
        let state =
            cancel::cancel(&mut store, &farm.registry, queue_id, CancelReason::Requested, farm.now)
                .unwrap();
        assert_eq!(state, CancelState::Cancelled);
        assert!(!store.contains_queue_entry(queue_id));
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::Cancelled);
        store.check_invariants().unwrap();
    }

    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());
    assert!(farm.worker.dispatched().is_empty());
}

#[rstest]
#[tokio::test]
pub async fn running_job_is_cancelled_once_builder_aborted(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&package_request("hello"));

    let report = farm.scan().await;
    assert_eq!(report.dispatched, vec![(queue_id, builder_id)]);

    {
        let mut store = farm.store();
        let state = admin::cancel_build(&mut store, &farm.registry, build_id, farm.now).unwrap();
        assert_eq!(state, CancelState::Cancelling);
        assert_eq!(
            store.queue_entry(queue_id).unwrap().status(),
            BuildQueueStatus::Cancelling
        );
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::Cancelling);
        assert_eq!(store.builder(builder_id).unwrap().current_job(), Some(queue_id));
    }

    // the abort is only sent, the entry stays until it's acknowledged
    farm.scan().await;
    assert_eq!(farm.scheduler.pending_cancellations(), 1);
    assert!(farm.store().contains_queue_entry(queue_id));

    let report = farm.settle().await;
    assert_eq!(report.cancelled, vec![queue_id]);
    {
        let store = farm.store();
        assert!(!store.contains_queue_entry(queue_id));
        let build = store.build(build_id).unwrap();
        assert_eq!(build.status(), BuildStatus::Cancelled);
        assert_eq!(
            build.status_reason.as_deref(),
            Some(CancelReason::Requested.to_string().as_str())
        );
        let builder = store.builder(builder_id).unwrap();
        assert_eq!(builder.current_job(), None);
        assert_eq!(builder.clean_status(), CleanStatus::Dirty);
    }
    assert_eq!(farm.worker.count(|c| matches!(c, Call::Abort { .. })), 1);

    // the builder is reset before it takes the next job
    let (_, next) = farm.queue(&package_request("world"));
    let report = farm.scan().await;
    assert_eq!(report.cleaned, vec![builder_id]);
    assert_eq!(report.dispatched, vec![(next, builder_id)]);
    assert_eq!(farm.worker.count(|c| matches!(c, Call::Reset { .. })), 2);
}

#[rstest]
#[tokio::test]
pub async fn unacknowledged_abort_still_cancels(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    farm.worker.ignore_aborts();

    farm.scan().await;
    {
        let mut store = farm.store();
        admin::cancel_build(&mut store, &farm.registry, build_id, farm.now).unwrap();
    }
    farm.scan().await;

    let report = farm.settle().await;
    assert_eq!(report.cancelled, vec![queue_id]);
    let store = farm.store();
    assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::Cancelled);
    assert_eq!(store.builder(builder_id).unwrap().failure_count, 1);
}

#[rstest]
#[tokio::test]
pub async fn cancel_is_idempotent(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (running, running_queue) = farm.queue(&package_request("hello"));
    farm.scan().await;
    let (waiting, _) = farm.queue(&package_request("world"));

    {
        let mut store = farm.store();
        let registry = &farm.registry;
        assert_eq!(
            admin::cancel_build(&mut store, registry, running, farm.now).unwrap(),
            CancelState::Cancelling
        );
        let snapshot = store.snapshot();
        assert_eq!(
            admin::cancel_build(&mut store, registry, running, farm.now).unwrap(),
            CancelState::AlreadyCancelling
        );
        assert_eq!(store.snapshot(), snapshot);

        assert_eq!(
            admin::cancel_build(&mut store, registry, waiting, farm.now).unwrap(),
            CancelState::Cancelled
        );
        let snapshot = store.snapshot();
        assert_eq!(
            admin::cancel_build(&mut store, registry, waiting, farm.now).unwrap(),
            CancelState::NotQueued
        );
        assert_eq!(store.snapshot(), snapshot);
    }

    farm.scan().await;
    farm.settle().await;
    let mut store = farm.store();
    assert!(!store.contains_queue_entry(running_queue));
    assert_eq!(
        cancel::cancel(
            &mut store,
            &farm.registry,
            running_queue,
            CancelReason::Requested,
            farm.now
        )
        .unwrap(),
        CancelState::NotQueued
    );
    // settling twice is harmless too
    cancel::mark_as_cancelled(&mut store, &farm.registry, running_queue, farm.now).unwrap();
    assert_eq!(store.build(running).unwrap().status(), BuildStatus::Cancelled);
}

#[rstest]
#[tokio::test]
pub async fn virtualized_job_skips_bare_metal_builder(policy: SchedulePolicy) {
    let mut farm = Farm::new(
        &[builder("bos01-amd64-002", false), builder("lcy02-amd64-001", true)],
        policy,
    );
    let virt = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&snap_request("hello-snap"));

    let report = farm.scan().await;
    assert_eq!(report.dispatched, vec![(queue_id, virt)]);
    assert_eq!(
        farm.worker.dispatched(),
        vec![("lcy02-amd64-001".to_string(), queue_id.0)]
    );

    let store = farm.store();
    assert_eq!(store.build(build_id).unwrap().builder, Some(virt));
    assert_eq!(store.builder(virt).unwrap().current_job(), Some(queue_id));
}

#[rstest]
#[tokio::test]
pub async fn higher_score_is_dispatched_first(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, low) = farm.queue(&package_request("low"));
    let (_, high) = farm.queue(&package_request("high"));
    {
        let mut store = farm.store();
        admin::manual_score(&mut store, low, 10).unwrap();
        admin::manual_score(&mut store, high, 20).unwrap();
    }

    let report = farm.scan().await;
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].0, high);

    let store = farm.store();
    assert_eq!(store.queue_entry(low).unwrap().status(), BuildQueueStatus::Waiting);
    assert_eq!(store.queue_entry(high).unwrap().status(), BuildQueueStatus::Running);
}

#[rstest]
#[tokio::test]
pub async fn security_update_beats_release_build(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, release) = farm.queue(&package_request("hello"));
    let mut security = package_request("openssl");
    security.pocket = buildfarm_common::api::Pocket::Security;
    let (_, security) = farm.queue(&security);

    {
        let store = farm.store();
        assert!(
            store.queue_entry(security).unwrap().last_score()
                > store.queue_entry(release).unwrap().last_score()
        );
    }

    let report = farm.scan().await;
    assert_eq!(report.dispatched[0].0, security);
}

#[rstest]
#[tokio::test]
pub async fn equal_scores_are_dispatched_oldest_first(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, first) = farm.queue(&package_request("hello"));
    let (_, second) = farm.queue(&package_request("world"));

    let report = farm.scan().await;
    assert_eq!(report.dispatched[0].0, first);
    assert_eq!(
        farm.store().queue_entry(second).unwrap().status(),
        BuildQueueStatus::Waiting
    );
}

#[rstest]
#[tokio::test]
pub async fn manual_score_survives_rescoring(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, queue_id) = farm.queue(&package_request("hello"));
    {
        let mut store = farm.store();
        admin::manual_score(&mut store, queue_id, 5000).unwrap();
        store.score_entry(queue_id, &farm.registry, farm.now).unwrap();
        for _ in 0..3 {
            store.rescore(&farm.registry, farm.now + Duration::days(2));
        }
        let entry = store.queue_entry(queue_id).unwrap();
        assert_eq!(entry.last_score(), 5000);
        assert!(entry.is_manually_scored());
    }

    farm.advance(Duration::hours(6));
    farm.scan().await;
    assert_eq!(farm.store().queue_entry(queue_id).unwrap().last_score(), 5000);
}

#[rstest]
#[tokio::test]
pub async fn waiting_jobs_age_into_higher_scores(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, queue_id) = farm.queue(&package_request("hello"));
    let fresh = farm.store().queue_entry(queue_id).unwrap().last_score();

    let mut store = farm.store();
    store.rescore(&farm.registry, farm.now + Duration::hours(25));
    assert!(store.queue_entry(queue_id).unwrap().last_score() > fresh);
}

#[rstest]
#[tokio::test]
pub async fn successful_build_is_handed_to_upload(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&package_request("hello"));

    farm.scan().await;
    let mut outcome = BuildOutcome::new(BuildResult::Ok);
    outcome.log = Some("buildlog_ubuntu-amd64.hello_1.0-1.txt.gz".to_string());
    farm.worker.script_job(queue_id, WorkerStatus::Done(outcome));

    farm.advance(Duration::seconds(15));
    let report = farm.scan().await;
    assert_eq!(report.completed, vec![queue_id]);
    {
        let mut store = farm.store();
        assert!(!store.contains_queue_entry(queue_id));
        let build = store.build(build_id).unwrap();
        assert_eq!(build.status(), BuildStatus::Uploading);
        assert_eq!(build.build_queue(), None);
        assert!(build.log.is_some());
        assert_eq!(store.builder(builder_id).unwrap().current_job(), None);

        admin::complete_upload(&mut store, build_id, true, farm.now).unwrap();
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::FullyBuilt);
        assert!(admin::retry_build(&mut store, &farm.registry, build_id, farm.now).is_err());
        store.check_invariants().unwrap();
    }
}

#[rstest]
#[tokio::test]
pub async fn dep_wait_can_be_retried(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (build_id, queue_id) = farm.queue(&package_request("hello"));

    farm.scan().await;
    let mut outcome = BuildOutcome::new(BuildResult::DepWait);
    outcome.dependencies = Some("libfoo-dev (>= 1.2)".to_string());
    farm.worker.script_job(queue_id, WorkerStatus::Done(outcome));
    farm.scan().await;

    let retried = {
        let mut store = farm.store();
        let build = store.build(build_id).unwrap();
        assert_eq!(build.status(), BuildStatus::ManualDepWait);
        assert_eq!(build.dependencies.as_deref(), Some("libfoo-dev (>= 1.2)"));

        let retried = admin::retry_build(&mut store, &farm.registry, build_id, farm.now).unwrap();
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::NeedsBuild);
        store.check_invariants().unwrap();
        BuildQueueId(retried.queue_id)
    };

    let report = farm.scan().await;
    assert_eq!(report.dispatched[0].0, retried);
}

#[rstest]
#[tokio::test]
pub async fn lease_is_renewed_while_building(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (_, queue_id) = farm.queue(&package_request("hello"));
    farm.scan().await;

    farm.advance(Duration::seconds(200));
    farm.scan().await;
    let expires = farm.store().queue_entry(queue_id).unwrap().lease_expires;
    assert_eq!(expires, Some(farm.now + Duration::seconds(300)));

    // a silent builder is tolerated until the lease runs out
    farm.worker.set_unreachable("lcy02-amd64-001", true);
    farm.advance(Duration::seconds(200));
    let report = farm.scan().await;
    assert!(report.lease_expired.is_empty());
    assert_eq!(
        farm.store().queue_entry(queue_id).unwrap().status(),
        BuildQueueStatus::Running
    );
}

#[rstest]
#[tokio::test]
pub async fn expired_lease_cancels_job(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    farm.scan().await;

    farm.worker.set_unreachable("lcy02-amd64-001", true);
    farm.advance(Duration::minutes(10));
    let report = farm.scan().await;
    assert_eq!(report.lease_expired, vec![queue_id]);
    {
        let store = farm.store();
        assert_eq!(
            store.queue_entry(queue_id).unwrap().status(),
            BuildQueueStatus::Cancelling
        );
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::Cancelling);
    }

    farm.scan().await;
    let report = farm.settle().await;
    assert_eq!(report.cancelled, vec![queue_id]);

    let store = farm.store();
    let build = store.build(build_id).unwrap();
    assert_eq!(build.status(), BuildStatus::Cancelled);
    assert_eq!(
        build.status_reason.as_deref(),
        Some(CancelReason::LeaseExpired.to_string().as_str())
    );
    let builder = store.builder(builder_id).unwrap();
    assert_eq!(builder.current_job(), None);
    // the failed poll and the failed abort
    assert_eq!(builder.failure_count, 2);
}

#[rstest]
#[tokio::test]
pub async fn job_aborted_by_builder_is_requeued(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    farm.scan().await;

    farm.worker.script_job(queue_id, WorkerStatus::Aborted);
    let report = farm.scan().await;
    assert_eq!(report.requeued, vec![queue_id]);
    {
        let store = farm.store();
        let entry = store.queue_entry(queue_id).unwrap();
        assert_eq!(entry.status(), BuildQueueStatus::Waiting);
        assert_eq!(entry.builder(), None);
        assert_eq!(entry.not_before, Some(farm.now + Duration::seconds(60)));
        let build = store.build(build_id).unwrap();
        assert_eq!(build.status(), BuildStatus::NeedsBuild);
        assert_eq!(build.failure_count, 1);
    }

    // not offered again before the delay passed
    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());

    farm.advance(Duration::seconds(61));
    let report = farm.scan().await;
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(farm.worker.dispatched().len(), 2);
}

#[rstest]
#[tokio::test]
pub async fn failing_dispatch_gives_up_after_max_retries(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    farm.worker.refuse_dispatch("lcy02-amd64-001");

    let report = farm.scan().await;
    assert_eq!(report.requeued, vec![queue_id]);

    let mut failed = Vec::new();
    for _ in 0..10 {
        farm.advance(Duration::hours(1));
        let report = farm.scan().await;
        failed.extend(report.failed);
        if !failed.is_empty() {
            break;
        }
    }
    assert_eq!(failed, vec![queue_id]);
    assert_eq!(farm.worker.dispatched().len(), 4);

    let store = farm.store();
    assert!(!store.contains_queue_entry(queue_id));
    let build = store.build(build_id).unwrap();
    assert_eq!(build.status(), BuildStatus::FailedToBuild);
    assert_eq!(build.failure_count, 4);
    let reason = build.status_reason.as_deref().unwrap();
    assert!(reason.starts_with("Giving up after 4 attempts"), "{}", reason);
    // resets in between succeed so the builder stays in rotation
    assert!(store.builder(builder_id).unwrap().builder_ok());
}

#[rstest]
#[tokio::test]
pub async fn unreachable_builder_is_disabled(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    farm.worker.set_unreachable("lcy02-amd64-001", true);

    let mut disabled = Vec::new();
    for _ in 0..5 {
        let report = farm.scan().await;
        disabled.extend(report.disabled);
    }
    assert_eq!(disabled, vec![builder_id]);
    {
        let store = farm.store();
        let builder = store.builder(builder_id).unwrap();
        assert!(!builder.builder_ok());
        assert_eq!(builder.clean_status(), CleanStatus::Dirty);
        assert!(builder
            .fail_notes()
            .unwrap()
            .starts_with("Failure threshold reached"));
    }

    farm.scan().await;
    assert_eq!(farm.worker.count(|c| matches!(c, Call::Reset { .. })), 5);

    farm.worker.set_unreachable("lcy02-amd64-001", false);
    admin::enable_builder(&mut farm.store(), builder_id, farm.now).unwrap();
    let (_, queue_id) = farm.queue(&package_request("hello"));
    let report = farm.scan().await;
    assert_eq!(report.cleaned, vec![builder_id]);
    assert_eq!(report.dispatched, vec![(queue_id, builder_id)]);
}

#[rstest]
#[tokio::test]
pub async fn failed_reset_is_retried(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    farm.worker.fail_resets("lcy02-amd64-001", 1);
    let (_, queue_id) = farm.queue(&package_request("hello"));

    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());
    {
        let store = farm.store();
        let builder = store.builder(builder_id).unwrap();
        assert_eq!(builder.clean_status(), CleanStatus::Dirty);
        assert_eq!(builder.failure_count, 1);
    }

    let report = farm.scan().await;
    assert_eq!(report.cleaned, vec![builder_id]);
    assert_eq!(report.dispatched, vec![(queue_id, builder_id)]);
    assert_eq!(farm.store().builder(builder_id).unwrap().failure_count, 0);
}

#[rstest]
#[tokio::test]
pub async fn async_reset_waits_for_idle_builder(policy: SchedulePolicy) {
    let mut farm = Farm::new(&[async_builder("lcy02-amd64-003")], policy);
    let builder_id = farm.builder_id("lcy02-amd64-003");
    farm.worker.script_builder("lcy02-amd64-003", BuilderState::Cleaning);
    let (_, queue_id) = farm.queue(&snap_request("hello-snap"));

    let report = farm.scan().await;
    assert!(report.cleaned.is_empty());
    assert!(report.dispatched.is_empty());
    assert_eq!(
        farm.store().builder(builder_id).unwrap().clean_status(),
        CleanStatus::Cleaning
    );

    farm.advance(Duration::seconds(15));
    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());

    farm.advance(Duration::seconds(15));
    let report = farm.scan().await;
    assert_eq!(report.cleaned, vec![builder_id]);
    assert_eq!(report.dispatched, vec![(queue_id, builder_id)]);

    assert_eq!(farm.worker.count(|c| matches!(c, Call::Reset { .. })), 1);
    assert_eq!(farm.worker.count(|c| matches!(c, Call::Status { .. })), 2);
}

#[rstest]
#[tokio::test]
pub async fn async_reset_times_out(policy: SchedulePolicy) {
    let mut farm = Farm::new(&[async_builder("lcy02-amd64-003")], policy);
    let builder_id = farm.builder_id("lcy02-amd64-003");
    for _ in 0..3 {
        farm.worker.script_builder("lcy02-amd64-003", BuilderState::Cleaning);
    }

    farm.scan().await;
    farm.advance(Duration::seconds(60));
    farm.scan().await;
    assert!(farm.store().builder(builder_id).unwrap().builder_ok());

    farm.advance(Duration::seconds(900));
    let report = farm.scan().await;
    assert_eq!(report.disabled, vec![builder_id]);
    let store = farm.store();
    let builder = store.builder(builder_id).unwrap();
    assert!(!builder.builder_ok());
    assert!(builder.fail_notes().unwrap().contains("cleaning"));
}

#[rstest]
#[tokio::test]
pub async fn reenabled_builder_is_reset_again(policy: SchedulePolicy) {
    let mut farm = Farm::new(&[async_builder("lcy02-amd64-003")], policy);
    let builder_id = farm.builder_id("lcy02-amd64-003");
    farm.worker.script_builder("lcy02-amd64-003", BuilderState::Cleaning);

    farm.scan().await;
    farm.advance(Duration::seconds(60));
    farm.scan().await;
    farm.advance(Duration::seconds(900));
    let report = farm.scan().await;
    assert_eq!(report.disabled, vec![builder_id]);

    admin::enable_builder(&mut farm.store(), builder_id, farm.now).unwrap();
    let (_, queue_id) = farm.queue(&snap_request("hello-snap"));

    farm.advance(Duration::seconds(1));
    let report = farm.scan().await;
    assert!(report.disabled.is_empty());
    assert!(report.dispatched.is_empty());
    {
        let store = farm.store();
        let builder = store.builder(builder_id).unwrap();
        assert!(builder.builder_ok());
        assert_eq!(builder.clean_status(), CleanStatus::Cleaning);
    }
    assert_eq!(farm.worker.count(|c| matches!(c, Call::Reset { .. })), 2);

    farm.advance(Duration::seconds(15));
    let report = farm.scan().await;
    assert_eq!(report.cleaned, vec![builder_id]);
    assert_eq!(report.dispatched, vec![(queue_id, builder_id)]);
}

#[rstest]
#[tokio::test]
pub async fn suspended_job_is_held_back(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    admin::suspend(&mut farm.store(), queue_id).unwrap();

    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());
    assert_eq!(farm.store().build(build_id).unwrap().status(), BuildStatus::NeedsBuild);

    admin::resume(&mut farm.store(), queue_id).unwrap();
    let report = farm.scan().await;
    assert_eq!(report.dispatched.len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn superseded_build_leaves_the_queue(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let (build_id, queue_id) = farm.queue(&package_request("hello"));
    {
        let mut store = farm.store();
        admin::supersede_build(&mut store, build_id, farm.now).unwrap();
        assert!(!store.contains_queue_entry(queue_id));
        assert_eq!(store.build(build_id).unwrap().status(), BuildStatus::Superseded);
    }

    let report = farm.scan().await;
    assert!(report.dispatched.is_empty());
}

#[rstest]
#[tokio::test]
pub async fn scheduling_state_survives_restart(mut single_builder_farm: Farm) {
    let farm = &mut single_builder_farm;
    let builder_id = farm.builder_id("lcy02-amd64-001");
    let (_, running) = farm.queue(&package_request("hello"));
    let (_, waiting) = farm.queue(&package_request("world"));
    farm.scan().await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    db::save_snapshot(&path, &farm.store()).unwrap();

    let store = db::load_snapshot(&path).unwrap().unwrap();
    store.check_invariants().unwrap();
    assert_eq!(store.queue_entry(running).unwrap().builder(), Some(builder_id));
    assert_eq!(store.builder(builder_id).unwrap().current_job(), Some(running));
    assert_eq!(
        store.queue_entry(waiting).unwrap().status(),
        BuildQueueStatus::Waiting
    );
}
