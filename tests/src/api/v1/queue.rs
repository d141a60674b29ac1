use crate::data::*;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use buildfarm_common::api::AdminApi;
use buildfarm_common::BuildQueueStatus;
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn queue_is_sorted_by_score(isolated_server: IsolatedServer) {
    let client = isolated_server.client;
    let first = client
        .request_build(&package_request("hello"))
        .await
        .unwrap();
    let second = client
        .request_build(&package_request("world"))
        .await
        .unwrap();

    // equal scores keep the order they were queued in
    let queue = client.list_queue().await.unwrap();
    let ids = queue.iter().map(|q| q.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![first.queue_id, second.queue_id]);

    client
        .set_manual_score(second.queue_id, 10_000)
        .await
        .unwrap();
    let queue = client.list_queue().await.unwrap();
    assert_eq!(queue[0].id, second.queue_id);
    assert_eq!(queue[0].last_score, 10_000);
    assert!(queue[0].manual);
}

#[rstest]
#[tokio::test]
pub async fn suspend_and_resume(isolated_server: IsolatedServer) {
    let client = isolated_server.client;
    let queued = client
        .request_build(&package_request("hello"))
        .await
        .unwrap();

    client.suspend_queue_entry(queued.queue_id).await.unwrap();
    let queue = client.list_queue().await.unwrap();
    assert_eq!(queue[0].status, BuildQueueStatus::Suspended);
    client.suspend_queue_entry(queued.queue_id).await.unwrap();

    client.resume_queue_entry(queued.queue_id).await.unwrap();
    let queue = client.list_queue().await.unwrap();
    assert_eq!(queue[0].status, BuildQueueStatus::Waiting);
}

#[rstest]
#[tokio::test]
pub async fn unknown_queue_entry(isolated_server: IsolatedServer) {
    let client = isolated_server.client;
    let err = client.set_manual_score(42, 100).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
    let err = client.suspend_queue_entry(42).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
    let err = client.resume_queue_entry(42).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
}

#[rstest]
#[tokio::test]
pub async fn score_requires_cookie(isolated_server: IsolatedServer) {
    let queued = isolated_server
        .client
        .request_build(&package_request("hello"))
        .await
        .unwrap();

    let client = make_client(&isolated_server.endpoint, None);
    assert!(client.set_manual_score(queued.queue_id, 1).await.is_err());
    let queue = client.list_queue().await.unwrap();
    assert!(!queue[0].manual);
}
