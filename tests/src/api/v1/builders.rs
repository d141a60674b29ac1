use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use buildfarm_common::api::AdminApi;
use buildfarm_common::{CleanStatus, ResetProtocol};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn configured_builders_are_listed(isolated_server: IsolatedServer) {
    let builders = isolated_server.client.list_builders().await.unwrap();

    let names = builders.iter().map(|b| b.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["lcy02-amd64-001", "bos01-amd64-002"]);
    for builder in &builders {
        assert!(builder.builder_ok);
        assert_eq!(builder.clean_status, CleanStatus::Dirty);
        assert_eq!(builder.reset_protocol, ResetProtocol::Proto1_1);
        assert_eq!(builder.current_job, None);
    }
    assert!(builders[0].virtualized);
    assert!(!builders[1].virtualized);
}

#[rstest]
#[tokio::test]
pub async fn unknown_builder_is_not_found(isolated_server: IsolatedServer) {
    let client = isolated_server.client;
    let err = client.get_builder(42).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
    let err = client.reset_builder(42).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
    let err = client.enable_builder(42).await.unwrap_err();
    assert_eq!(http_status(&err), Some(404));
}

#[rstest]
#[tokio::test]
pub async fn disable_and_enable_builder(isolated_server: IsolatedServer) {
    let client = isolated_server.client;
    let id = client.list_builders().await.unwrap()[0].id;

    client
        .disable_builder(id, "kernel panic on boot".to_string())
        .await
        .unwrap();
    let builder = client.get_builder(id).await.unwrap();
    assert!(!builder.builder_ok);
    assert_eq!(builder.fail_notes.as_deref(), Some("kernel panic on boot"));

    client.enable_builder(id).await.unwrap();
    let builder = client.get_builder(id).await.unwrap();
    assert!(builder.builder_ok);
    assert_eq!(builder.fail_notes, None);
}

#[rstest]
#[tokio::test]
pub async fn builder_changes_require_cookie(isolated_server: IsolatedServer) {
    let client = make_client(&isolated_server.endpoint, None);
    let id = client.list_builders().await.unwrap()[0].id;

    assert!(client.reset_builder(id).await.is_err());
    assert!(client.disable_builder(id, "nope".to_string()).await.is_err());

    let wrong = make_client(&isolated_server.endpoint, Some("not-the-cookie"));
    assert!(wrong.disable_builder(id, "nope".to_string()).await.is_err());

    let builder = isolated_server.client.get_builder(id).await.unwrap();
    assert!(builder.builder_ok);
}
