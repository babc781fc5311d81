//! Runtime client listing and status queries against the in-memory runtime.

mod common;

use tonic::Code;

use common::{lifecycle, FakeRuntime, DEMO_POD, DEMO_RESOURCES};
use vkcri::{RuntimeClient, StaticResources};
use vkcri_core::PodDeclaration;

#[tokio::test]
async fn test_list_containers_for_sandbox_is_exact_subset() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let lc = lifecycle(
        runtime.clone(),
        dir.path(),
        StaticResources::from_yaml(DEMO_RESOURCES).unwrap(),
    );

    let first = PodDeclaration::from_yaml(DEMO_POD).unwrap();
    let mut second = first.clone();
    second.metadata.name = "other".to_string();
    second.metadata.uid = "7a2b".to_string();

    let a = lc.run_pod(&first, 0).await.unwrap();
    let b = lc.run_pod(&second, 0).await.unwrap();

    let listed = lc
        .client()
        .list_containers_for_sandbox(&a.sandbox_id)
        .await
        .unwrap();
    let mut ids: Vec<String> = listed.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    let mut expected: Vec<String> = a.containers.iter().map(|(_, id)| id.clone()).collect();
    expected.sort();
    assert_eq!(ids, expected);
    assert!(listed.iter().all(|c| c.pod_sandbox_id == a.sandbox_id));

    let all = lc.client().list_containers_for_sandbox("").await.unwrap();
    assert_eq!(all.len(), a.containers.len() + b.containers.len());
}

#[tokio::test]
async fn test_list_pod_sandboxes() {
    let runtime = FakeRuntime::new();
    let client = RuntimeClient::new(runtime.clone());
    assert!(client.list_pod_sandboxes().await.unwrap().is_empty());

    let id = client
        .create_pod_sandbox(Default::default())
        .await
        .unwrap();
    let listed = client.list_pod_sandboxes().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
}

#[tokio::test]
async fn test_status_of_unknown_ids_keeps_code() {
    let client = RuntimeClient::new(FakeRuntime::new());

    let err = client.pod_sandbox_status("nope").await.unwrap_err();
    assert_eq!(err.status().unwrap().code(), Code::NotFound);

    let err = client.container_status("nope").await.unwrap_err();
    assert_eq!(err.status().unwrap().code(), Code::NotFound);

    let err = client.start_container("nope").await.unwrap_err();
    assert_eq!(err.status().unwrap().code(), Code::NotFound);
}

#[tokio::test]
async fn test_create_container_in_missing_sandbox() {
    let client = RuntimeClient::new(FakeRuntime::new());
    let err = client
        .create_container(Default::default(), Default::default(), "sb-gone")
        .await
        .unwrap_err();
    assert_eq!(err.status().unwrap().code(), Code::NotFound);
}

#[tokio::test]
async fn test_version() {
    let client = RuntimeClient::new(FakeRuntime::new());
    let version = client.version().await.unwrap();
    assert_eq!(version.runtime_name, "fake-runtime");
    assert_eq!(version.runtime_api_version, "v1");
}
