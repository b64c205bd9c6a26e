mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use ccv3::models::{Build, BuildState, Droplet, DropletState, Relationship};
use ccv3::ClientError;
use cfactor::ActorError;
use common::{actor, transport_error, FakeCloudController, FakeConfig};

fn build(state: BuildState) -> Build {
    Build {
        guid: "some-build-guid".to_string(),
        state,
        created_at: "some-time".to_string(),
        droplet: Some(Relationship {
            guid: "some-droplet-guid".to_string(),
        }),
        ..Default::default()
    }
}

fn droplet() -> Droplet {
    Droplet {
        guid: "some-droplet-guid".to_string(),
        state: DropletState::Staged,
        created_at: "some-time".to_string(),
    }
}

#[tokio::test]
async fn test_poll_build_returns_droplet_once_staged() {
    let client = Arc::new(FakeCloudController::default());
    client
        .get_build
        .returns(build(BuildState::Staging), &["get-build-warning-1"])
        .returns(build(BuildState::Staged), &["get-build-warning-2"]);
    client.droplet.returns(droplet(), &["get-droplet-warning"]);

    let actor = actor(&client, FakeConfig::default());
    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;

    assert_eq!(result.unwrap(), droplet());
    assert_eq!(
        &*warnings,
        &["get-build-warning-1", "get-build-warning-2", "get-droplet-warning"]
    );
    assert_eq!(client.get_build.calls(), vec!["some-build-guid", "some-build-guid"]);
    assert_eq!(client.droplet.calls(), vec!["some-droplet-guid"]);
}

#[tokio::test]
async fn test_poll_build_stops_on_failure() {
    let client = Arc::new(FakeCloudController::default());
    let mut failed = build(BuildState::Failed);
    failed.error = Some("some staging error".to_string());
    client.get_build.returns(failed, &["get-build-warning"]);

    let actor = actor(&client, FakeConfig::default());
    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;

    match result {
        Err(ActorError::StagingFailed(detail)) => assert_eq!(detail, "some staging error"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(&*warnings, &["get-build-warning"]);
    assert_eq!(client.get_build.call_count(), 1);
    assert_eq!(client.droplet.call_count(), 0);
}

#[tokio::test]
async fn test_poll_build_propagates_client_errors() {
    let client = Arc::new(FakeCloudController::default());
    client
        .get_build
        .returns(build(BuildState::Staging), &["w1"])
        .fails(transport_error("I am a tomato"), &["w2"]);

    let actor = actor(&client, FakeConfig::default());
    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;

    match result {
        Err(ActorError::Client(ClientError::InvalidResponse(detail))) => assert_eq!(detail, "I am a tomato"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(&*warnings, &["w1", "w2"]);
}

#[tokio::test]
async fn test_poll_build_propagates_droplet_errors() {
    let client = Arc::new(FakeCloudController::default());
    client.get_build.returns(build(BuildState::Staged), &[]);
    client
        .droplet
        .fails(ClientError::ResourceNotFound("Droplet not found".to_string()), &["get-droplet-warning"]);

    let actor = actor(&client, FakeConfig::default());
    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;

    assert!(matches!(result, Err(ActorError::Client(ClientError::ResourceNotFound(_)))));
    assert_eq!(&*warnings, &["get-droplet-warning"]);
}

#[tokio::test]
async fn test_poll_build_times_out() {
    let client = Arc::new(FakeCloudController::default());
    client.get_build.always(|| (Ok(build(BuildState::Staging)), vec!["still-staging"].into()));

    let config = FakeConfig {
        staging_timeout: Duration::from_millis(50),
        polling_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let actor = actor(&client, config);

    let started = Instant::now();
    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;
    let elapsed = started.elapsed();

    match result {
        Err(ActorError::StagingTimeout { app_name, timeout }) => {
            assert_eq!(app_name, "some-app");
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);

    let polls = client.get_build.call_count();
    assert!(polls >= 1);
    assert_eq!(warnings.len(), polls);
}

#[tokio::test]
async fn test_poll_build_deadline_interrupts_the_interval() {
    let client = Arc::new(FakeCloudController::default());
    client.get_build.always(|| (Ok(build(BuildState::Staging)), Default::default()));

    let config = FakeConfig {
        staging_timeout: Duration::from_millis(50),
        polling_interval: Duration::from_secs(60),
        ..Default::default()
    };
    let actor = actor(&client, config);

    let started = Instant::now();
    let (result, _) = actor.poll_build("some-build-guid", "some-app").await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(ActorError::StagingTimeout { .. })));
    assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);
    assert_eq!(client.get_build.call_count(), 1);
}

#[tokio::test]
async fn test_poll_build_with_zero_timeout_never_polls() {
    let client = Arc::new(FakeCloudController::default());
    let config = FakeConfig {
        staging_timeout: Duration::ZERO,
        ..Default::default()
    };
    let actor = actor(&client, config);

    let (result, warnings) = actor.poll_build("some-build-guid", "some-app").await;

    assert!(matches!(result, Err(ActorError::StagingTimeout { .. })));
    assert!(warnings.is_empty());
    assert_eq!(client.get_build.call_count(), 0);
}

#[tokio::test]
async fn test_stage_application_package() {
    let client = Arc::new(FakeCloudController::default());
    client.create_build.returns(build(BuildState::Staging), &["create-build-warning"]);

    let actor = actor(&client, FakeConfig::default());
    let (result, warnings) = actor.stage_application_package("some-package-guid").await;

    assert_eq!(result.unwrap().guid, "some-build-guid");
    assert_eq!(&*warnings, &["create-build-warning"]);
    assert_eq!(client.create_build.calls(), vec!["some-package-guid"]);
    assert_eq!(client.get_build.call_count(), 0);
}
