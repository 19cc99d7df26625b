//! Concurrent installers sharing one lock registry.
//!
//! Cloned installers share their registry, so every task here contends on
//! the same per-target lock. The properties under test: one download no
//! matter how many racers, and no corrupted or half-written state after
//! the dust settles.

use crate::common::{TOOL, exact_request, latest_request, payload, publish, test_options};
use armory::installer::{InstallOutcome, Installer, OutcomeKind};
use armory::test_utils::{InstallSandbox, MockArtifactSource};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Launch `count` installs of `request` that all start together, and
/// collect their outcomes.
async fn race_installs(
    installer: &Installer<MockArtifactSource>,
    request: &armory::installer::InstallRequest,
    count: usize,
) -> Vec<InstallOutcome> {
    let barrier = Arc::new(Barrier::new(count));
    let mut handles = Vec::with_capacity(count);
    for _ in 0..count {
        let installer = installer.clone();
        let request = request.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            installer.install(&request).await
        }));
    }

    let mut outcomes = Vec::with_capacity(count);
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }
    outcomes
}

fn count_kind(outcomes: &[InstallOutcome], kind: OutcomeKind) -> usize {
    outcomes.iter().filter(|outcome| outcome.kind == kind).count()
}

#[tokio::test]
async fn test_concurrent_installs_download_once() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let body = payload(0xC1);
    publish(&source, &request, &body);

    let installer = Installer::with_options(source.clone(), test_options());
    let outcomes = race_installs(&installer, &request, 8).await;

    assert_eq!(count_kind(&outcomes, OutcomeKind::Installed), 1);
    assert_eq!(count_kind(&outcomes, OutcomeKind::AlreadyCurrent), 7);
    assert_eq!(source.downloads(), 1);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), body);
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_concurrent_upgrade_applies_once() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    sandbox.plant_install(TOOL, "latest", &payload(0xC2)).await.unwrap();
    let newer = payload(0xC3);
    publish(&source, &request, &newer);

    let installer = Installer::with_options(source.clone(), test_options());
    let outcomes = race_installs(&installer, &request, 6).await;

    assert_eq!(count_kind(&outcomes, OutcomeKind::Upgraded), 1);
    assert_eq!(count_kind(&outcomes, OutcomeKind::AlreadyCurrent), 5);
    assert_eq!(source.downloads(), 1);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), newer);
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_distinct_versions_install_independently() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let older = exact_request(&sandbox, "2.7.0");
    let newer = exact_request(&sandbox, "2.8.0");
    publish(&source, &older, &payload(0xC4));
    publish(&source, &newer, &payload(0xC5));

    let installer = Installer::with_options(source.clone(), test_options());
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for request in [older, newer] {
        let installer = installer.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            installer.install(&request).await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Installed);
    }
    assert_eq!(source.downloads(), 2);
    assert_eq!(sandbox.read_binary(TOOL, "2.7.0").await.unwrap(), payload(0xC4));
    assert_eq!(sandbox.read_binary(TOOL, "2.8.0").await.unwrap(), payload(0xC5));
}
