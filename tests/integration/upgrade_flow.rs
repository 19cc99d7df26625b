//! Upgrade behavior: in-place replacement, locked-target fallbacks, and
//! what survives a failed attempt.

use crate::common::{TOOL, latest_request, payload, publish, test_options};
use armory::core::ArmoryError;
use armory::digest;
use armory::installer::{Installer, LockedTargetSimulation, OutcomeKind};
use armory::test_utils::{InstallSandbox, MockArtifactSource};

#[tokio::test]
async fn test_upgrade_replaces_binary_and_sidecar() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    sandbox.plant_install(TOOL, "latest", &payload(0xB1)).await.unwrap();
    let newer = payload(0xB2);
    publish(&source, &request, &newer);

    let installer = Installer::with_options(source.clone(), test_options());
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Upgraded);
    assert!(outcome.changed());
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), newer);
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some(digest::hash_bytes(&newer)));
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
    assert_eq!(source.downloads(), 1);

    // The upgraded state is itself current: installing again is a skip.
    let repeat = installer.install(&request).await.unwrap();
    assert_eq!(repeat.kind, OutcomeKind::AlreadyCurrent);
    assert_eq!(source.downloads(), 1);
}

#[tokio::test]
async fn test_locked_target_keeps_existing_install() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let old = payload(0xB3);
    sandbox.plant_install(TOOL, "latest", &old).await.unwrap();
    publish(&source, &request, &payload(0xB4));

    let options =
        test_options().with_locked_target_simulation(LockedTargetSimulation::always());
    let installer = Installer::with_options(source.clone(), options);
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::SkippedKept);
    assert!(!outcome.changed());
    // The download happened, but the held binary and its digest record
    // must be exactly as they were.
    assert_eq!(source.downloads(), 1);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), old);
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some(digest::hash_bytes(&old)));
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_skipped_upgrade_succeeds_on_later_invocation() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    sandbox.plant_install(TOOL, "latest", &payload(0xB5)).await.unwrap();
    let newer = payload(0xB6);
    publish(&source, &request, &newer);

    let options =
        test_options().with_locked_target_simulation(LockedTargetSimulation::failing(1));
    let installer = Installer::with_options(source.clone(), options);

    let first = installer.install(&request).await.unwrap();
    assert_eq!(first.kind, OutcomeKind::SkippedKept);

    // The lock has cleared; the stale sidecar triggers a fresh attempt.
    let second = installer.install(&request).await.unwrap();
    assert_eq!(second.kind, OutcomeKind::Upgraded);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), newer);
    assert_eq!(source.downloads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_locked_without_usable_fallback_is_an_error() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish(&source, &request, &payload(0xB7));

    let options =
        test_options().with_locked_target_simulation(LockedTargetSimulation::always());
    let installer = Installer::with_options(source, options);
    let err = installer.install(&request).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ArmoryError>(),
        Some(ArmoryError::LockedTarget { .. })
    ));
    assert!(!sandbox.binary_path(TOOL, "latest").exists());
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_failed_upgrade_download_leaves_prior_install() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let old = payload(0xB8);
    sandbox.plant_install(TOOL, "latest", &old).await.unwrap();
    let newer = payload(0xB9);
    publish(&source, &request, &newer);
    source.fail_downloads(1);

    let installer = Installer::with_options(source.clone(), test_options());
    let err = installer.install(&request).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ArmoryError>(),
        Some(ArmoryError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), old);
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some(digest::hash_bytes(&old)));
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());

    let recovered = installer.install(&request).await.unwrap();
    assert_eq!(recovered.kind, OutcomeKind::Upgraded);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), newer);
}
