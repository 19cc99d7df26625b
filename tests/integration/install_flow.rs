//! Fresh-install behavior: digest skipping, download validation, and the
//! state left on disk after success and failure.

use crate::common::{
    TEST_MIN_SIZE, TOOL, exact_request, latest_request, payload, publish, publish_with_digest,
    test_options,
};
use armory::core::ArmoryError;
use armory::digest;
use armory::installer::{Installer, OutcomeKind};
use armory::test_utils::{InstallSandbox, MockArtifactSource};

#[tokio::test]
async fn test_fresh_install_writes_binary_and_sidecar() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let body = payload(0xA1);
    publish(&source, &request, &body);

    let installer = Installer::with_options(source.clone(), test_options());
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Installed);
    assert!(outcome.changed());
    assert_eq!(outcome.dir, sandbox.install_dir(TOOL, "latest"));
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), body);
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some(digest::hash_bytes(&body)));
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
    assert_eq!(source.downloads(), 1);
    assert_eq!(source.metadata_fetches(), 1);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(sandbox.binary_path(TOOL, "latest"))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0, "binary should be executable, mode {mode:o}");
    }
}

#[tokio::test]
async fn test_repeat_install_skips_download() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish(&source, &request, &payload(0xA2));

    let installer = Installer::with_options(source.clone(), test_options());
    installer.install(&request).await.unwrap();
    let binary = sandbox.binary_path(TOOL, "latest");
    let mtime = std::fs::metadata(&binary).unwrap().modified().unwrap();

    let second = installer.install(&request).await.unwrap();

    assert_eq!(second.kind, OutcomeKind::AlreadyCurrent);
    assert!(!second.changed());
    // The second invocation proved freshness with metadata alone and never
    // touched the installed file.
    assert_eq!(std::fs::metadata(&binary).unwrap().modified().unwrap(), mtime);
    assert_eq!(source.downloads(), 1);
    assert_eq!(source.metadata_fetches(), 2);
}

#[tokio::test]
async fn test_missing_sidecar_forces_redownload() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish(&source, &request, &payload(0xA3));

    let installer = Installer::with_options(source.clone(), test_options());
    installer.install(&request).await.unwrap();
    tokio::fs::remove_file(digest::sidecar_path(&sandbox.install_dir(TOOL, "latest")))
        .await
        .unwrap();

    let second = installer.install(&request).await.unwrap();

    assert_eq!(second.kind, OutcomeKind::Upgraded);
    assert_eq!(source.downloads(), 2);
}

#[tokio::test]
async fn test_empty_server_digest_always_downloads() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish_with_digest(&source, &request, &payload(0xA4), "");

    let installer = Installer::with_options(source.clone(), test_options());
    let first = installer.install(&request).await.unwrap();
    let second = installer.install(&request).await.unwrap();

    assert_eq!(first.kind, OutcomeKind::Installed);
    assert_eq!(second.kind, OutcomeKind::Upgraded);
    assert_eq!(source.downloads(), 2);
    // Nothing to record without a server digest.
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, None);
}

#[tokio::test]
async fn test_digest_mismatch_rejects_download() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish_with_digest(&source, &request, &payload(0xA5), &digest::hash_bytes(b"other bytes"));

    let installer = Installer::with_options(source, test_options());
    let err = installer.install(&request).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ArmoryError>(),
        Some(ArmoryError::DownloadIntegrity { .. })
    ));
    assert!(!sandbox.binary_path(TOOL, "latest").exists());
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, None);
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_aborted_download_keeps_prior_install() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let old = payload(0xA6);
    sandbox.plant_install(TOOL, "latest", &old).await.unwrap();
    publish(&source, &request, &payload(0xA7));
    source.abort_download_after(100);

    let installer = Installer::with_options(source, test_options());
    let err = installer.install(&request).await.unwrap_err();

    assert!(format!("{err:#}").contains("connection reset"), "unexpected error: {err:#}");
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), old);
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some(digest::hash_bytes(&old)));
    assert!(sandbox.temp_litter(TOOL, "latest").is_empty());
}

#[tokio::test]
async fn test_metadata_failure_surfaces_and_recovers() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    publish(&source, &request, &payload(0xA8));
    source.fail_metadata(1);

    let installer = Installer::with_options(source.clone(), test_options());
    let err = installer.install(&request).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ArmoryError>(),
        Some(ArmoryError::HttpStatus { status: 503, .. })
    ));
    assert!(!sandbox.base_dir.join(TOOL).exists(), "failed probe should not create directories");

    let outcome = installer.install(&request).await.unwrap();
    assert_eq!(outcome.kind, OutcomeKind::Installed);
}

#[tokio::test]
async fn test_exact_version_installs_into_version_directory() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = exact_request(&sandbox, "2.7.0");
    let body = payload(0xA9);
    publish(&source, &request, &body);

    let installer = Installer::with_options(source, test_options());
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.dir, sandbox.install_dir(TOOL, "2.7.0"));
    assert_eq!(sandbox.read_binary(TOOL, "2.7.0").await.unwrap(), body);
}

#[tokio::test]
async fn test_undersized_existing_binary_is_replaced() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    // Exactly the floor: too small to trust, but its sidecar matches what
    // the server advertises.
    let small = vec![0x55u8; TEST_MIN_SIZE as usize];
    sandbox.plant_install(TOOL, "latest", &small).await.unwrap();
    publish(&source, &request, &small);

    let installer = Installer::with_options(source.clone(), test_options());
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Installed);
    assert_eq!(source.downloads(), 1, "matching sidecar must not excuse an unusable binary");
}

#[tokio::test]
async fn test_verification_disabled_tolerates_digest_mismatch() {
    let sandbox = InstallSandbox::new().unwrap();
    let source = MockArtifactSource::new();
    let request = latest_request(&sandbox);
    let body = payload(0xAA);
    publish_with_digest(&source, &request, &body, "badc0ffee");

    let installer = Installer::with_options(source, test_options().with_verify(false));
    let outcome = installer.install(&request).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Installed);
    assert_eq!(sandbox.read_binary(TOOL, "latest").await.unwrap(), body);
    // The sidecar records the server's claim, verified or not.
    assert_eq!(sandbox.recorded_digest(TOOL, "latest").await, Some("badc0ffee".to_string()));
}
