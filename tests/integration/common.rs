//! Common helpers for armory integration tests.
//!
//! The heavy lifting lives in `armory::test_utils`; this module adds the
//! glue that nearly every test repeats: building requests against a
//! sandbox, publishing artifacts for them, and a payload generator.

// Not every helper is used by every test module in this suite.
#![allow(dead_code)]

use armory::installer::{InstallOptions, InstallRequest};
use armory::platform::Platform;
use armory::test_utils::{InstallSandbox, MockArtifactSource};
use armory::version::VersionSpec;

pub const TOOL: &str = "kite";

/// Small floor so tests can work with kilobyte payloads.
pub const TEST_MIN_SIZE: u64 = 64;

/// Deterministic fake binary payload. Different seeds give different
/// bytes, hence different digests.
pub fn payload(seed: u8) -> Vec<u8> {
    vec![seed; 4096]
}

/// Default options for tests: verification on, tiny size floor.
pub fn test_options() -> InstallOptions {
    InstallOptions::default().with_min_size(TEST_MIN_SIZE)
}

pub fn latest_request(sandbox: &InstallSandbox) -> InstallRequest {
    InstallRequest::new(TOOL, VersionSpec::Latest, &sandbox.base_dir)
}

pub fn exact_request(sandbox: &InstallSandbox, version: &str) -> InstallRequest {
    InstallRequest::new(TOOL, VersionSpec::parse(version).unwrap(), &sandbox.base_dir)
}

/// Publish `body` at the exact coordinates `request` will fetch from.
pub fn publish(source: &MockArtifactSource, request: &InstallRequest, body: &[u8]) {
    source.publish(&request.location(Platform::current()), body.to_vec());
}

/// Publish with a server-advertised digest that may disagree with the body.
pub fn publish_with_digest(
    source: &MockArtifactSource,
    request: &InstallRequest,
    body: &[u8],
    digest: &str,
) {
    source.publish_with_digest(&request.location(Platform::current()), body.to_vec(), digest);
}
