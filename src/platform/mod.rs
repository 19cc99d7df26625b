//! Platform detection and artifact naming.
//!
//! Artifact servers lay out tool binaries by operating system and CPU
//! architecture, using descriptors like `linux-amd64` or `mac-arm64` as path
//! segments. This module detects the build target and produces those
//! descriptors, and handles the one binary-naming difference that matters:
//! Windows executables carry an `.exe` suffix.
//!
//! # Examples
//!
//! ```rust
//! use armory::platform::Platform;
//!
//! let platform = Platform::current();
//! println!("artifact segment: {}", platform.descriptor());
//! println!("binary name: {}", platform.binary_file_name("deploy-cli"));
//! ```

use std::fmt;

/// Checks if the current platform is Windows.
///
/// This is a compile-time check. It is used for behavior that depends on the
/// host rather than on a [`Platform`] value, such as executable-bit handling.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Operating system component of an artifact descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux distributions
    Linux,
    /// macOS (published under the historical `mac` key)
    Mac,
    /// Windows
    Windows,
}

impl Os {
    /// The descriptor segment for this operating system.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture component of an artifact descriptor.
///
/// The variants mirror the architectures artifact servers actually publish
/// binaries for. `386` is the historical name for 32-bit x86.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86
    Amd64,
    /// 64-bit ARM
    Arm64,
    /// 32-bit x86
    X86,
    /// IBM Z
    S390x,
    /// 64-bit PowerPC, big-endian
    Ppc64,
    /// 64-bit PowerPC, little-endian
    Ppc64le,
}

impl Arch {
    /// The descriptor segment for this architecture.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::X86 => "386",
            Self::S390x => "s390x",
            Self::Ppc64 => "ppc64",
            Self::Ppc64le => "ppc64le",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operating system and architecture a binary is built for.
///
/// [`Platform::current`] detects the build target; explicit construction is
/// useful in tests and for cross-installs into shared network directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl Platform {
    /// Detect the platform this build targets.
    #[must_use]
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Mac
        } else {
            Os::Linux
        };

        let arch = if cfg!(target_arch = "x86_64") {
            Arch::Amd64
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "s390x") {
            Arch::S390x
        } else if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
            Arch::Ppc64le
        } else if cfg!(target_arch = "powerpc64") {
            Arch::Ppc64
        } else {
            // Servers publish no binaries for anything else; amd64 is the
            // least surprising segment to request.
            Arch::Amd64
        };

        Self { os, arch }
    }

    /// The `{os}-{arch}` path segment used in artifact URLs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armory::platform::{Arch, Os, Platform};
    ///
    /// let platform = Platform { os: Os::Linux, arch: Arch::Arm64 };
    /// assert_eq!(platform.descriptor(), "linux-arm64");
    /// ```
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// The file name a binary carries on this platform.
    ///
    /// Appends `.exe` on Windows and returns the base name unchanged
    /// everywhere else.
    #[must_use]
    pub fn binary_file_name(&self, base: &str) -> String {
        match self.os {
            Os::Windows => format!("{base}.exe"),
            _ => base.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
