//! Rename failure classification.
//!
//! Replacing a binary another process is executing fails differently on
//! every platform: Windows reports sharing violations or access-denied,
//! Unix reports `ETXTBSY` in the rare cases it reports anything. The
//! installer needs one portable answer to "was the target locked?", so
//! this module reduces a raw [`std::io::Error`] to a three-way verdict.
//!
//! Structured signals are inspected first (raw OS error codes, then the
//! error kind); message substrings are the last resort, kept only for
//! exotic filesystems that surface locking through neither.

/// Verdict on a failed rename onto an install target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameFailure {
    /// The target file is held by another process.
    Locked,
    /// The OS refused the operation outright.
    PermissionDenied,
    /// Anything else; not survivable by the upgrade path.
    Other,
}

#[cfg(windows)]
const LOCKED_OS_CODES: &[i32] = &[
    32, // ERROR_SHARING_VIOLATION
    33, // ERROR_LOCK_VIOLATION
];

#[cfg(not(windows))]
const LOCKED_OS_CODES: &[i32] = &[
    26, // ETXTBSY
];

const LOCKED_MESSAGE_MARKERS: &[&str] = &[
    "being used by another process",
    "access is denied",
    "cannot access the file",
    "locked",
    "in use",
];

/// Classifies the error a rename onto a possibly-running binary returned.
///
/// Inspection order: raw OS code, then [`std::io::ErrorKind`], then
/// case-insensitive message substrings. Callers decide what each verdict
/// means; notably the upgrade path treats [`RenameFailure::PermissionDenied`]
/// as locked-like when a valid binary remains in place, because Windows
/// reports locked executables through access-denied more often than through
/// sharing violations.
#[must_use]
pub fn classify_rename_error(error: &std::io::Error) -> RenameFailure {
    if let Some(code) = error.raw_os_error()
        && LOCKED_OS_CODES.contains(&code)
    {
        return RenameFailure::Locked;
    }

    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return RenameFailure::PermissionDenied;
    }

    let message = error.to_string().to_lowercase();
    if LOCKED_MESSAGE_MARKERS.iter().any(|marker| message.contains(marker)) {
        return RenameFailure::Locked;
    }

    RenameFailure::Other
}
