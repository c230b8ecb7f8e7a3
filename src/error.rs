//! Error types for all x1gc operations.
//!
//! Two error surfaces coexist:
//!
//! - [`GcError`]: returned by fallible constructors (`Arena::map`,
//!   `Collector::new`, config validation). These are the unrecoverable
//!   paths: if the kernel refuses an address-range reservation the
//!   component cannot exist at all.
//! - [`AllocError`]: a structured record captured inside an arena when an
//!   allocation-path operation fails. Allocation methods never return
//!   `Err`; they return a null pointer and the caller inspects
//!   `last_error()`.

use thiserror::Error;

/// Hard failure creating a component.
#[derive(Debug, Error)]
pub enum GcError {
    #[error("virtual memory reservation failed: requested {size} bytes")]
    ReserveFailed { size: usize },

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for fallible x1gc constructors.
pub type Result<T> = std::result::Result<T, GcError>;

/// Classification of allocation-path failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArenaErrorKind {
    /// Not an error.
    #[default]
    Ok,
    /// Requested allocation exceeds what remains of the reserved range.
    ReserveExhausted,
    /// The kernel refused to commit (mprotect failure).
    CommitFailed,
    /// Requested payload size does not fit in the header's size bits.
    HeaderSizeMask,
    /// `sub_alloc` with no preceding incomplete `super_alloc`.
    OrphanSubAlloc,
    /// Alloc info queried on an arena without allocation headers.
    AllocInfoDisabled,
    /// Alloc info queried for an address this arena does not own.
    AllocInfoAddress,
    /// Iteration requested on an arena without allocation headers.
    IteratorNotSupported,
    /// Cursor dereferenced while invalid or past the end.
    IteratorDeref,
    /// Cursor advanced while invalid or past the end.
    IteratorNext,
}

impl ArenaErrorKind {
    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ArenaErrorKind::Ok => "ok",
            ArenaErrorKind::ReserveExhausted => "reserved address range exhausted",
            ArenaErrorKind::CommitFailed => "commit (mprotect) failed",
            ArenaErrorKind::HeaderSizeMask => "allocation size exceeds header size bits",
            ArenaErrorKind::OrphanSubAlloc => "sub_alloc without preceding super_alloc",
            ArenaErrorKind::AllocInfoDisabled => "alloc info requires allocation headers",
            ArenaErrorKind::AllocInfoAddress => "address not owned by this arena",
            ArenaErrorKind::IteratorNotSupported => "iteration requires allocation headers",
            ArenaErrorKind::IteratorDeref => "cursor dereferenced while invalid or at end",
            ArenaErrorKind::IteratorNext => "cursor advanced while invalid or at end",
        }
    }
}

/// Details of the most recent allocation-path failure in an arena.
///
/// Each failure bumps the owning arena's error counter and overwrites
/// this record; `seq` carries the counter value at capture time so a
/// caller can tell two identical failures apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocError {
    /// Error classification.
    pub kind: ArenaErrorKind,
    /// Sequence number of this error within its arena (1-based).
    pub seq: u32,
    /// Request size associated with the error, when meaningful.
    pub request_z: usize,
    /// Committed arena memory at the time of the error.
    pub committed_z: usize,
    /// Reserved arena memory at the time of the error.
    pub reserved_z: usize,
}

impl AllocError {
    pub(crate) fn capture(
        kind: ArenaErrorKind,
        seq: u32,
        request_z: usize,
        committed_z: usize,
        reserved_z: usize,
    ) -> Self {
        Self { kind, seq, request_z, committed_z, reserved_z }
    }

    /// True when no error has been recorded.
    pub fn is_ok(&self) -> bool {
        self.kind == ArenaErrorKind::Ok
    }
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (seq {}, request {}, committed {}, reserved {})",
            self.kind.description(),
            self.seq,
            self.request_z,
            self.committed_z,
            self.reserved_z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ok() {
        let err = AllocError::default();
        assert!(err.is_ok());
        assert_eq!(err.seq, 0);
    }

    #[test]
    fn test_capture_round_trip() {
        let err = AllocError::capture(ArenaErrorKind::ReserveExhausted, 3, 1024, 4096, 8192);
        assert!(!err.is_ok());
        assert_eq!(err.kind, ArenaErrorKind::ReserveExhausted);
        assert_eq!(err.seq, 3);
        assert_eq!(err.request_z, 1024);
    }

    #[test]
    fn test_descriptions_nonempty() {
        let kinds = [
            ArenaErrorKind::Ok,
            ArenaErrorKind::ReserveExhausted,
            ArenaErrorKind::CommitFailed,
            ArenaErrorKind::HeaderSizeMask,
            ArenaErrorKind::OrphanSubAlloc,
            ArenaErrorKind::AllocInfoDisabled,
            ArenaErrorKind::AllocInfoAddress,
            ArenaErrorKind::IteratorNotSupported,
            ArenaErrorKind::IteratorDeref,
            ArenaErrorKind::IteratorNext,
        ];
        for k in kinds {
            assert!(!k.description().is_empty());
        }
    }
}
