//! Structural self-checks for the union-find forests.

use crate::track_error::TrackError;

/// Implemented by structures whose parent links must stay well formed
/// (every chain ends in a root, no link points at an unknown id).
pub trait DebugInvariants {
    /// Panics on a broken invariant in debug builds or with `strict-invariants`.
    fn debug_assert_invariants(&self);
    /// First violation found, as [`TrackError::InvariantViolation`].
    fn validate_invariants(&self) -> Result<(), TrackError>;
}

/// Run a fallible check and panic with context when invariant checking is on.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
