//! Invariant hooks for immutable decomposition structures.
//!
//! Meshes and addressing tables validate themselves when constructed; these
//! hooks re-check them after deserialization, in tests, and in debug builds.

use crate::mesh_error::MeshError;

/// Run a fallible structural check and panic with its context on error.
///
/// The context is a format string with arguments, typically naming the
/// processor whose piece broke. Compiles to nothing in release builds unless
/// `check-invariants` or `strict-invariants` is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $($context:tt)+) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(err) = $check {
            panic!("broken decomposition invariant in {}: {err}", format_args!($($context)+));
        }
    };
}

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshError>;

    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        debug_invariants!(self.validate_invariants(), "{}", std::any::type_name::<Self>());
    }
}
