use alloc::string::String;

use crate::types::DType;

// ERRORS
// ================================================================================================

/// Errors surfaced by the level-3 operation entry points.
///
/// Failures are reported before any work is dispatched; user matrices are unmodified on error,
/// except where the specification defines a partial effect (scaling `C` by beta before a
/// zero-dimension short-circuit). The in-band decline signals of the small path and the
/// induced-method selector are not errors and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A dimension, structure, or enum argument violates the operation's preconditions.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operand datatype combination is not executable by any registered kernel path.
    #[error("unsupported datatype combination: a={a:?}, b={b:?}, c={c:?}")]
    UnsupportedDatatypeCombination { a: DType, b: DType, c: DType },

    /// A structured operand's diagonal would cross the interior of a micro-panel. This means
    /// the cache-to-register blocksize multiplicity invariant was violated.
    #[error("not yet implemented: diagonal intersects a micro-panel interior")]
    NotYetImplemented,

    /// The packing arena could not satisfy a block request.
    #[error("packing memory pool exhausted")]
    ResourceExhausted,
}
