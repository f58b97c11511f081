//! Cache-blocked level-3 linear-algebra engine.
//!
//! The engine executes matrix-matrix products and their triangular, symmetric, and Hermitian
//! variants through a single pipeline: a dispatch front-end normalizes the operands and builds
//! a per-call control tree; a thread decorator fans workers out over the tree; the internal
//! driver partitions the problem across the five blocked loops (JC, KC, IC, JR, IR); packing
//! stages reshape operand blocks into micro-panel layouts (applying scalars, conjugation,
//! structure reflection, explicit zeroing, and datatype conversion on the fly); and the
//! macro-kernels at the leaves invoke the micro-kernels registered in the context.
//!
//! Operation entry points exist in two forms: methods on an [`Engine`] (with optional explicit
//! context and runtime arguments), and free functions running on the lazily-initialized
//! process-wide default engine.

mod broker;
mod check;
mod cntl;
mod dispatch;
mod driver;
mod elemwise;
mod engine;
mod macrokernel;
mod md;
mod packm;
mod sup;
mod thread;

// RE-EXPORTS
// ================================================================================================

pub use dispatch::{
    gemm::gemm,
    gemmt::gemmt,
    hemm::{hemm, symm},
    rank::{her2k, herk, syr2k, syrk},
    trmm::{trmm, trmm3},
    trsm::trsm,
};
pub use engine::{Engine, EngineConfig};
pub use lamina_core::{
    C32, C64, Context, DType, DiagKind, Error, IndMethod, Matrix, Obj, Rntm, ScalarVal, Side,
    Struc, Uplo, Ways,
};
pub use sup::SupThresholds;
