#![no_std]

#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod blocksz;
mod context;
mod errors;
mod kernel;
mod obj;
mod runtime;
mod types;

// RE-EXPORTS
// ================================================================================================

pub use blocksz::{BlkszTable, Blksz, BszId, adjust_kc};
pub use context::{Context, IndMethod};
pub use errors::Error;
pub use kernel::{
    GemmTrsmUkr, GemmUkr, KernelDt, KernelSet, KernelTables, PackCxcDiag, PackCxk, PackDt,
    PackKernelSet, PackTables,
};
pub use obj::{Matrix, Obj};
pub use runtime::{OpFamily, Rntm, Ways};
pub use types::{
    C32, C64, CastFrom, DType, DiagKind, Dir, Domain, PackSchema, Precision, Scalar, ScalarVal,
    Side, Struc, Uplo,
};

// DATATYPE DISPATCH
// ================================================================================================

/// Expands `$body` once per element datatype, with `$T` bound to the concrete scalar type that
/// corresponds to the runtime tag `$dt`.
///
/// This is the runtime-to-compile-time bridge that replaces per-datatype function-pointer
/// arrays: every caller supplies one generic body and the macro selects the instantiation.
#[macro_export]
macro_rules! dispatch_dt {
    ($dt:expr, $T:ident => $body:expr) => {
        match $dt {
            $crate::DType::F32 => {
                type $T = f32;
                $body
            },
            $crate::DType::F64 => {
                type $T = f64;
                $body
            },
            $crate::DType::C32 => {
                type $T = $crate::C32;
                $body
            },
            $crate::DType::C64 => {
                type $T = $crate::C64;
                $body
            },
        }
    };
}

/// Two-level datatype dispatch over an ordered `(source, target)` pair.
#[macro_export]
macro_rules! dispatch_dt2 {
    ($dt_src:expr, $dt_dst:expr, $S:ident, $P:ident => $body:expr) => {
        $crate::dispatch_dt!($dt_src, $S => $crate::dispatch_dt!($dt_dst, $P => $body))
    };
}
