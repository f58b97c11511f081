//! Reference kernel library for the Lamina engine.
//!
//! The engine proper never hard-codes a kernel: it reaches every micro-kernel and packing
//! sub-kernel through the typed tables in a [`Context`]. This crate supplies portable reference
//! implementations for all four datatypes and the sixteen packing pairs, plus the default
//! blocksize tables, and assembles them into the contexts the engine falls back to when the
//! caller supplies none. A tuned kernel library swaps its own function pointers into the same
//! tables.

mod gemm;
mod pack;
mod trsm;

pub use gemm::gemm_ukr_ref;
pub use pack::{pack_cxc_diag_1m_ref, pack_cxc_diag_ref, pack_cxk_1m_ref, pack_cxk_ref};
pub use trsm::{gemmtrsm_l_ukr_ref, gemmtrsm_u_ukr_ref};

use lamina_core::{
    BlkszTable, Blksz, C32, C64, CastFrom, Context, IndMethod, KernelSet, KernelTables,
    PackKernelSet, PackTables, Scalar,
};

// DEFAULT BLOCKSIZES
// ================================================================================================

/// Blocksize table for the reference kernels. The values are deliberately modest: the
/// reference micro-kernels are scalar loops, so the cache blocksizes only need to exercise the
/// blocking machinery, not saturate a particular cache hierarchy.
pub fn default_blocksizes() -> BlkszTable {
    let row = [
        Blksz::square(4),    // MR
        Blksz::square(4),    // NR
        Blksz::new(64, 96),  // MC
        Blksz::new(128, 160), // KC
        Blksz::new(256, 320), // NC
    ];
    BlkszTable::new([row, row, row, row])
}

// TABLE CONSTRUCTION
// ================================================================================================

fn kernel_set<T: Scalar>() -> KernelSet<T> {
    KernelSet {
        gemm: gemm_ukr_ref::<T>,
        gemmtrsm_l: gemmtrsm_l_ukr_ref::<T>,
        gemmtrsm_u: gemmtrsm_u_ukr_ref::<T>,
        prefers_rows: false,
    }
}

fn pack_set<S: Scalar, P: Scalar + CastFrom<S>>() -> PackKernelSet<S, P> {
    PackKernelSet {
        cxk: pack_cxk_ref::<S, P>,
        cxc_diag: pack_cxc_diag_ref::<S, P>,
        // The 1m layouts only exist for complex targets; real pairs keep the native entry so
        // the table has no holes.
        cxk_1m: if P::IS_COMPLEX { pack_cxk_1m_ref::<S, P> } else { pack_cxk_ref::<S, P> },
        cxc_diag_1m: if P::IS_COMPLEX {
            pack_cxc_diag_1m_ref::<S, P>
        } else {
            pack_cxc_diag_ref::<S, P>
        },
    }
}

fn kernel_tables() -> KernelTables {
    KernelTables {
        f32: kernel_set::<f32>(),
        f64: kernel_set::<f64>(),
        c32: kernel_set::<C32>(),
        c64: kernel_set::<C64>(),
    }
}

fn pack_tables() -> PackTables {
    PackTables {
        f32_f32: pack_set::<f32, f32>(),
        f32_f64: pack_set::<f32, f64>(),
        f32_c32: pack_set::<f32, C32>(),
        f32_c64: pack_set::<f32, C64>(),
        f64_f32: pack_set::<f64, f32>(),
        f64_f64: pack_set::<f64, f64>(),
        f64_c32: pack_set::<f64, C32>(),
        f64_c64: pack_set::<f64, C64>(),
        c32_f32: pack_set::<C32, f32>(),
        c32_f64: pack_set::<C32, f64>(),
        c32_c32: pack_set::<C32, C32>(),
        c32_c64: pack_set::<C32, C64>(),
        c64_f32: pack_set::<C64, f32>(),
        c64_f64: pack_set::<C64, f64>(),
        c64_c32: pack_set::<C64, C32>(),
        c64_c64: pack_set::<C64, C64>(),
    }
}

// CONTEXT CONSTRUCTION
// ================================================================================================

/// Context executing complex operations natively.
pub fn native_context() -> Context {
    Context::new(IndMethod::Native, default_blocksizes(), kernel_tables(), pack_tables())
}

/// Context executing complex operations through the 1m induced method: complex blocksizes are
/// projected from the real table and the pack schemas switch to the augmented layouts.
pub fn context_1m() -> Context {
    Context::new(
        IndMethod::OneM,
        default_blocksizes().project_for_1m(),
        kernel_tables(),
        pack_tables(),
    )
}

/// Context for the given induced method.
pub fn context_for(method: IndMethod) -> Context {
    match method {
        IndMethod::Native => native_context(),
        IndMethod::OneM => context_1m(),
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use lamina_core::{BszId, DType};

    use super::*;

    #[test]
    fn native_context_blocksizes_satisfy_multiplicity() {
        let cntx = native_context();
        for dt in DType::ALL {
            let mr = cntx.blksz_def(dt, BszId::Mr);
            assert_eq!(cntx.blksz_def(dt, BszId::Mc) % mr, 0);
            assert_eq!(cntx.blksz_max(dt, BszId::Mc) % mr, 0);
        }
    }

    #[test]
    fn one_m_context_projects_complex_rows() {
        let cntx = context_1m();
        assert_eq!(cntx.method(), IndMethod::OneM);
        assert_eq!(cntx.blksz_def(DType::C64, BszId::Mr), 2);
        assert_eq!(cntx.blksz_def(DType::C64, BszId::Kc), 64);
        assert_eq!(cntx.blksz_def(DType::F64, BszId::Mr), 4);
    }
}
