use crate::{
    blocksz::{BlkszTable, Blksz, BszId},
    kernel::{KernelDt, KernelSet, KernelTables, PackDt, PackKernelSet, PackTables},
    obj::Obj,
    types::Scalar,
};

// INDUCED METHODS
// ================================================================================================

/// How a complex-domain operation is executed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndMethod {
    /// Complex arithmetic in the micro-kernel itself.
    Native,
    /// Complex arithmetic induced from the real-domain micro-kernel via the augmented-panel
    /// ("1m") packing layouts.
    OneM,
}

// CONTEXT
// ================================================================================================

/// Read-only table of blocksizes and kernel registrations consumed by one operation call.
///
/// A context is immutable after construction; concurrent readers need no synchronization.
/// The engine owns one context per induced method and hands out references; callers may also
/// supply their own (e.g. with experimental blocksizes) to any expert entry point.
#[derive(Clone)]
pub struct Context {
    method: IndMethod,
    blksz: BlkszTable,
    kernels: KernelTables,
    packs: PackTables,
}

impl Context {
    pub fn new(
        method: IndMethod,
        blksz: BlkszTable,
        kernels: KernelTables,
        packs: PackTables,
    ) -> Self {
        Self { method, blksz, kernels, packs }
    }

    pub fn method(&self) -> IndMethod {
        self.method
    }

    pub fn blksz(&self, dt: crate::DType, id: BszId) -> Blksz {
        self.blksz.get(dt, id)
    }

    pub fn blksz_def(&self, dt: crate::DType, id: BszId) -> usize {
        self.blksz.def(dt, id)
    }

    pub fn blksz_max(&self, dt: crate::DType, id: BszId) -> usize {
        self.blksz.max(dt, id)
    }

    pub fn blksz_table(&self) -> &BlkszTable {
        &self.blksz
    }

    /// Compute kernels for the scalar type `T`.
    pub fn kernels<T: KernelDt>(&self) -> &KernelSet<T> {
        T::kernel_set(&self.kernels)
    }

    /// Packing kernels for the ordered `(S, P)` source/target pair.
    pub fn pack_kernels<S: PackDt<P>, P: Scalar>(&self) -> &PackKernelSet<S, P> {
        S::pack_set(&self.packs)
    }

    /// True when the micro-kernel registered for `dt` prefers row-contiguous output.
    pub fn ukr_prefers_rows(&self, dt: crate::DType) -> bool {
        match dt {
            crate::DType::F32 => self.kernels.f32.prefers_rows,
            crate::DType::F64 => self.kernels.f64.prefers_rows,
            crate::DType::C32 => self.kernels.c32.prefers_rows,
            crate::DType::C64 => self.kernels.c64.prefers_rows,
        }
    }

    /// True when the storage of `c` runs against the micro-kernel's output preference, i.e.
    /// when the whole operation should be transposed so the kernel can write `c` its way.
    pub fn dislikes_storage_of(&self, c: &Obj<'_>) -> bool {
        if self.ukr_prefers_rows(c.dt()) {
            !c.is_row_stored() && c.is_col_stored()
        } else {
            !c.is_col_stored() && c.is_row_stored()
        }
    }
}
