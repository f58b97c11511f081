use crate::types::{C32, C64, DiagKind, PackSchema, Scalar, Struc, Uplo};

// KERNEL SIGNATURES
// ================================================================================================
//
// The engine invokes every tuned kernel through one of the typed function-pointer aliases
// below. A kernel library registers concrete instantiations in the per-datatype tables; the
// engine looks them up by type at the dispatch boundary and never again indirects through an
// erased signature.

/// Micro-kernel computing `c = alpha * a * b + beta * c` on one micro-tile.
///
/// `a` points into a packed A micro-panel holding an `m x k` block with column stride `lda`
/// (its panel-dimension maximum); `b` points into a packed B micro-panel holding a `k x n`
/// block whose rows are `ldb` apart. `m <= MR` and `n <= NR`; the kernel must handle the edge
/// cases. `c` is addressed with general strides.
///
/// # Safety
/// All pointers must reference panels/tiles of at least the stated geometry, and `c` must be
/// writable and unaliased by other concurrent kernel invocations.
pub type GemmUkr<T> = unsafe fn(
    m: usize,
    n: usize,
    k: usize,
    alpha: &T,
    a: *const T,
    lda: usize,
    b: *const T,
    ldb: usize,
    beta: &T,
    c: *mut T,
    rs_c: isize,
    cs_c: isize,
);

/// Fused micro-kernel for the triangular solve: computes
/// `b11 = inv(a11) * (alpha * b11 - a10 * b01)` for the lower case (or the mirrored update for
/// the upper case), storing the solved tile both back into the packed B panel (`b11`) and to
/// the output matrix tile (`c11`).
///
/// `k` is the length of the `a10` (resp. `a12`) segment; `a11` points at the diagonal block
/// inside the same packed micro-panel. When `inv_diag` is set the packer has pre-inverted the
/// diagonal and the solver multiplies; otherwise it divides. `m <= MR`, `n <= NR`.
///
/// # Safety
/// Same pointer contract as [`GemmUkr`]; additionally `b11` aliases the packed panel region
/// that later micro-panel solves of the same block will read.
pub type GemmTrsmUkr<T> = unsafe fn(
    k: usize,
    alpha: &T,
    a10: *const T,
    a11: *const T,
    lda: usize,
    inv_diag: bool,
    b01: *const T,
    b11: *mut T,
    ldb: usize,
    m: usize,
    n: usize,
    c11: *mut T,
    rs_c: isize,
    cs_c: isize,
);

/// Packing sub-kernel for one micro-panel of an unstructured region.
///
/// Reads a `panel_dim x panel_len` slab of the source (element `(i, j)` at
/// `c + i * incc + j * ldc`), scales by `kappa`, optionally conjugates, broadcasts each element
/// `panel_bcast` times along the short axis, and writes the panel padded with explicit zeros to
/// `panel_dim_max` and `panel_len_max`. Under a 1m schema the panel is written in the augmented
/// real layout and the effective leading dimension doubles.
///
/// # Safety
/// `p` must have room for a full `panel_dim_max x panel_len_max` panel (doubled under 1m), and
/// the source region must be readable.
pub type PackCxk<S, P> = unsafe fn(
    conj: bool,
    schema: PackSchema,
    panel_dim: usize,
    panel_dim_max: usize,
    panel_bcast: usize,
    panel_len: usize,
    panel_len_max: usize,
    kappa: &P,
    c: *const S,
    incc: isize,
    ldc: isize,
    p: *mut P,
    ldp: usize,
);

/// Packing sub-kernel for the diagonal-intersecting `panel_dim x panel_dim` block of a
/// structured operand: applies the triangular/symmetric/Hermitian reflection element-wise,
/// honors a unit diagonal, optionally inverts the diagonal (trsm pre-inversion), and pads the
/// far edge to `panel_len_max`.
///
/// # Safety
/// Same contract as [`PackCxk`].
pub type PackCxcDiag<S, P> = unsafe fn(
    struc: Struc,
    diag: DiagKind,
    uplo: Uplo,
    conj: bool,
    schema: PackSchema,
    invert_diag: bool,
    panel_dim: usize,
    panel_dim_max: usize,
    panel_bcast: usize,
    panel_len_max: usize,
    kappa: &P,
    c: *const S,
    incc: isize,
    ldc: isize,
    p: *mut P,
    ldp: usize,
);

// KERNEL TABLES
// ================================================================================================

/// Compute kernels registered for one datatype.
#[derive(Copy, Clone)]
pub struct KernelSet<T: Scalar> {
    pub gemm: GemmUkr<T>,
    pub gemmtrsm_l: GemmTrsmUkr<T>,
    pub gemmtrsm_u: GemmTrsmUkr<T>,
    /// True when the micro-kernel writes its output tile most efficiently row by row.
    pub prefers_rows: bool,
}

/// Packing kernels registered for one ordered `(source, target)` datatype pair.
#[derive(Copy, Clone)]
pub struct PackKernelSet<S: Scalar, P: Scalar> {
    pub cxk: PackCxk<S, P>,
    pub cxc_diag: PackCxcDiag<S, P>,
    /// 1m-layout variants; for real targets these alias the native kernels.
    pub cxk_1m: PackCxk<S, P>,
    pub cxc_diag_1m: PackCxcDiag<S, P>,
}

/// Compute-kernel tables for all four datatypes.
#[derive(Copy, Clone)]
pub struct KernelTables {
    pub f32: KernelSet<f32>,
    pub f64: KernelSet<f64>,
    pub c32: KernelSet<C32>,
    pub c64: KernelSet<C64>,
}

/// Packing-kernel tables for all sixteen ordered datatype pairs.
#[derive(Copy, Clone)]
pub struct PackTables {
    pub f32_f32: PackKernelSet<f32, f32>,
    pub f32_f64: PackKernelSet<f32, f64>,
    pub f32_c32: PackKernelSet<f32, C32>,
    pub f32_c64: PackKernelSet<f32, C64>,
    pub f64_f32: PackKernelSet<f64, f32>,
    pub f64_f64: PackKernelSet<f64, f64>,
    pub f64_c32: PackKernelSet<f64, C32>,
    pub f64_c64: PackKernelSet<f64, C64>,
    pub c32_f32: PackKernelSet<C32, f32>,
    pub c32_f64: PackKernelSet<C32, f64>,
    pub c32_c32: PackKernelSet<C32, C32>,
    pub c32_c64: PackKernelSet<C32, C64>,
    pub c64_f32: PackKernelSet<C64, f32>,
    pub c64_f64: PackKernelSet<C64, f64>,
    pub c64_c32: PackKernelSet<C64, C32>,
    pub c64_c64: PackKernelSet<C64, C64>,
}

// TYPED TABLE SELECTION
// ================================================================================================

/// Selects the compute-kernel entry for a scalar type.
pub trait KernelDt: Scalar {
    fn kernel_set(tables: &KernelTables) -> &KernelSet<Self>;
}

macro_rules! impl_kernel_dt {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl KernelDt for $ty {
                #[inline(always)]
                fn kernel_set(tables: &KernelTables) -> &KernelSet<Self> {
                    &tables.$field
                }
            }
        )*
    };
}

impl_kernel_dt!(f32 => f32, f64 => f64, C32 => c32, C64 => c64);

/// Selects the packing-kernel entry for an ordered `(Self, P)` pair.
pub trait PackDt<P: Scalar>: Scalar {
    fn pack_set(tables: &PackTables) -> &PackKernelSet<Self, P>;
}

macro_rules! impl_pack_dt {
    ($($src:ty, $dst:ty => $field:ident);* $(;)?) => {
        $(
            impl PackDt<$dst> for $src {
                #[inline(always)]
                fn pack_set(tables: &PackTables) -> &PackKernelSet<Self, $dst> {
                    &tables.$field
                }
            }
        )*
    };
}

impl_pack_dt!(
    f32, f32 => f32_f32; f32, f64 => f32_f64; f32, C32 => f32_c32; f32, C64 => f32_c64;
    f64, f32 => f64_f32; f64, f64 => f64_f64; f64, C32 => f64_c32; f64, C64 => f64_c64;
    C32, f32 => c32_f32; C32, f64 => c32_f64; C32, C32 => c32_c32; C32, C64 => c32_c64;
    C64, f32 => c64_f32; C64, f64 => c64_f64; C64, C32 => c64_c32; C64, C64 => c64_c64;
);
