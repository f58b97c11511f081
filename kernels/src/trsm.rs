use lamina_core::Scalar;
use num_traits::Zero;

// REFERENCE FUSED GEMM-TRSM MICRO-KERNELS
// ================================================================================================
//
// Each kernel subtracts the rectangular update accumulated so far within the diagonal block
// (`a10 * b01` for the lower case, `a12 * b21` for the upper case) from `alpha * b11`, then
// solves the `m x m` triangular system held in `a11` against the tile. The solved tile is
// written both back into the packed B panel, where subsequent micro-panel solves of the same
// block read it, and to the output matrix tile.

const MAX_TILE_DIM: usize = 32;

/// Lower-triangular variant: `b11 = inv(a11) * (alpha * b11 - a10 * b01)`.
///
/// # Safety
/// See [`lamina_core::GemmTrsmUkr`].
pub unsafe fn gemmtrsm_l_ukr_ref<T: Scalar>(
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
) {
    debug_assert!(m <= MAX_TILE_DIM);
    let mut x = [T::zero(); MAX_TILE_DIM];
    unsafe {
        for j in 0..n {
            for i in 0..m {
                let mut acc = T::zero();
                for p in 0..k {
                    acc += *a10.add(i + p * lda) * *b01.add(j + p * ldb);
                }
                x[i] = *alpha * *b11.add(j + i * ldb) - acc;
            }
            // Forward substitution over the diagonal block.
            for i in 0..m {
                let mut s = x[i];
                for t in 0..i {
                    s = s - *a11.add(i + t * lda) * x[t];
                }
                let d = *a11.add(i + i * lda);
                x[i] = if inv_diag { s * d } else { s / d };
            }
            for i in 0..m {
                *b11.add(j + i * ldb) = x[i];
                *c11.offset(i as isize * rs_c + j as isize * cs_c) = x[i];
            }
        }
    }
}

/// Upper-triangular variant: `b11 = inv(a11) * (alpha * b11 - a12 * b21)`.
///
/// # Safety
/// See [`lamina_core::GemmTrsmUkr`].
pub unsafe fn gemmtrsm_u_ukr_ref<T: Scalar>(
    k: usize,
    alpha: &T,
    a12: *const T,
    a11: *const T,
    lda: usize,
    inv_diag: bool,
    b21: *const T,
    b11: *mut T,
    ldb: usize,
    m: usize,
    n: usize,
    c11: *mut T,
    rs_c: isize,
    cs_c: isize,
) {
    debug_assert!(m <= MAX_TILE_DIM);
    let mut x = [T::zero(); MAX_TILE_DIM];
    unsafe {
        for j in 0..n {
            for i in 0..m {
                let mut acc = T::zero();
                for p in 0..k {
                    acc += *a12.add(i + p * lda) * *b21.add(j + p * ldb);
                }
                x[i] = *alpha * *b11.add(j + i * ldb) - acc;
            }
            // Backward substitution over the diagonal block.
            for i in (0..m).rev() {
                let mut s = x[i];
                for t in (i + 1)..m {
                    s = s - *a11.add(i + t * lda) * x[t];
                }
                let d = *a11.add(i + i * lda);
                x[i] = if inv_diag { s * d } else { s / d };
            }
            for i in 0..m {
                *b11.add(j + i * ldb) = x[i];
                *c11.offset(i as isize * rs_c + j as isize * cs_c) = x[i];
            }
        }
    }
}

// TESTS
// ================================================================================================
