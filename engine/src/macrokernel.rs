use lamina_core::{
    Context, KernelDt, Obj, Scalar, ScalarVal, Uplo, dispatch_dt,
};
use num_traits::{One, Zero};

use crate::{
    cntl::KerFamily,
    driver::{Band, PassDown},
    thread::{L_IC, L_IR, L_JR, ThrInfo, thread_range, thread_range_weighted},
};

// Scratch-tile capacities; reference register blocksizes are far below these.
const MAX_TILE: usize = 1024;
const MAX_TILE_R: usize = 2048;

// GEMM / GEMMT MACRO-KERNEL
// ================================================================================================

/// Drives the JR and IR loops over one `(packed A block, packed B panel, C block)` triple,
/// invoking the micro-kernel per micro-tile.
///
/// Per-tile handling:
/// - tiles outside the iteration's active row/column region are skipped without touching C;
/// - tiles inside the first-touch band receive the staged beta, all others beta = 1;
/// - for the triangular-output family, tiles fully outside the stored triangle of C are
///   skipped, straddling tiles are computed into a scratch tile and masked-stored, and fully
///   stored tiles go straight to the micro-kernel;
/// - under a 1m schema the complex tile is produced by the real-domain micro-kernel on the
///   augmented panels and reassembled with complex beta.
pub(crate) fn gemm_ker(
    family: KerFamily,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    alpha: ScalarVal,
    pd: &PassDown,
    weighted: bool,
    cntx: &Context,
    thr: &ThrInfo,
) {
    dispatch_dt!(c.dt(), T => gemm_ker_t::<T>(family, a, b, c, alpha, pd, weighted, cntx, thr));
}

#[allow(clippy::too_many_arguments)]
fn gemm_ker_t<T: Scalar + KernelDt>(
    family: KerFamily,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    alpha: ScalarVal,
    pd: &PassDown,
    weighted: bool,
    cntx: &Context,
    thr: &ThrInfo,
) where
    T::Real: KernelDt,
{
    let m = c.length();
    let n = c.width();
    let k = a.width();
    let mr = a.panel_dim_max();
    let nr = b.panel_dim_max();
    let lda = a.panel_ld();
    let ldb = b.panel_ld();
    let ps_a = a.panel_stride();
    let ps_b = b.panel_stride();
    let rs_c = c.row_stride();
    let cs_c = c.col_stride();
    let one_m = a.schema().is_1m() && T::IS_COMPLEX;

    let alpha_t: T = alpha.to();
    let beta_band: T = pd.beta.to();
    let kset = cntx.kernels::<T>();
    let real_gemm = cntx.kernels::<T::Real>().gemm;

    let tri_c = family == KerFamily::Gemmt;
    let (jlo, jhi) = if weighted && tri_c {
        thread_range_weighted(n, nr, thr.way(L_JR), thr.id(L_JR), c.uplo() == Uplo::Upper)
    } else {
        thread_range(n, nr, thr.way(L_JR), thr.id(L_JR))
    };
    let (ilo, ihi) = if weighted && tri_c {
        thread_range_weighted(m, mr, thr.way(L_IR), thr.id(L_IR), c.uplo() == Uplo::Lower)
    } else {
        thread_range(m, mr, thr.way(L_IR), thr.id(L_IR))
    };

    let mut j = jlo;
    while j < jhi {
        let n_cur = nr.min(jhi - j);
        if !pd.col_active.contains(j) {
            j += n_cur;
            continue;
        }
        let b_panel = unsafe { (b.buffer() as *const T).add((j / nr) * ps_b) };

        let mut i = ilo;
        while i < ihi {
            let m_cur = mr.min(ihi - i);
            if !pd.row_active.contains(i) {
                i += m_cur;
                continue;
            }
            let a_panel = unsafe { (a.buffer() as *const T).add((i / mr) * ps_a) };
            let beta_tile: T = if pd.row_band.contains(i) && pd.col_band.contains(j) {
                beta_band
            } else {
                T::one()
            };
            let c_tile = unsafe { c.ptr_at::<T>(i, j) };

            // Location of the tile relative to the stored triangle of C.
            let (skip, straddle) = if tri_c {
                tile_vs_triangle(c.uplo(), c.diag_off(), i, m_cur, j, n_cur)
            } else {
                (false, false)
            };
            if skip {
                i += m_cur;
                continue;
            }

            unsafe {
                if straddle {
                    let mut tile = [T::zero(); MAX_TILE];
                    debug_assert!(m_cur * n_cur <= MAX_TILE);
                    if one_m {
                        tile_1m::<T>(
                            real_gemm, m_cur, n_cur, k, a_panel, lda, b_panel, ldb, alpha_t,
                            T::zero(), tile.as_mut_ptr(), 1, m_cur as isize,
                        );
                    } else {
                        (kset.gemm)(
                            m_cur, n_cur, k, &alpha_t, a_panel, lda, b_panel, ldb, &T::zero(),
                            tile.as_mut_ptr(), 1, m_cur as isize,
                        );
                    }
                    masked_store::<T>(
                        c.uplo(), c.diag_off(), i, m_cur, j, n_cur, &tile, beta_tile, c_tile,
                        rs_c, cs_c,
                    );
                } else if one_m {
                    tile_1m::<T>(
                        real_gemm, m_cur, n_cur, k, a_panel, lda, b_panel, ldb, alpha_t,
                        beta_tile, c_tile, rs_c, cs_c,
                    );
                } else {
                    (kset.gemm)(
                        m_cur, n_cur, k, &alpha_t, a_panel, lda, b_panel, ldb, &beta_tile,
                        c_tile, rs_c, cs_c,
                    );
                }
            }
            i += m_cur;
        }
        j += n_cur;
    }
}

/// `(skip, straddle)` classification of a tile against the stored triangle.
fn tile_vs_triangle(
    uplo: Uplo,
    d: isize,
    i: usize,
    m_cur: usize,
    j: usize,
    n_cur: usize,
) -> (bool, bool) {
    let i0 = i as isize;
    let i1 = (i + m_cur - 1) as isize;
    let j0 = j as isize;
    let j1 = (j + n_cur - 1) as isize;
    match uplo {
        Uplo::Lower => {
            if j1 - i0 <= d {
                (false, false)
            } else if j0 - i1 > d {
                (true, false)
            } else {
                (false, true)
            }
        },
        Uplo::Upper => {
            if j0 - i1 >= d {
                (false, false)
            } else if j1 - i0 < d {
                (true, false)
            } else {
                (false, true)
            }
        },
    }
}

/// Stores the scratch tile to C, restricted to the stored triangle. Off-triangle elements of C
/// are left bit-identical.
#[allow(clippy::too_many_arguments)]
unsafe fn masked_store<T: Scalar>(
    uplo: Uplo,
    d: isize,
    i: usize,
    m_cur: usize,
    j: usize,
    n_cur: usize,
    tile: &[T],
    beta: T,
    c: *mut T,
    rs_c: isize,
    cs_c: isize,
) {
    for jj in 0..n_cur {
        for ii in 0..m_cur {
            let dj = (j + jj) as isize - (i + ii) as isize;
            let stored = match uplo {
                Uplo::Lower => dj <= d,
                Uplo::Upper => dj >= d,
            };
            if !stored {
                continue;
            }
            unsafe {
                let cij = c.offset(ii as isize * rs_c + jj as isize * cs_c);
                let t = tile[ii + jj * m_cur];
                *cij = if beta.is_zero() { t } else { t + beta * *cij };
            }
        }
    }
}

/// Executes the real-domain micro-kernel over 1m-packed panels and reassembles the complex
/// micro-tile, applying complex beta.
#[allow(clippy::too_many_arguments)]
unsafe fn tile_1m<T: Scalar>(
    real_ukr: lamina_core::GemmUkr<T::Real>,
    m: usize,
    n: usize,
    k: usize,
    a: *const T,
    lda: usize,
    b: *const T,
    ldb: usize,
    alpha: T,
    beta: T,
    c: *mut T,
    rs_c: isize,
    cs_c: isize,
) {
    let mut tr = [T::Real::zero(); MAX_TILE_R];
    debug_assert!(2 * m * n <= MAX_TILE_R);
    unsafe {
        real_ukr(
            2 * m,
            n,
            2 * k,
            &T::Real::one(),
            a as *const T::Real,
            2 * lda,
            b as *const T::Real,
            ldb,
            &T::Real::zero(),
            tr.as_mut_ptr(),
            1,
            (2 * m) as isize,
        );
        for j in 0..n {
            for i in 0..m {
                let v = T::from_parts(tr[2 * i + j * 2 * m], tr[2 * i + 1 + j * 2 * m]);
                let cij = c.offset(i as isize * rs_c + j as isize * cs_c);
                *cij = if beta.is_zero() { alpha * v } else { alpha * v + beta * *cij };
            }
        }
    }
}

// TRSM MACRO-KERNEL
// ================================================================================================

/// Solves one diagonal-intersecting block: iterates the packed A micro-panels in dependency
/// order (top-down for lower, bottom-up for upper, matching the reversed packing of the upper
/// case) and the packed B panels across the cooperating threads, invoking the fused
/// gemm-trsm micro-kernel. Solved tiles are written back into the packed B panel and to the
/// output rows of B.
pub(crate) fn trsm_ker(
    uplo: Uplo,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    alpha: ScalarVal,
    inv_diag: bool,
    cntx: &Context,
    thr: &ThrInfo,
) {
    dispatch_dt!(c.dt(), T => trsm_ker_t::<T>(uplo, a, b, c, alpha, inv_diag, cntx, thr));
}

#[allow(clippy::too_many_arguments)]
fn trsm_ker_t<T: Scalar + KernelDt>(
    uplo: Uplo,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    alpha: ScalarVal,
    inv_diag: bool,
    cntx: &Context,
    thr: &ThrInfo,
) {
    let m_blk = c.length();
    let n = c.width();
    let len = a.width();
    let mr = a.panel_dim_max();
    let nr = b.panel_dim_max();
    let lda = a.panel_ld();
    let ldb = b.panel_ld();
    let ps_a = a.panel_stride();
    let ps_b = b.panel_stride();
    let d_base = a.diag_off();
    debug_assert!(d_base >= 0);

    let alpha_t: T = alpha.to();
    let kset = cntx.kernels::<T>();
    let ukr = match uplo {
        Uplo::Lower => kset.gemmtrsm_l,
        Uplo::Upper => kset.gemmtrsm_u,
    };

    // The whole (jc, pc) group cooperates on the solve, partitioned over column panels so each
    // packed B column is solved and consumed by a single thread.
    let members = thr.way(L_IC) * thr.way(L_JR) * thr.way(L_IR);
    let (jlo, jhi) = thread_range(n, nr, members, thr.rank_in(L_IC));

    let np = m_blk.div_ceil(mr);
    let rev = uplo == Uplo::Upper;

    for q in 0..np {
        let src_panel = if rev { np - 1 - q } else { q };
        let r0 = src_panel * mr;
        let m_cur = mr.min(m_blk - r0);
        let d_loc = (d_base + r0 as isize) as usize;
        let a_panel = unsafe { (a.buffer() as *const T).add(q * ps_a) };

        let mut j = jlo;
        while j < jhi {
            let n_cur = nr.min(jhi - j);
            let b_panel = unsafe { (b.buffer() as *mut T).add((j / nr) * ps_b) };
            let c11 = unsafe { c.ptr_at::<T>(r0, j) };
            unsafe {
                match uplo {
                    Uplo::Lower => {
                        let a10 = a_panel;
                        let a11 = a_panel.add(d_loc * lda);
                        let b01 = b_panel as *const T;
                        let b11 = b_panel.add(d_loc * ldb);
                        ukr(
                            d_loc, &alpha_t, a10, a11, lda, inv_diag, b01, b11, ldb, m_cur,
                            n_cur, c11, c.row_stride(), c.col_stride(),
                        );
                    },
                    Uplo::Upper => {
                        let above = d_loc + m_cur;
                        let k12 = len - above;
                        let a12 = a_panel.add(above * lda);
                        let a11 = a_panel.add(d_loc * lda);
                        let b21 = b_panel.add(above * ldb) as *const T;
                        let b11 = b_panel.add(d_loc * ldb);
                        ukr(
                            k12, &alpha_t, a12, a11, lda, inv_diag, b21, b11, ldb, m_cur,
                            n_cur, c11, c.row_stride(), c.col_stride(),
                        );
                    },
                }
            }
            j += n_cur;
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_classification() {
        // Lower triangle, main diagonal: a 4x4 tile at (4, 0) is fully stored.
        assert_eq!(tile_vs_triangle(Uplo::Lower, 0, 4, 4, 0, 4), (false, false));
        // At (0, 4) it is fully above the diagonal: skipped.
        assert_eq!(tile_vs_triangle(Uplo::Lower, 0, 0, 4, 4, 4), (true, false));
        // On the diagonal it straddles.
        assert_eq!(tile_vs_triangle(Uplo::Lower, 0, 0, 4, 0, 4), (false, true));
        // Upper mirrors.
        assert_eq!(tile_vs_triangle(Uplo::Upper, 0, 0, 4, 4, 4), (false, false));
        assert_eq!(tile_vs_triangle(Uplo::Upper, 0, 4, 4, 0, 4), (true, false));
    }

    #[test]
    fn band_membership_is_start_based() {
        let band = Band { start: 4, end: 12 };
        assert!(band.contains(4));
        assert!(band.contains(8));
        assert!(!band.contains(12));
        assert!(!band.contains(0));
    }
}
