use lamina_core::{Obj, Scalar, ScalarVal, dispatch_dt};
use num_traits::Zero;
use tracing::trace;

// SMALL / UNPACKED PATH
// ================================================================================================

/// Problem-size thresholds under which the unpacked path is attempted.
#[derive(Copy, Clone, Debug)]
pub struct SupThresholds {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl Default for SupThresholds {
    fn default() -> Self {
        Self { m: 32, n: 32, k: 32 }
    }
}

/// Attempts the small/unpacked gemm. Returns `false` when the problem does not qualify (too
/// large, heterogeneous datatypes, or widened computation precision), in which case nothing has
/// been touched and the caller proceeds to the conventional blocked path. The decline is an
/// in-band signal, never an error.
pub(crate) fn gemmsup(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
    th: SupThresholds,
) -> bool {
    if a.dt() != c.dt() || b.dt() != c.dt() || c.comp_dt() != c.dt() {
        return false;
    }
    let m = c.length();
    let n = c.width();
    let k = a.width_after_trans();
    if m > th.m || n > th.n || k > th.k {
        return false;
    }
    trace!(m, n, k, "executing small/unpacked gemm");
    dispatch_dt!(c.dt(), T => unsafe { sup_loop::<T>(alpha, a, b, beta, c, m, n, k) });
    true
}

unsafe fn sup_loop<T: Scalar>(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
    m: usize,
    n: usize,
    k: usize,
) {
    let alpha_t: T = alpha.to();
    let beta_t: T = beta.to();
    let read = |o: &Obj<'_>, i: usize, j: usize| -> T {
        let v: T = unsafe {
            if o.has_trans() { o.read_at::<T>(j, i) } else { o.read_at::<T>(i, j) }
        };
        if o.has_conj() { v.conj() } else { v }
    };
    for j in 0..n {
        for i in 0..m {
            let mut acc = T::zero();
            for p in 0..k {
                acc += read(a, i, p) * read(b, p, j);
            }
            unsafe {
                let cij = c.ptr_at::<T>(i, j);
                *cij = if beta_t.is_zero() {
                    alpha_t * acc
                } else {
                    alpha_t * acc + beta_t * *cij
                };
            }
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use lamina_core::Matrix;

    use super::*;

    #[test]
    fn declines_oversized_problems() {
        let a = Matrix::<f64>::zeros(64, 64);
        let b = Matrix::<f64>::zeros(64, 64);
        let mut c = Matrix::<f64>::zeros(64, 64);
        let taken = gemmsup(
            ScalarVal::ONE,
            &a.obj(),
            &b.obj(),
            ScalarVal::ZERO,
            &c.obj_mut(),
            SupThresholds::default(),
        );
        assert!(!taken);
    }

    #[test]
    fn computes_small_product_with_trans() {
        let a = Matrix::<f64>::from_fn(2, 3, |i, j| (i * 3 + j) as f64);
        let b = Matrix::<f64>::from_fn(2, 3, |i, j| (i == 0 && j == 0) as u8 as f64);
        let mut c = Matrix::<f64>::zeros(3, 3);
        let mut ao = a.obj();
        ao.set_trans(true); // effective 3x2
        let co = c.obj_mut();
        // c = a^T * b  (3x2 * 2x3)
        assert!(gemmsup(
            ScalarVal::ONE,
            &ao,
            &b.obj(),
            ScalarVal::ZERO,
            &co,
            SupThresholds::default()
        ));
        // a^T row 0 = [a00, a10] = [0, 3]; b col 0 = [1, 0] => c00 = 0.
        assert_eq!(c.at(0, 0), 0.0);
        // a^T row 2 = [a02, a12] = [2, 5]; c20 = 2*1 + 5*0 = 2.
        assert_eq!(c.at(2, 0), 2.0);
    }
}
