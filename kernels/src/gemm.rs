use lamina_core::Scalar;
use num_traits::Zero;

// REFERENCE GEMM MICRO-KERNEL
// ================================================================================================

/// Portable micro-kernel: `c = alpha * a * b + beta * c` on an `m x n` tile with an inner
/// product of length `k` over packed micro-panels.
///
/// Matches the [`lamina_core::GemmUkr`] contract. A tuned kernel library would replace this
/// with an architecture-specific implementation registered under the same table entry; the
/// reference version exists so every datatype always has a working registration.
///
/// # Safety
/// See [`lamina_core::GemmUkr`].
pub unsafe fn gemm_ukr_ref<T: Scalar>(
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
) {
    unsafe {
        for j in 0..n {
            for i in 0..m {
                let mut acc = T::zero();
                for p in 0..k {
                    acc += *a.add(i + p * lda) * *b.add(j + p * ldb);
                }
                let cij = c.offset(i as isize * rs_c + j as isize * cs_c);
                // A zero beta must suppress the read of c, which may hold uninitialized or
                // non-finite payloads.
                if beta.is_zero() {
                    *cij = *alpha * acc;
                } else {
                    *cij = *alpha * acc + *beta * *cij;
                }
            }
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_product_with_beta() {
        // 2x2 tile, k = 2, packed with lda = ldb = 4.
        let a = [1.0f64, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0];
        let b = [5.0f64, 6.0, 0.0, 0.0, 7.0, 8.0, 0.0, 0.0];
        let mut c = [1.0f64; 4];
        unsafe {
            gemm_ukr_ref(2, 2, 2, &1.0, a.as_ptr(), 4, b.as_ptr(), 4, &10.0, c.as_mut_ptr(), 1, 2);
        }
        // a = [[1,3],[2,4]], b^T rows = [[5,7],[6,8]] => ab = [[26,30],[38,44]]
        assert_eq!(c, [36.0, 48.0, 40.0, 54.0]);
    }

    #[test]
    fn zero_beta_ignores_garbage_c() {
        let a = [2.0f64, 0.0, 0.0, 0.0];
        let b = [3.0f64, 0.0, 0.0, 0.0];
        let mut c = [f64::NAN];
        unsafe {
            gemm_ukr_ref(1, 1, 1, &1.0, a.as_ptr(), 4, b.as_ptr(), 4, &0.0, c.as_mut_ptr(), 1, 1);
        }
        assert_eq!(c[0], 6.0);
    }
}
