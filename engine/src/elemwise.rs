use lamina_core::{CastFrom, Obj, Scalar, ScalarVal, Struc, Uplo, dispatch_dt, dispatch_dt2};
use num_traits::Zero;

// ELEMENT-WISE SERVICE OPERATIONS
// ================================================================================================
//
// Small unblocked kernels the dispatch front-ends lean on: scaling C for the trivial
// short-circuits, zeroing Hermitian diagonals, and the cast/accumulate closing the
// mixed-datatype staging. They respect the stored triangle of a structured output and leave
// everything else bit-identical.

fn on_stored(c: &Obj<'_>, i: usize, j: usize) -> bool {
    if c.struc() == Struc::General {
        return true;
    }
    let dj = j as isize - i as isize;
    match c.uplo() {
        Uplo::Lower => dj <= c.diag_off(),
        Uplo::Upper => dj >= c.diag_off(),
    }
}

/// `C = beta * C` over the stored region. A zero beta overwrites instead of multiplying, so
/// non-finite payloads in C do not propagate.
pub(crate) fn scalm(beta: ScalarVal, c: &Obj<'_>) {
    if beta.is_one() {
        return;
    }
    dispatch_dt!(c.dt(), T => {
        let b: T = beta.to();
        for j in 0..c.width() {
            for i in 0..c.length() {
                if !on_stored(c, i, j) {
                    continue;
                }
                unsafe {
                    let p = c.ptr_at::<T>(i, j);
                    *p = if beta.is_zero() { T::zero() } else { b * *p };
                }
            }
        }
    });
}

/// Sets the imaginary part of every diagonal element to `im`. No-op in the real domain.
pub(crate) fn setid(im: f64, c: &Obj<'_>) {
    if !c.dt().is_complex() {
        return;
    }
    dispatch_dt!(c.dt(), T => {
        for i in 0..c.length() {
            let j = i as isize + c.diag_off();
            if j < 0 || j >= c.width() as isize {
                continue;
            }
            unsafe {
                let p = c.ptr_at::<T>(i, j as usize);
                let re = (*p).real();
                *p = T::from_parts(re, <T as Scalar>::Real::from_f64_parts(im, 0.0));
            }
        }
    });
}

/// `Y = cast(X) + beta * Y` over the stored region of Y. X and Y must be conformal; their
/// datatypes may differ.
pub(crate) fn xpbym(x: &Obj<'_>, beta: ScalarVal, y: &Obj<'_>) {
    debug_assert_eq!((x.length(), x.width()), (y.length(), y.width()));
    dispatch_dt2!(x.dt(), y.dt(), S, P => {
        let b: P = beta.to();
        for j in 0..y.width() {
            for i in 0..y.length() {
                if !on_stored(y, i, j) {
                    continue;
                }
                unsafe {
                    let xv = P::cast_from(x.read_at::<S>(i, j));
                    let p = y.ptr_at::<P>(i, j);
                    *p = if beta.is_zero() { xv } else { xv + b * *p };
                }
            }
        }
    });
}

/// `Y = cast(X)` over the stored region of Y.
pub(crate) fn castm(x: &Obj<'_>, y: &Obj<'_>) {
    xpbym(x, ScalarVal::ZERO, y);
}

// TESTS
// ================================================================================================
