//! Shared helpers for the engine integration tests: deterministic data generation, dense
//! reference implementations, and tolerance-aware comparison.
#![allow(dead_code)]

use lamina_core::Scalar;
use lamina_engine::{C32, C64, Engine, EngineConfig, Matrix, ScalarVal, Struc, Uplo};

// ENGINES
// ================================================================================================

/// Engine with the small/unpacked path disabled, so every test exercises the blocked pipeline.
pub fn blocked_engine() -> Engine {
    Engine::new(EngineConfig { enable_sup: false, ..EngineConfig::default() })
}

/// Blocked engine with the 1m induced method enabled for both complex precisions.
pub fn blocked_engine_1m() -> Engine {
    Engine::new(EngineConfig {
        enable_sup: false,
        enable_1m: [true, true],
        ..EngineConfig::default()
    })
}

// TEST SCALAR SURFACE
// ================================================================================================

/// Minimal scalar bound for the dense reference helpers.
pub trait Sc:
    Scalar
    + PartialEq
    + core::fmt::Debug
    + core::ops::Add<Output = Self>
    + core::ops::Sub<Output = Self>
    + core::ops::Mul<Output = Self>
{
    fn zero() -> Self;
    fn one() -> Self;
    fn half() -> Self;
    fn conj(self) -> Self;
    fn abs_f64(self) -> f64;
}

impl Sc for f32 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn half() -> Self {
        0.5
    }
    fn conj(self) -> Self {
        self
    }
    fn abs_f64(self) -> f64 {
        self.abs() as f64
    }
}

impl Sc for f64 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn half() -> Self {
        0.5
    }
    fn conj(self) -> Self {
        self
    }
    fn abs_f64(self) -> f64 {
        self.abs()
    }
}

impl Sc for C32 {
    fn zero() -> Self {
        C32::new(0.0, 0.0)
    }
    fn one() -> Self {
        C32::new(1.0, 0.0)
    }
    fn half() -> Self {
        C32::new(0.5, 0.0)
    }
    fn conj(self) -> Self {
        C32::new(self.re, -self.im)
    }
    fn abs_f64(self) -> f64 {
        (self.re as f64).hypot(self.im as f64)
    }
}

impl Sc for C64 {
    fn zero() -> Self {
        C64::new(0.0, 0.0)
    }
    fn one() -> Self {
        C64::new(1.0, 0.0)
    }
    fn half() -> Self {
        C64::new(0.5, 0.0)
    }
    fn conj(self) -> Self {
        C64::new(self.re, -self.im)
    }
    fn abs_f64(self) -> f64 {
        self.re.hypot(self.im)
    }
}

// DATA GENERATION
// ================================================================================================

pub fn gen_f64(m: usize, n: usize, seed: usize) -> Matrix<f64> {
    Matrix::from_fn(m, n, |i, j| ((i + 7 * j + seed) as f64 * 0.1).sin())
}

pub fn gen_f32(m: usize, n: usize, seed: usize) -> Matrix<f32> {
    Matrix::from_fn(m, n, |i, j| ((i + 7 * j + seed) as f32 * 0.1).sin())
}

pub fn gen_c64(m: usize, n: usize, seed: usize) -> Matrix<C64> {
    Matrix::from_fn(m, n, |i, j| {
        C64::new(
            ((i + 7 * j + seed) as f64 * 0.1).sin(),
            ((2 * i + 3 * j + seed) as f64 * 0.2).cos(),
        )
    })
}

pub fn gen_c32(m: usize, n: usize, seed: usize) -> Matrix<C32> {
    Matrix::from_fn(m, n, |i, j| {
        C32::new(
            ((i + 7 * j + seed) as f32 * 0.1).sin(),
            ((2 * i + 3 * j + seed) as f32 * 0.2).cos(),
        )
    })
}

/// Well-conditioned triangular test matrix: small off-diagonal entries with a dominant
/// diagonal, so solves stay stable.
pub fn gen_tri_f64(n: usize, uplo: Uplo, seed: usize) -> Matrix<f64> {
    Matrix::from_fn(n, n, |i, j| {
        let stored = match uplo {
            Uplo::Lower => i >= j,
            Uplo::Upper => i <= j,
        };
        if !stored {
            0.0
        } else if i == j {
            3.0 + ((i + seed) as f64 * 0.3).sin()
        } else {
            ((i + 3 * j + seed) as f64 * 0.1).sin() * 0.5
        }
    })
}

pub fn gen_tri_c64(n: usize, uplo: Uplo, seed: usize) -> Matrix<C64> {
    Matrix::from_fn(n, n, |i, j| {
        let stored = match uplo {
            Uplo::Lower => i >= j,
            Uplo::Upper => i <= j,
        };
        if !stored {
            C64::new(0.0, 0.0)
        } else if i == j {
            C64::new(3.0 + ((i + seed) as f64 * 0.3).sin(), 0.2 * ((i + seed) as f64 * 0.2).cos())
        } else {
            C64::new(
                0.5 * ((i + 3 * j + seed) as f64 * 0.1).sin(),
                0.5 * ((2 * i + j + seed) as f64 * 0.15).cos(),
            )
        }
    })
}

// DENSE REFERENCE OPERATIONS
// ================================================================================================

pub fn transpose<T: Sc>(a: &Matrix<T>) -> Matrix<T> {
    Matrix::from_fn(a.ncols(), a.nrows(), |i, j| a.at(j, i))
}

pub fn conj_transpose<T: Sc>(a: &Matrix<T>) -> Matrix<T> {
    Matrix::from_fn(a.ncols(), a.nrows(), |i, j| Sc::conj(a.at(j, i)))
}

/// `c = alpha * a * b + beta * c`, dense and unblocked.
pub fn naive_gemm<T: Sc>(alpha: T, a: &Matrix<T>, b: &Matrix<T>, beta: T, c: &mut Matrix<T>) {
    assert_eq!(a.ncols(), b.nrows());
    for j in 0..c.ncols() {
        for i in 0..c.nrows() {
            let mut acc = <T as Sc>::zero();
            for p in 0..a.ncols() {
                acc = acc + a.at(i, p) * b.at(p, j);
            }
            let old = c.at(i, j);
            c.set(i, j, alpha * acc + beta * old);
        }
    }
}

/// Densifies a triangular/symmetric/Hermitian matrix from its stored triangle.
pub fn densify<T: Sc>(a: &Matrix<T>, struc: Struc, uplo: Uplo, unit_diag: bool) -> Matrix<T> {
    Matrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        let stored = match uplo {
            Uplo::Lower => i >= j,
            Uplo::Upper => i <= j,
        };
        if i == j {
            return if unit_diag {
                <T as Sc>::one()
            } else if struc == Struc::Hermitian {
                // A Hermitian diagonal is semantically real.
                let v = a.at(i, i);
                (v + Sc::conj(v)) * T::half()
            } else {
                a.at(i, j)
            };
        }
        match (stored, struc) {
            (true, _) => a.at(i, j),
            (false, Struc::Triangular) => <T as Sc>::zero(),
            (false, Struc::Symmetric) => a.at(j, i),
            (false, Struc::Hermitian) => Sc::conj(a.at(j, i)),
            (false, Struc::General) => a.at(i, j),
        }
    })
}

// COMPARISON
// ================================================================================================

/// Asserts element-wise closeness with a tolerance scaled to the inner-product length.
pub fn assert_close<T: Sc>(got: &Matrix<T>, want: &Matrix<T>, k: usize, eps: f64) {
    assert_eq!((got.nrows(), got.ncols()), (want.nrows(), want.ncols()));
    let tol = eps * (k.max(1) as f64);
    for j in 0..got.ncols() {
        for i in 0..got.nrows() {
            let d = (got.at(i, j) - want.at(i, j)).abs_f64();
            let scale = 1.0 + want.at(i, j).abs_f64();
            assert!(
                d <= tol * scale,
                "mismatch at ({i}, {j}): {:?} vs {:?} (diff {d:.3e}, tol {:.3e})",
                got.at(i, j),
                want.at(i, j),
                tol * scale
            );
        }
    }
}

pub fn sv<T: Into<ScalarVal>>(v: T) -> ScalarVal {
    v.into()
}
