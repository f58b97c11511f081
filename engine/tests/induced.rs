//! The 1m induced method: complex operations executed through the real-domain micro-kernel on
//! augmented panels must agree with native execution to round-off.

mod common;

use common::*;
use lamina_engine::{C32, C64, Matrix, Side, Struc, Uplo};

#[test]
fn one_m_gemm_agrees_with_native_c64() {
    let native = blocked_engine();
    let one_m = blocked_engine_1m();
    let (m, n, k) = (45, 38, 90);
    let a = gen_c64(m, k, 1);
    let b = gen_c64(k, n, 2);
    let alpha = C64::new(1.25, -0.75);
    let beta = C64::new(0.5, 0.5);

    let mut c1 = gen_c64(m, n, 3);
    let mut c2 = c1.clone();
    native.gemm(sv(alpha), &a.obj(), &b.obj(), sv(beta), &c1.obj_mut(), None, None).unwrap();
    one_m.gemm(sv(alpha), &a.obj(), &b.obj(), sv(beta), &c2.obj_mut(), None, None).unwrap();
    assert_close(&c2, &c1, k, 1e-12);
}

#[test]
fn one_m_gemm_agrees_with_native_c32() {
    let native = blocked_engine();
    let one_m = blocked_engine_1m();
    let (m, n, k) = (20, 24, 50);
    let a = gen_c32(m, k, 4);
    let b = gen_c32(k, n, 5);

    let mut c1 = Matrix::<C32>::zeros(m, n);
    let mut c2 = c1.clone();
    native
        .gemm(sv(C32::new(1.0, 1.0)), &a.obj(), &b.obj(), sv(0.0f32), &c1.obj_mut(), None, None)
        .unwrap();
    one_m
        .gemm(sv(C32::new(1.0, 1.0)), &a.obj(), &b.obj(), sv(0.0f32), &c2.obj_mut(), None, None)
        .unwrap();
    assert_close(&c2, &c1, k, 1e-4);
}

#[test]
fn one_m_hemm_agrees_with_native() {
    let native = blocked_engine();
    let one_m = blocked_engine_1m();
    let (m, n) = (26, 18);
    let a = gen_c64(m, m, 6);
    let b = gen_c64(m, n, 7);

    let mut ao = a.obj();
    ao.set_struc(Struc::Hermitian);
    ao.set_uplo(Uplo::Lower);

    let mut c1 = gen_c64(m, n, 8);
    let mut c2 = c1.clone();
    native
        .hemm(Side::Left, sv(C64::new(2.0, 0.5)), &ao, &b.obj(), sv(1.0), &c1.obj_mut(), None, None)
        .unwrap();
    one_m
        .hemm(Side::Left, sv(C64::new(2.0, 0.5)), &ao, &b.obj(), sv(1.0), &c2.obj_mut(), None, None)
        .unwrap();
    assert_close(&c2, &c1, m, 1e-12);
}

#[test]
fn one_m_trmm_zero_fill_is_respected() {
    // The structured zero fill writes twice as many real columns under 1m; a triangular
    // product is the sharpest consumer of those zeros.
    let native = blocked_engine();
    let one_m = blocked_engine_1m();
    let (m, n) = (22, 16);
    let a = gen_tri_c64(m, Uplo::Upper, 9);
    let b0 = gen_c64(m, n, 10);

    let mut ao = a.obj();
    ao.set_struc(Struc::Triangular);
    ao.set_uplo(Uplo::Upper);

    let mut b1 = b0.clone();
    let mut b2 = b0.clone();
    native.trmm(Side::Left, sv(1.0), &ao, &b1.obj_mut(), None, None).unwrap();
    one_m.trmm(Side::Left, sv(1.0), &ao, &b2.obj_mut(), None, None).unwrap();
    assert_close(&b2, &b1, m, 1e-12);
}

#[test]
fn one_m_gemmt_masks_identically() {
    let native = blocked_engine();
    let one_m = blocked_engine_1m();
    let (m, k) = (20, 32);
    let a = gen_c64(m, k, 11);
    let b = gen_c64(k, m, 12);
    let c0 = gen_c64(m, m, 13);

    let mut c1 = c0.clone();
    let mut c2 = c0.clone();
    let mut co1 = c1.obj_mut();
    co1.set_uplo(Uplo::Upper);
    native.gemmt(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &co1, None, None).unwrap();
    drop(co1);
    let mut co2 = c2.obj_mut();
    co2.set_uplo(Uplo::Upper);
    one_m.gemmt(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &co2, None, None).unwrap();
    drop(co2);

    // Stored triangles agree; unstored triangles are bit-identical to the input under both
    // methods.
    for j in 0..m {
        for i in 0..m {
            if i <= j {
                let d = (c1.at(i, j) - c2.at(i, j)).abs_f64();
                assert!(d <= 1e-12 * k as f64 * (1.0 + c1.at(i, j).abs_f64()));
            } else {
                assert_eq!(c1.at(i, j), c0.at(i, j));
                assert_eq!(c2.at(i, j), c0.at(i, j));
            }
        }
    }
}

#[test]
fn one_m_mixed_precision_gemm() {
    // gemm permits 1m with mixed complex precisions; the staged product must match the widened
    // native reference.
    let one_m = blocked_engine_1m();
    let (m, n, k) = (14, 12, 25);
    let a = gen_c32(m, k, 14);
    let b = gen_c64(k, n, 15);
    let mut c = gen_c64(m, n, 16);
    let mut want = c.clone();
    one_m.gemm(sv(1.0), &a.obj(), &b.obj(), sv(1.0), &c.obj_mut(), None, None).unwrap();

    let a_up = Matrix::from_fn(m, k, |i, j| C64::new(a.at(i, j).re as f64, a.at(i, j).im as f64));
    naive_gemm(C64::new(1.0, 0.0), &a_up, &b, C64::new(1.0, 0.0), &mut want);
    assert_close(&c, &want, k, 1e-6);
}
