//! Multithreaded execution: every parallel shape must agree with the single-threaded run,
//! including KC-loop parallelism with its thread-private accumulation buffers.

mod common;

use common::*;
use lamina_engine::{DiagKind, Rntm, Side, Struc, Uplo, Ways};
use rstest::rstest;

#[rstest]
#[case(2)]
#[case(4)]
#[case(7)]
fn gemm_thread_counts_agree(#[case] nt: usize) {
    let eng = blocked_engine();
    let (m, n, k) = (150, 140, 90);
    let a = gen_f64(m, k, 1);
    let b = gen_f64(k, n, 2);

    let mut c1 = gen_f64(m, n, 3);
    let mut c2 = c1.clone();
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &c1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_num_threads(nt);
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &c2.obj_mut(), None, Some(&rntm)).unwrap();
    assert_close(&c2, &c1, k, 1e-13);
}

#[rstest]
#[case(Ways { jc: 2, pc: 1, ic: 2, jr: 1, ir: 1 })]
#[case(Ways { jc: 1, pc: 1, ic: 1, jr: 2, ir: 2 })]
#[case(Ways { jc: 3, pc: 1, ic: 1, jr: 2, ir: 1 })]
fn explicit_loop_factors_agree(#[case] ways: Ways) {
    let eng = blocked_engine();
    let (m, n, k) = (110, 120, 70);
    let a = gen_f64(m, k, 4);
    let b = gen_f64(k, n, 5);

    let mut c1 = gen_f64(m, n, 6);
    let mut c2 = c1.clone();
    eng.gemm(sv(2.0), &a.obj(), &b.obj(), sv(1.0), &c1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_ways(ways);
    eng.gemm(sv(2.0), &a.obj(), &b.obj(), sv(1.0), &c2.obj_mut(), None, Some(&rntm)).unwrap();
    assert_close(&c2, &c1, k, 1e-13);
}

#[test]
fn kc_parallelism_reduces_private_tiles() {
    let eng = blocked_engine();
    let (m, n, k) = (64, 60, 300);
    let a = gen_f64(m, k, 7);
    let b = gen_f64(k, n, 8);

    let mut c1 = gen_f64(m, n, 9);
    let mut c2 = c1.clone();
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(-1.0), &c1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_ways(Ways { jc: 2, pc: 2, ic: 1, jr: 1, ir: 1 });
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(-1.0), &c2.obj_mut(), None, Some(&rntm)).unwrap();
    assert_close(&c2, &c1, k, 1e-12);
}

#[test]
fn gemmt_parallel_respects_off_triangle() {
    let eng = blocked_engine();
    let (m, k) = (90, 80);
    let a = gen_f64(m, k, 10);
    let b = gen_f64(k, m, 11);
    let c0 = gen_f64(m, m, 12);

    let mut c1 = c0.clone();
    let mut co1 = c1.obj_mut();
    co1.set_uplo(Uplo::Lower);
    eng.gemmt(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &co1, None, None).unwrap();
    drop(co1);

    let mut c2 = c0.clone();
    let mut co2 = c2.obj_mut();
    co2.set_uplo(Uplo::Lower);
    let rntm = Rntm::with_num_threads(4);
    eng.gemmt(sv(1.0), &a.obj(), &b.obj(), sv(0.5), &co2, None, Some(&rntm)).unwrap();
    drop(co2);

    for j in 0..m {
        for i in 0..m {
            if j > i {
                // Unstored triangle bit-identical in both runs.
                assert_eq!(c2.at(i, j).to_bits(), c0.at(i, j).to_bits());
            } else {
                let d = (c1.at(i, j) - c2.at(i, j)).abs();
                assert!(d <= 1e-12 * (1.0 + c1.at(i, j).abs()) * k as f64);
            }
        }
    }
}

#[test]
fn trsm_parallel_agrees_with_serial() {
    let eng = blocked_engine();
    let (m, n) = (130, 96);
    let a = gen_tri_f64(m, Uplo::Lower, 13);
    let b0 = gen_f64(m, n, 14);

    let mut ao = a.obj();
    ao.set_struc(Struc::Triangular);
    ao.set_uplo(Uplo::Lower);
    ao.set_diag_kind(DiagKind::NonUnit);

    let mut x1 = b0.clone();
    let mut x2 = b0.clone();
    eng.trsm(Side::Left, sv(1.0), &ao, &x1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_num_threads(4);
    eng.trsm(Side::Left, sv(1.0), &ao, &x2.obj_mut(), None, Some(&rntm)).unwrap();

    // Identical schedules per column owner: results agree exactly up to round-off.
    assert_close(&x2, &x1, m, 1e-12);
}

#[test]
fn trmm_parallel_in_place() {
    let eng = blocked_engine();
    let (m, n) = (128, 100);
    let a = gen_tri_f64(m, Uplo::Upper, 15);
    let b0 = gen_f64(m, n, 16);

    let mut ao = a.obj();
    ao.set_struc(Struc::Triangular);
    ao.set_uplo(Uplo::Upper);

    let mut b1 = b0.clone();
    let mut b2 = b0.clone();
    eng.trmm(Side::Left, sv(1.0), &ao, &b1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_num_threads(6);
    eng.trmm(Side::Left, sv(1.0), &ao, &b2.obj_mut(), None, Some(&rntm)).unwrap();
    assert_close(&b2, &b1, m, 1e-13);
}

#[test]
fn trmm_right_parallel_in_place() {
    // The right-side in-place product forces its column parallelism onto the rows; the result
    // must still match the serial run.
    let eng = blocked_engine();
    let (m, n) = (120, 90);
    let a = gen_tri_f64(n, Uplo::Lower, 21);
    let b0 = gen_f64(m, n, 22);

    let mut ao = a.obj();
    ao.set_struc(Struc::Triangular);
    ao.set_uplo(Uplo::Lower);

    let mut b1 = b0.clone();
    let mut b2 = b0.clone();
    eng.trmm(Side::Right, sv(1.5), &ao, &b1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_num_threads(4);
    eng.trmm(Side::Right, sv(1.5), &ao, &b2.obj_mut(), None, Some(&rntm)).unwrap();
    assert_close(&b2, &b1, n, 1e-13);
}

#[test]
fn hemm_parallel_agrees() {
    let eng = blocked_engine();
    let (m, n) = (96, 110);
    let a = gen_c64(m, m, 17);
    let b = gen_c64(m, n, 18);

    let mut ao = a.obj();
    ao.set_struc(Struc::Hermitian);
    ao.set_uplo(Uplo::Lower);

    let mut c1 = gen_c64(m, n, 19);
    let mut c2 = c1.clone();
    eng.hemm(Side::Left, sv(1.0), &ao, &b.obj(), sv(1.0), &c1.obj_mut(), None, None).unwrap();
    let rntm = Rntm::with_num_threads(4);
    eng.hemm(Side::Left, sv(1.0), &ao, &b.obj(), sv(1.0), &c2.obj_mut(), None, Some(&rntm))
        .unwrap();
    assert_close(&c2, &c1, m, 1e-12);
}
