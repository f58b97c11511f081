//! General product: correctness against a dense reference, the trivial short-circuits, the
//! transposition equivalence, storage orientations, and the mixed-datatype paths.

mod common;

use common::*;
use lamina_engine::{C64, DType, Engine, Matrix, Obj, ScalarVal};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn identity_times_b_is_b() {
    let eng = blocked_engine();
    let a = Matrix::<f64>::identity(3);
    let b = Matrix::from_vec(3, 3, vec![1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
    let mut c = gen_f64(3, 3, 99);
    eng.gemm(ScalarVal::ONE, &a.obj(), &b.obj(), ScalarVal::ZERO, &c.obj_mut(), None, None)
        .unwrap();
    assert_eq!(c, b);
}

#[test]
fn one_by_one_complex_product() {
    let eng = blocked_engine();
    let a = Matrix::from_vec(1, 1, vec![C64::new(0.0, 1.0)]);
    let b = Matrix::from_vec(1, 1, vec![C64::new(1.0, 1.0)]);
    let mut c = Matrix::from_vec(1, 1, vec![C64::new(7.0, 7.0)]);
    eng.gemm(ScalarVal::ONE, &a.obj(), &b.obj(), ScalarVal::ZERO, &c.obj_mut(), None, None)
        .unwrap();
    assert_eq!(c.at(0, 0), C64::new(-1.0, 1.0));
}

#[test]
fn blocked_product_matches_reference_f64() {
    let eng = blocked_engine();
    // Sizes straddle MC/KC/NC boundaries, including ragged edges.
    for (m, n, k) in [(70, 50, 130), (64, 64, 128), (5, 3, 257), (97, 33, 1)] {
        let a = gen_f64(m, k, 1);
        let b = gen_f64(k, n, 2);
        let mut c = gen_f64(m, n, 3);
        let mut want = c.clone();
        eng.gemm(sv(1.5), &a.obj(), &b.obj(), sv(-0.5), &c.obj_mut(), None, None).unwrap();
        naive_gemm(1.5, &a, &b, -0.5, &mut want);
        assert_close(&c, &want, k, 1e-13);
    }
}

#[test]
fn blocked_product_matches_reference_c64() {
    let eng = blocked_engine();
    let (m, n, k) = (40, 36, 70);
    let a = gen_c64(m, k, 4);
    let b = gen_c64(k, n, 5);
    let mut c = gen_c64(m, n, 6);
    let mut want = c.clone();
    let alpha = C64::new(1.0, -2.0);
    let beta = C64::new(0.5, 0.25);
    eng.gemm(sv(alpha), &a.obj(), &b.obj(), sv(beta), &c.obj_mut(), None, None).unwrap();
    naive_gemm(alpha, &a, &b, beta, &mut want);
    assert_close(&c, &want, k, 1e-13);
}

#[test]
fn conjugation_bits_are_honored() {
    let eng = blocked_engine();
    let (m, n, k) = (12, 9, 40);
    let a = gen_c64(m, k, 7);
    let b = gen_c64(k, n, 8);
    let mut c = Matrix::<C64>::zeros(m, n);
    let mut ao = a.obj();
    ao.set_conj(true);
    let mut bo = b.obj();
    bo.set_conj(true);
    eng.gemm(ScalarVal::ONE, &ao, &bo, ScalarVal::ZERO, &c.obj_mut(), None, None).unwrap();

    let a_conj = Matrix::from_fn(m, k, |i, j| Sc::conj(a.at(i, j)));
    let b_conj = Matrix::from_fn(k, n, |i, j| Sc::conj(b.at(i, j)));
    let mut want = Matrix::<C64>::zeros(m, n);
    naive_gemm(C64::new(1.0, 0.0), &a_conj, &b_conj, C64::new(0.0, 0.0), &mut want);
    assert_close(&c, &want, k, 1e-13);
}

#[test]
fn transposition_equivalence() {
    // gemm(alpha, A^T, B^T, beta, C^T) equals gemm(alpha, A, B, beta, C) transposed.
    let eng = blocked_engine();
    let (m, n, k) = (37, 41, 53);
    let a = gen_f64(m, k, 11);
    let b = gen_f64(k, n, 12);
    let c0 = gen_f64(m, n, 13);

    let mut c_direct = c0.clone();
    eng.gemm(sv(2.0), &a.obj(), &b.obj(), sv(0.75), &c_direct.obj_mut(), None, None).unwrap();

    // C^T = 2 * B^T * A^T + 0.75 * C0^T, with the transpositions expressed as logical bits.
    let mut ct = transpose(&c0);
    let mut ao = a.obj();
    ao.set_trans(true);
    let mut bo = b.obj();
    bo.set_trans(true);
    eng.gemm(sv(2.0), &bo, &ao, sv(0.75), &ct.obj_mut(), None, None).unwrap();

    assert_close(&transpose(&ct), &c_direct, k, 1e-13);
}

#[test]
fn zero_k_scales_c_exactly() {
    let eng = blocked_engine();
    let a = Matrix::<f64>::zeros(8, 0);
    let b = Matrix::<f64>::zeros(0, 6);
    let mut c = gen_f64(8, 6, 21);
    let want = Matrix::from_fn(8, 6, |i, j| 3.0 * c.at(i, j));
    eng.gemm(ScalarVal::ONE, &a.obj(), &b.obj(), sv(3.0), &c.obj_mut(), None, None).unwrap();
    for j in 0..6 {
        for i in 0..8 {
            assert_eq!(c.at(i, j).to_bits(), want.at(i, j).to_bits());
        }
    }
}

#[test]
fn zero_alpha_scales_c_and_zero_beta_clears() {
    let eng = blocked_engine();
    let a = gen_f64(8, 5, 1);
    let b = gen_f64(5, 6, 2);
    let mut c = gen_f64(8, 6, 3);
    let before = c.clone();
    eng.gemm(ScalarVal::ZERO, &a.obj(), &b.obj(), sv(2.0), &c.obj_mut(), None, None).unwrap();
    for j in 0..6 {
        for i in 0..8 {
            assert_eq!(c.at(i, j), 2.0 * before.at(i, j));
        }
    }
    eng.gemm(ScalarVal::ZERO, &a.obj(), &b.obj(), ScalarVal::ZERO, &c.obj_mut(), None, None)
        .unwrap();
    assert_eq!(c, Matrix::<f64>::zeros(8, 6));
}

#[test]
fn zero_extent_c_is_untouched() {
    let eng = blocked_engine();
    let a = gen_f64(0, 4, 1);
    let b = gen_f64(4, 0, 2);
    let mut c = Matrix::<f64>::zeros(0, 0);
    eng.gemm(ScalarVal::ONE, &a.obj(), &b.obj(), sv(5.0), &c.obj_mut(), None, None).unwrap();
}

#[test]
fn row_major_output_uses_orientation_swap() {
    let eng = blocked_engine();
    let (m, n, k) = (33, 27, 44);
    let a = gen_f64(m, k, 31);
    let b = gen_f64(k, n, 32);
    let mut c_rm = vec![0.0f64; m * n];
    {
        let co = Obj::from_slice_mut(m, n, n as isize, 1, &mut c_rm);
        eng.gemm(ScalarVal::ONE, &a.obj(), &b.obj(), ScalarVal::ZERO, &co, None, None).unwrap();
    }
    let mut want = Matrix::<f64>::zeros(m, n);
    naive_gemm(1.0, &a, &b, 0.0, &mut want);
    for i in 0..m {
        for j in 0..n {
            assert!((c_rm[i * n + j] - want.at(i, j)).abs() <= 1e-13 * k as f64);
        }
    }
}

#[test]
fn small_path_agrees_with_blocked_path() {
    let small = Engine::new(lamina_engine::EngineConfig::default());
    let blocked = blocked_engine();
    let (m, n, k) = (9, 11, 7);
    let a = gen_f64(m, k, 41);
    let b = gen_f64(k, n, 42);
    let mut c1 = gen_f64(m, n, 43);
    let mut c2 = c1.clone();
    small.gemm(sv(1.25), &a.obj(), &b.obj(), sv(0.5), &c1.obj_mut(), None, None).unwrap();
    blocked.gemm(sv(1.25), &a.obj(), &b.obj(), sv(0.5), &c2.obj_mut(), None, None).unwrap();
    assert_close(&c1, &c2, k, 1e-13);
}

#[test]
fn global_engine_free_function() {
    let a = gen_f64(6, 5, 81);
    let b = gen_f64(5, 7, 82);
    let mut c = gen_f64(6, 7, 83);
    let mut want = c.clone();
    lamina_engine::gemm(sv(1.0), &a.obj(), &b.obj(), sv(2.0), &c.obj_mut()).unwrap();
    naive_gemm(1.0, &a, &b, 2.0, &mut want);
    assert_close(&c, &want, 5, 1e-13);
}

#[test]
fn mixed_storage_datatypes_stage_through_comp_dtype() {
    let eng = blocked_engine();
    let (m, n, k) = (20, 18, 35);
    let a32 = gen_f32(m, k, 51);
    let b = gen_f64(k, n, 52);
    let mut c = gen_f64(m, n, 53);
    let mut want = c.clone();
    eng.gemm(sv(1.0), &a32.obj(), &b.obj(), sv(2.0), &c.obj_mut(), None, None).unwrap();

    let a_up = Matrix::from_fn(m, k, |i, j| a32.at(i, j) as f64);
    naive_gemm(1.0, &a_up, &b, 2.0, &mut want);
    assert_close(&c, &want, k, 1e-6);
}

#[test]
fn mixed_domain_real_output_takes_real_part() {
    let eng = blocked_engine();
    let (m, n, k) = (10, 12, 21);
    let a = gen_c64(m, k, 61);
    let b = gen_f64(k, n, 62);
    let mut c = gen_f64(m, n, 63);
    let mut want_c64 = Matrix::from_fn(m, n, |i, j| C64::new(c.at(i, j), 0.0));
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(1.0), &c.obj_mut(), None, None).unwrap();

    let b_up = Matrix::from_fn(k, n, |i, j| C64::new(b.at(i, j), 0.0));
    naive_gemm(C64::new(1.0, 0.0), &a, &b_up, C64::new(1.0, 0.0), &mut want_c64);
    let want = Matrix::from_fn(m, n, |i, j| want_c64.at(i, j).re);
    assert_close(&c, &want, k, 1e-13);
}

#[test]
fn widened_computation_precision() {
    let eng = blocked_engine();
    let (m, n, k) = (14, 10, 60);
    let a = gen_f32(m, k, 71);
    let b = gen_f32(k, n, 72);
    let mut c = gen_f32(m, n, 73);
    let mut co = c.obj_mut();
    co.set_comp_dt(DType::F64);
    eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(0.0), &co, None, None).unwrap();
    drop(co);

    let a_up = Matrix::from_fn(m, k, |i, j| a.at(i, j) as f64);
    let b_up = Matrix::from_fn(k, n, |i, j| b.at(i, j) as f64);
    let mut want64 = Matrix::<f64>::zeros(m, n);
    naive_gemm(1.0, &a_up, &b_up, 0.0, &mut want64);
    let want = Matrix::from_fn(m, n, |i, j| want64.at(i, j) as f32);
    assert_close(&c, &want, 1, 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn gemm_matches_reference_on_random_geometry(
        m in 1usize..48,
        n in 1usize..48,
        k in 0usize..96,
        seed in 0usize..1000,
    ) {
        let eng = blocked_engine();
        let a = gen_f64(m, k, seed);
        let b = gen_f64(k, n, seed + 1);
        let mut c = gen_f64(m, n, seed + 2);
        let mut want = c.clone();
        eng.gemm(sv(1.0), &a.obj(), &b.obj(), sv(1.0), &c.obj_mut(), None, None).unwrap();
        naive_gemm(1.0, &a, &b, 1.0, &mut want);
        assert_close(&c, &want, k, 1e-12);
    }
}
