use lamina_core::{CastFrom, DiagKind, PackSchema, Scalar, Struc, Uplo};
use num_traits::{One, Zero};

// REFERENCE PACKING SUB-KERNELS
// ================================================================================================
//
// The packers reshape one micro-panel of a source operand into the layout the micro-kernel
// consumes: short axis (`panel_dim`, padded to `panel_dim_max`) contiguous, long axis
// (`panel_len`, padded with explicit zeros to `panel_len_max`) with leading dimension `ldp`.
// `kappa` is folded in during the copy, conjugation is toggled in, and a broadcast factor
// duplicates each element along the short axis for micro-kernels that want pre-duplicated B.

/// Packs one micro-panel of an unstructured region. Native layouts only; the 1m layouts are
/// handled by [`pack_cxk_1m_ref`].
///
/// # Safety
/// See [`lamina_core::PackCxk`].
pub unsafe fn pack_cxk_ref<S: Scalar, P: Scalar + CastFrom<S>>(
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
) {
    debug_assert!(!schema.is_1m());
    unsafe {
        for j in 0..panel_len {
            for i in 0..panel_dim {
                let mut s = *c.offset(i as isize * incc + j as isize * ldc);
                if conj {
                    s = s.conj();
                }
                let v = *kappa * P::cast_from(s);
                for r in 0..panel_bcast {
                    *p.add(i * panel_bcast + r + j * ldp) = v;
                }
            }
            for i in panel_dim * panel_bcast..panel_dim_max * panel_bcast {
                *p.add(i + j * ldp) = P::zero();
            }
        }
        for j in panel_len..panel_len_max {
            for i in 0..panel_dim_max * panel_bcast {
                *p.add(i + j * ldp) = P::zero();
            }
        }
    }
}

/// Packs one micro-panel in the augmented-real ("1m") layouts.
///
/// Under `RowPanels1m` (the A side) each complex element expands into a 2x2 real block, so the
/// panel doubles along both axes; `ldp` is still given in complex elements and the kernel
/// derives the real leading dimension. Under `ColPanels1m` (the B side) each element expands
/// into a stacked real pair along the long axis only.
///
/// # Safety
/// See [`lamina_core::PackCxk`].
pub unsafe fn pack_cxk_1m_ref<S: Scalar, P: Scalar + CastFrom<S>>(
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
) {
    debug_assert!(schema.is_1m());
    debug_assert_eq!(panel_bcast, 1);
    let pr = p as *mut P::Real;
    unsafe {
        match schema {
            PackSchema::RowPanels1m => {
                let ldr = 2 * ldp;
                for j in 0..panel_len {
                    for i in 0..panel_dim {
                        let mut s = *c.offset(i as isize * incc + j as isize * ldc);
                        if conj {
                            s = s.conj();
                        }
                        let v = *kappa * P::cast_from(s);
                        let (re, im) = (v.real(), v.imag());
                        *pr.add(2 * i + 2 * j * ldr) = re;
                        *pr.add(2 * i + 1 + 2 * j * ldr) = im;
                        *pr.add(2 * i + (2 * j + 1) * ldr) = -im;
                        *pr.add(2 * i + 1 + (2 * j + 1) * ldr) = re;
                    }
                    for i in 2 * panel_dim..2 * panel_dim_max {
                        *pr.add(i + 2 * j * ldr) = P::Real::zero();
                        *pr.add(i + (2 * j + 1) * ldr) = P::Real::zero();
                    }
                }
                for j in 2 * panel_len..2 * panel_len_max {
                    for i in 0..2 * panel_dim_max {
                        *pr.add(i + j * ldr) = P::Real::zero();
                    }
                }
            },
            PackSchema::ColPanels1m => {
                // `ldp` complex elements per long step become `ldp` reals per real column.
                for j in 0..panel_len {
                    for i in 0..panel_dim {
                        let mut s = *c.offset(i as isize * incc + j as isize * ldc);
                        if conj {
                            s = s.conj();
                        }
                        let v = *kappa * P::cast_from(s);
                        *pr.add(i + 2 * j * ldp) = v.real();
                        *pr.add(i + (2 * j + 1) * ldp) = v.imag();
                    }
                    for i in panel_dim..panel_dim_max {
                        *pr.add(i + 2 * j * ldp) = P::Real::zero();
                        *pr.add(i + (2 * j + 1) * ldp) = P::Real::zero();
                    }
                }
                for j in 2 * panel_len..2 * panel_len_max {
                    for i in 0..panel_dim_max {
                        *pr.add(i + j * ldp) = P::Real::zero();
                    }
                }
            },
            _ => unreachable!("native schema routed to the 1m packer"),
        }
    }
}

// DIAGONAL-BLOCK PACKING
// ================================================================================================

/// Value of element `(i, j)` of a `dim x dim` diagonal-intersecting block of a structured
/// operand, after reflection of the unstored side, unit-diagonal substitution, Hermitian
/// diagonal realification, optional diagonal inversion, and scaling by kappa.
#[inline]
unsafe fn structured_elem<S: Scalar, P: Scalar + CastFrom<S>>(
    struc: Struc,
    diag: DiagKind,
    uplo: Uplo,
    conj: bool,
    invert_diag: bool,
    kappa: &P,
    c: *const S,
    incc: isize,
    ldc: isize,
    i: usize,
    j: usize,
) -> P {
    unsafe {
        let stored = match uplo {
            Uplo::Lower => i >= j,
            Uplo::Upper => i <= j,
        };
        let v = if i == j {
            let mut s = if diag == DiagKind::Unit {
                S::one()
            } else {
                *c.offset(i as isize * incc + j as isize * ldc)
            };
            if struc == Struc::Hermitian {
                s = S::from_real(s.real());
            }
            if conj {
                s = s.conj();
            }
            let mut v = *kappa * P::cast_from(s);
            if invert_diag {
                v = v.recip();
            }
            v
        } else if stored {
            let mut s = *c.offset(i as isize * incc + j as isize * ldc);
            if conj {
                s = s.conj();
            }
            *kappa * P::cast_from(s)
        } else {
            match struc {
                Struc::Triangular => P::zero(),
                Struc::Symmetric | Struc::Hermitian => {
                    let mut s = *c.offset(j as isize * incc + i as isize * ldc);
                    if struc == Struc::Hermitian {
                        s = s.conj();
                    }
                    if conj {
                        s = s.conj();
                    }
                    *kappa * P::cast_from(s)
                },
                Struc::General => unreachable!("general operands never reach the diagonal packer"),
            }
        };
        v
    }
}

/// Packs the diagonal-intersecting `panel_dim x panel_dim` block of a structured operand,
/// native layouts.
///
/// # Safety
/// See [`lamina_core::PackCxcDiag`].
#[allow(clippy::too_many_arguments)]
pub unsafe fn pack_cxc_diag_ref<S: Scalar, P: Scalar + CastFrom<S>>(
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
) {
    debug_assert!(!schema.is_1m());
    unsafe {
        for j in 0..panel_dim {
            for i in 0..panel_dim {
                let v = structured_elem(
                    struc, diag, uplo, conj, invert_diag, kappa, c, incc, ldc, i, j,
                );
                for r in 0..panel_bcast {
                    *p.add(i * panel_bcast + r + j * ldp) = v;
                }
            }
            for i in panel_dim * panel_bcast..panel_dim_max * panel_bcast {
                *p.add(i + j * ldp) = P::zero();
            }
        }
        for j in panel_dim..panel_len_max {
            for i in 0..panel_dim_max * panel_bcast {
                *p.add(i + j * ldp) = P::zero();
            }
        }
    }
}

/// Packs the diagonal-intersecting block in the augmented-real layouts.
///
/// # Safety
/// See [`lamina_core::PackCxcDiag`].
#[allow(clippy::too_many_arguments)]
pub unsafe fn pack_cxc_diag_1m_ref<S: Scalar, P: Scalar + CastFrom<S>>(
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
) {
    debug_assert!(schema.is_1m());
    debug_assert_eq!(panel_bcast, 1);
    let pr = p as *mut P::Real;
    unsafe {
        match schema {
            PackSchema::RowPanels1m => {
                let ldr = 2 * ldp;
                for j in 0..panel_dim {
                    for i in 0..panel_dim {
                        let v = structured_elem(
                            struc, diag, uplo, conj, invert_diag, kappa, c, incc, ldc, i, j,
                        );
                        let (re, im) = (v.real(), v.imag());
                        *pr.add(2 * i + 2 * j * ldr) = re;
                        *pr.add(2 * i + 1 + 2 * j * ldr) = im;
                        *pr.add(2 * i + (2 * j + 1) * ldr) = -im;
                        *pr.add(2 * i + 1 + (2 * j + 1) * ldr) = re;
                    }
                    for i in 2 * panel_dim..2 * panel_dim_max {
                        *pr.add(i + 2 * j * ldr) = P::Real::zero();
                        *pr.add(i + (2 * j + 1) * ldr) = P::Real::zero();
                    }
                }
                for j in 2 * panel_dim..2 * panel_len_max {
                    for i in 0..2 * panel_dim_max {
                        *pr.add(i + j * ldr) = P::Real::zero();
                    }
                }
            },
            PackSchema::ColPanels1m => {
                for j in 0..panel_dim {
                    for i in 0..panel_dim {
                        let v = structured_elem(
                            struc, diag, uplo, conj, invert_diag, kappa, c, incc, ldc, i, j,
                        );
                        *pr.add(i + 2 * j * ldp) = v.real();
                        *pr.add(i + (2 * j + 1) * ldp) = v.imag();
                    }
                    for i in panel_dim..panel_dim_max {
                        *pr.add(i + 2 * j * ldp) = P::Real::zero();
                        *pr.add(i + (2 * j + 1) * ldp) = P::Real::zero();
                    }
                }
                for j in 2 * panel_dim..2 * panel_len_max {
                    for i in 0..panel_dim_max {
                        *pr.add(i + j * ldp) = P::Real::zero();
                    }
                }
            },
            _ => unreachable!("native schema routed to the 1m packer"),
        }
    }
}

// TESTS
// ================================================================================================
