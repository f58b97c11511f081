use lamina_core::{
    CastFrom, Context, Error, Obj, PackDt, PackSchema, Scalar, ScalarVal, Struc, Uplo,
    dispatch_dt2,
};
use num_traits::Zero;

use crate::{
    cntl::PackCntl,
    thread::ThrComm,
};

// PACK VIEW
// ================================================================================================

/// Uniform "short axis x long axis" view of the operand being packed: rows-by-k for the A side,
/// columns-by-k for the B side (the transposed view, with the triangle and diagonal flipped).
struct PackDims {
    dim_total: usize,
    len_total: usize,
    incc: isize,
    ldc: isize,
    diag_off: isize,
    uplo: Uplo,
}

fn pack_dims(src: &Obj<'_>, a_side: bool) -> PackDims {
    if a_side {
        PackDims {
            dim_total: src.length(),
            len_total: src.width(),
            incc: src.row_stride(),
            ldc: src.col_stride(),
            diag_off: src.diag_off(),
            uplo: src.uplo(),
        }
    } else {
        PackDims {
            dim_total: src.width(),
            len_total: src.length(),
            incc: src.col_stride(),
            ldc: src.row_stride(),
            diag_off: -src.diag_off(),
            uplo: if src.is_general() { src.uplo() } else { src.uplo().toggled() },
        }
    }
}

// PACK VARIANT
// ================================================================================================

/// Packs one operand block into `buf`, micro-panel by micro-panel, cooperatively across the
/// members of `comm` (round-robin by panel). Returns the packed descriptor.
///
/// Structured operands decompose each micro-panel into up to three long-axis regions around the
/// diagonal: the part before the diagonal block, the diagonal-intersecting `dim x dim` block,
/// and the part after. Regions referencing the unstored triangle are either remapped onto the
/// stored part (symmetric/Hermitian, with conjugation toggled for the Hermitian case) or filled
/// with explicit zeros (triangular). The operand's attached scalar is folded in as kappa.
///
/// The caller is responsible for the barriers bracketing the pack; this function only writes
/// panels.
pub(crate) fn packm_var(
    pack: &PackCntl,
    src: &Obj<'_>,
    a_side: bool,
    buf: *mut u8,
    cntx: &Context,
    comm: &ThrComm,
    rank: usize,
) -> Result<Obj<'static>, Error> {
    let dims = pack_dims(src, a_side);
    let pd_bsz = cntx.blksz_def(pack.dst_dt, pack.panel_dim_id);
    let n_panels = dims.dim_total.div_ceil(pd_bsz).max(1);

    // Diagonals may not cross the short edge of any micro-panel; if one would, the cache
    // blocksizes were not whole multiples of the register blocksizes.
    if src.struc() != Struc::General {
        for q in 0..n_panels {
            let r0 = q * pd_bsz;
            let dim = pd_bsz.min(dims.dim_total - r0);
            let d = dims.diag_off + r0 as isize;
            let dim_i = dim as isize;
            let len_i = dims.len_total as isize;
            if (-dim_i < d && d < 0) || (len_i - dim_i < d && d < len_i) {
                return Err(Error::NotYetImplemented);
            }
        }
    }

    let ld = pd_bsz * pack.panel_bcast;
    // Panel stride in destination elements; the A-side 1m embedding doubles both axes, which
    // costs a factor of two over the complex element count.
    let ps = match pack.schema {
        PackSchema::RowPanels1m => 2 * ld * dims.len_total,
        _ => ld * dims.len_total,
    };

    let rev = match dims.uplo {
        Uplo::Upper => pack.rev_iter_if_upper && src.struc() != Struc::General,
        Uplo::Lower => pack.rev_iter_if_lower && src.struc() != Struc::General,
    };

    let kappa = src.scalar();
    dispatch_dt2!(pack.src_dt, pack.dst_dt, S, P => {
        pack_panels::<S, P>(pack, src, &dims, buf, cntx, comm, rank, pd_bsz, ld, ps, n_panels, rev, kappa)
    });

    let mut packed = unsafe {
        Obj::from_raw_parts(
            pack.dst_dt,
            src.length(),
            src.width(),
            src.row_stride(),
            src.col_stride(),
            buf,
        )
    };
    packed.set_schema(pack.schema);
    packed.set_panel_geometry(pd_bsz, ld, ps);
    packed.set_diag_off(src.diag_off());
    packed.set_uplo(src.uplo());
    packed.set_diag_kind(src.diag_kind());
    packed.set_scalar(ScalarVal::ONE);
    Ok(packed)
}

#[allow(clippy::too_many_arguments)]
fn pack_panels<S: Scalar + PackDt<P>, P: Scalar + CastFrom<S>>(
    pack: &PackCntl,
    src: &Obj<'_>,
    dims: &PackDims,
    buf: *mut u8,
    cntx: &Context,
    comm: &ThrComm,
    rank: usize,
    pd_bsz: usize,
    ld: usize,
    ps: usize,
    n_panels: usize,
    rev: bool,
    kappa: ScalarVal,
) {
    let kset = cntx.pack_kernels::<S, P>();
    let one_m = pack.schema.is_1m();
    let cxk = if one_m { kset.cxk_1m } else { kset.cxk };
    let cxc = if one_m { kset.cxc_diag_1m } else { kset.cxc_diag };
    let kappa_p: P = kappa.to::<P>();
    let base = src.buffer() as *const S;
    let nt = comm.num_threads();

    for q in 0..n_panels {
        if q % nt != rank {
            continue;
        }
        let src_q = if rev { n_panels - 1 - q } else { q };
        let r0 = src_q * pd_bsz;
        let dim = pd_bsz.min(dims.dim_total - r0);
        let len = dims.len_total;
        let p_panel = unsafe { (buf as *mut P).add(q * ps) };
        let c_panel = unsafe { base.offset(r0 as isize * dims.incc) };

        if src.struc() == Struc::General {
            unsafe {
                cxk(
                    src.has_conj(),
                    pack.schema,
                    dim,
                    pd_bsz,
                    pack.panel_bcast,
                    len,
                    len,
                    &kappa_p,
                    c_panel,
                    dims.incc,
                    dims.ldc,
                    p_panel,
                    ld,
                );
            }
            continue;
        }

        // Structured operand: decompose around the diagonal block.
        let d = dims.diag_off + r0 as isize;
        let dim_i = dim as isize;
        let len_i = len as isize;

        // Region before the diagonal block.
        if d > 0 {
            let len10 = (d as usize).min(len);
            let mut conj10 = src.has_conj();
            let mut c10 = c_panel;
            let mut incc10 = dims.incc;
            let mut ldc10 = dims.ldc;
            if dims.uplo == Uplo::Upper {
                (c10, incc10, ldc10) = reflect_to_stored(c10, incc10, ldc10, d);
                if src.struc() == Struc::Hermitian {
                    conj10 = !conj10;
                }
            }
            if dims.uplo == Uplo::Upper && src.struc() == Struc::Triangular {
                zero_region::<P>(p_panel, pack.schema, ld, pd_bsz, pack.panel_bcast, 0, len10);
            } else {
                unsafe {
                    cxk(
                        conj10,
                        pack.schema,
                        dim,
                        pd_bsz,
                        pack.panel_bcast,
                        len10,
                        len10,
                        &kappa_p,
                        c10,
                        incc10,
                        ldc10,
                        p_panel,
                        ld,
                    );
                }
            }
        }

        // Diagonal-intersecting block.
        if 0 <= d && d + dim_i <= len_i {
            let j0 = d as usize;
            let p11 = panel_col::<P>(p_panel, pack.schema, ld, j0);
            let c11 = unsafe { c_panel.offset(j0 as isize * dims.ldc) };
            unsafe {
                cxc(
                    src.struc(),
                    src.diag_kind(),
                    dims.uplo,
                    src.has_conj(),
                    pack.schema,
                    pack.invert_diag,
                    dim,
                    pd_bsz,
                    pack.panel_bcast,
                    dim,
                    &kappa_p,
                    c11,
                    dims.incc,
                    dims.ldc,
                    p11,
                    ld,
                );
            }
        }

        // Region after the diagonal block.
        if d + dim_i < len_i {
            let j0 = 0isize.max(d + dim_i) as usize;
            let len12 = len - j0;
            let p12 = panel_col::<P>(p_panel, pack.schema, ld, j0);
            let mut conj12 = src.has_conj();
            let mut c12 = unsafe { c_panel.offset(j0 as isize * dims.ldc) };
            let mut incc12 = dims.incc;
            let mut ldc12 = dims.ldc;
            if dims.uplo == Uplo::Lower {
                (c12, incc12, ldc12) = reflect_to_stored(c12, incc12, ldc12, d - j0 as isize);
                if src.struc() == Struc::Hermitian {
                    conj12 = !conj12;
                }
            }
            if dims.uplo == Uplo::Lower && src.struc() == Struc::Triangular {
                zero_region::<P>(p_panel, pack.schema, ld, pd_bsz, pack.panel_bcast, j0, j0 + len12);
            } else {
                unsafe {
                    cxk(
                        conj12,
                        pack.schema,
                        dim,
                        pd_bsz,
                        pack.panel_bcast,
                        len12,
                        len12,
                        &kappa_p,
                        c12,
                        incc12,
                        ldc12,
                        p12,
                        ld,
                    );
                }
            }
        }
    }
}

/// Remaps a region pointer onto the mirrored (stored) side of the matrix: swaps the two
/// strides and rebases so logical element `(i, j)` reads the reflection `(j - dd, i + dd)`
/// across the diagonal at offset `dd`.
fn reflect_to_stored<S>(c: *const S, incc: isize, ldc: isize, dd: isize) -> (*const S, isize, isize) {
    let c2 = unsafe { c.offset(-dd * incc + dd * ldc) };
    (c2, ldc, incc)
}

/// Pointer to long-axis position `j` of a packed panel, accounting for the 1m column doubling.
fn panel_col<P>(p: *mut P, schema: PackSchema, ld: usize, j: usize) -> *mut P {
    match schema {
        PackSchema::RowPanels1m => unsafe { p.add(2 * j * ld) },
        _ => unsafe { p.add(j * ld) },
    }
}

/// Writes explicit zeros over long-axis positions `[j0, j1)` of a packed panel, covering the
/// padded short axis and, under a 1m schema, twice as many real columns.
fn zero_region<P: Scalar>(
    p: *mut P,
    schema: PackSchema,
    ld: usize,
    pd_max: usize,
    bcast: usize,
    j0: usize,
    j1: usize,
) {
    unsafe {
        match schema {
            PackSchema::RowPanels1m => {
                let pr = p as *mut P::Real;
                let ldr = 2 * ld;
                for j in 2 * j0..2 * j1 {
                    for i in 0..2 * pd_max {
                        *pr.add(i + j * ldr) = P::Real::zero();
                    }
                }
            },
            PackSchema::ColPanels1m => {
                let pr = p as *mut P::Real;
                for j in 2 * j0..2 * j1 {
                    for i in 0..pd_max {
                        *pr.add(i + j * ld) = P::Real::zero();
                    }
                }
            },
            _ => {
                for j in j0..j1 {
                    for i in 0..pd_max * bcast {
                        *p.add(i + j * ld) = P::zero();
                    }
                }
            },
        }
    }
}

// TESTS
// ================================================================================================
